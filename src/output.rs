// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use crate::machine::{InstanceSummary, Machine, Outcome};
use crate::provider::ConsoleAccess;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration() {
                Some(elapsed) => println!("{message} ({elapsed:.1}s)"),
                None => println!("{message}"),
            },
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.emit_stdout(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit_stderr(&JsonEvent {
                event: "warning",
                message,
                duration_secs: None,
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit_stderr(&JsonEvent {
                event: "error",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an observed machine.
    pub fn machine(&self, machine: &Machine) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => print!("{}", format_machine(machine)),
            OutputMode::Json => self.emit_stdout(&JsonRecord {
                event: "machine",
                record: machine,
            }),
        }
    }

    /// Print the result of a lifecycle operation.
    pub fn outcome(&self, outcome: &Outcome) {
        match self.mode {
            OutputMode::Json => self.emit_stdout(&JsonOutcome {
                event: "outcome",
                outcome,
                duration_secs: self.duration(),
            }),
            _ => self.success(&describe_outcome(outcome)),
        }
    }

    /// Print the account-wide instance table.
    pub fn instances(&self, instances: &[InstanceSummary]) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => print!("{}", format_instances(instances)),
            OutputMode::Json => {
                for instance in instances {
                    self.emit_stdout(&JsonRecord {
                        event: "instance",
                        record: instance,
                    });
                }
            }
        }
    }

    pub fn console(&self, console: &ConsoleAccess) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                println!("url: {}", console.url);
                println!("password: {}", console.password);
            }
            OutputMode::Json => self.emit_stdout(&JsonRecord {
                event: "console",
                record: console,
            }),
        }
    }

    fn emit_stdout<T: Serialize>(&self, event: &T) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }

    fn emit_stderr<T: Serialize>(&self, event: &T) {
        if let Ok(json) = serde_json::to_string(event) {
            eprintln!("{json}");
        }
    }
}

/// One-line summary of a lifecycle operation, e.g. `web1 is running (started)`.
pub fn describe_outcome(outcome: &Outcome) -> String {
    let machine = &outcome.machine;
    match outcome.mutation {
        Some(mutation) => format!("{} is {} ({mutation} issued)", machine.name, machine.state),
        None => format!("{} is already {}", machine.name, machine.state),
    }
}

pub fn format_machine(machine: &Machine) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:    {}", machine.name);
    let _ = writeln!(out, "id:      {}", or_dash(machine.instance_id.as_ref().map(|id| id.as_str())));
    let _ = writeln!(out, "type:    {}", or_dash(machine.instance_type.as_deref()));
    let _ = writeln!(out, "state:   {}", machine.state);
    let _ = writeln!(out, "address: {}", or_dash(machine.address.as_deref()));
    out
}

pub fn format_instances(instances: &[InstanceSummary]) -> String {
    if instances.is_empty() {
        return "no instances\n".to_string();
    }

    let rows: Vec<[String; 6]> = instances
        .iter()
        .map(|instance| {
            let record = &instance.record;
            let state = match instance.canonical_state {
                Some(state) => state.to_string(),
                None => format!("unknown ({})", record.state),
            };
            [
                record.name.clone(),
                record.id.to_string(),
                or_dash(record.instance_type.as_deref()).to_string(),
                state,
                or_dash(record.public_address.as_deref()).to_string(),
                format_tags(&record.tags),
            ]
        })
        .collect();

    let header = ["NAME", "ID", "TYPE", "STATE", "ADDRESS", "TAGS"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &header.map(String::from), &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

fn format_tags(tags: &BTreeMap<String, String>) -> String {
    if tags.is_empty() {
        return "-".to_string();
    }
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonRecord<'a, T: Serialize> {
    event: &'a str,
    #[serde(flatten)]
    record: &'a T,
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    event: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
