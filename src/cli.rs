// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: The positional part is resolved by the dispatch table, not by clap subcommands.

use clap::Parser;
use std::path::PathBuf;

use vs::output::OutputMode;

const COMMANDS_HELP: &str = "\
Global commands:
  status          Show every instance in the account
  init [--force]  Write a vs.yml template

Machine commands:
  <machine> up       Create or start the machine
  <machine> halt     Shut the machine down
  <machine> destroy  Terminate the machine
  <machine> status   Show the machine's state
  <machine> ssh      Connect to the machine
  <machine> scp      Copy files to or from the machine
  <machine> console  Show the machine's console access";

#[derive(Parser)]
#[command(name = "vs")]
#[command(about = "Manage the lifecycle of virtual servers")]
#[command(version)]
#[command(override_usage = "vs [OPTIONS] <global-command> [args]\n       vs [OPTIONS] <machine> <command> [args]")]
#[command(after_help = COMMANDS_HELP)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long)]
    pub json: bool,

    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Global command or machine name
    pub target: String,

    /// Machine command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}
