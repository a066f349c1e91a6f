// ABOUTME: Entry point for the vs CLI application.
// ABOUTME: Parses arguments, resolves the invocation, and dispatches to command handlers.

mod cli;
mod commands;

use clap::{CommandFactory, Parser};
use cli::Cli;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vs::config::{self, Config};
use vs::dispatch::{self, Invocation, Verb};
use vs::error::Result;
use vs::output::Output;
use vs::provider::{self, ProviderGateway};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output_mode();
    let result = run(cli, Output::new(mode)).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        if e.is_usage() {
            eprintln!();
            eprintln!("{}", Cli::command().render_help());
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let invocation = dispatch::resolve(&cli.target, &cli.rest)?;
    let cwd = env::current_dir()?;

    match invocation {
        Invocation::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Invocation::Status => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            let gateway = provider::connect(&config.provider)?;
            commands::status(gateway.as_ref(), &config, output).await
        }
        Invocation::Machine { name, verb, args } => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            let gateway = provider::connect(&config.provider)?;
            let gateway: &dyn ProviderGateway = gateway.as_ref();

            match verb {
                Verb::Up => commands::up(gateway, &config, &name, output).await,
                Verb::Halt => commands::halt(gateway, &config, &name, output).await,
                Verb::Destroy => commands::destroy(gateway, &config, &name, output).await,
                Verb::Status => commands::machine_status(gateway, &config, &name, output).await,
                Verb::Ssh => commands::ssh(gateway, &config, &name, &args).await,
                Verb::Scp => commands::scp(gateway, &config, &name, &args).await,
                Verb::Console => commands::console(gateway, &config, &name, output).await,
            }
        }
    }
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::discover(cwd),
    }
}
