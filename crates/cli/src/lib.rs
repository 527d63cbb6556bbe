pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sheetbot",
    about = "Sheetbot operator CLI",
    long_about = "Inspect sheetbot configuration, check runtime readiness, and run one-off spreadsheet lookups.",
    after_help = "Examples:\n  sheetbot doctor --json\n  sheetbot config\n  sheetbot search 黑骑士 狂铁"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the export binary is installed")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one lookup through the configured spreadsheet and print the reply")]
    Search {
        #[arg(required = true, help = "Keywords; any of them may match")]
        query: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Search { query } => commands::search::run(&query.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
