mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::discretize::DiscretizeArgs;
use commands::simulate::SimulateArgs;
use commands::solve::SolveArgs;

/// Sovereign default models solved by value function iteration
#[derive(Parser)]
#[command(
    name = "sovdef",
    version,
    about = "Sovereign default models solved by value function iteration",
    long_about = "Solve, simulate and inspect sovereign default models with endogenous \
                  bond pricing. Calibrations are read as JSON or YAML from --input, or \
                  as JSON from stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter for stderr (e.g. "info", "sovereign_default_core=debug").
    /// Falls back to RUST_LOG, then "warn".
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the model for a calibration
    Solve(SolveArgs),
    /// Solve the model and report simulated moments
    Simulate(SimulateArgs),
    /// Discretize one AR(1) shock process with Tauchen's method
    Discretize(DiscretizeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Solve(args) => commands::solve::run_solve(args),
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Discretize(args) => commands::discretize::run_discretize(args),
        Commands::Version => {
            println!("sovdef {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
