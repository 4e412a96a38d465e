use clap::Args;
use serde_json::Value;

use sovereign_default_core::simulation::{self, SimulationRequest};

use crate::input;

/// Arguments for simulating a calibration
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON or YAML file with `calibration` and `simulation` sections
    #[arg(long)]
    pub input: Option<String>,

    /// Override the seed in the input file
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: SimulationRequest = input::read_input(args.input.as_deref(), "simulate")?;
    if args.seed.is_some() {
        request.simulation.seed = args.seed;
    }
    let result = simulation::simulate_sovereign_default(&request)?;
    Ok(serde_json::to_value(result)?)
}
