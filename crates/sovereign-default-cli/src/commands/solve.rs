use clap::Args;
use serde_json::Value;

use sovereign_default_core::calibration::Calibration;
use sovereign_default_core::model;

use crate::input;

/// Dense per-cell tables, dropped from the printed result unless `--full`.
const DENSE_FIELDS: [&str; 9] = [
    "endowment",
    "good_value",
    "bad_value",
    "default",
    "price",
    "policy_price",
    "policy_index",
    "policy_debt",
    "debt_grid",
];

/// Arguments for solving a calibration
#[derive(Args)]
pub struct SolveArgs {
    /// Path to a JSON or YAML calibration
    #[arg(long)]
    pub input: Option<String>,

    /// Write the full solution envelope as JSON to this path
    #[arg(long)]
    pub dump: Option<String>,

    /// Print every table instead of the summary
    #[arg(long)]
    pub full: bool,
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let calibration: Calibration = input::read_input(args.input.as_deref(), "solve")?;
    let result = model::solve_sovereign_default(&calibration)?;

    if let Some(ref path) = args.dump {
        input::file::write_json(path, &result)?;
        tracing::info!(path = path.as_str(), "solution written");
    }

    let mut value = serde_json::to_value(result)?;
    if !args.full {
        strip_dense_tables(&mut value);
    }
    Ok(value)
}

fn strip_dense_tables(value: &mut Value) {
    if let Some(Value::Object(result)) = value.get_mut("result") {
        for key in DENSE_FIELDS {
            result.remove(key);
        }
    }
}
