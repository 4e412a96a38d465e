//! Value function iteration for the sovereign default model.

pub mod economy;
pub mod policy;
pub mod solver;
pub mod sweep;
pub mod tables;
pub mod utility;

pub use economy::{Economy, Preferences};
pub use policy::{extract_policy, PolicyTable};
pub use solver::{BellmanSolver, SolverOptions, SolverResult, SolverStatus};
pub use tables::{DefaultTable, Snapshot, StateDebtTable};
pub use utility::{crra, UtilitySurface, INFEASIBLE_UTILITY};
