pub mod discretize;
pub mod simulate;
pub mod solve;
