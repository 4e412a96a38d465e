pub mod lender_kernel;

pub use lender_kernel::{LenderPricingKernel, RiskNeutralLender, StochasticDiscountTable};
