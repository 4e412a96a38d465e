pub mod composite;
pub mod joint_transition;
pub mod markov_chain;
#[cfg(feature = "tauchen")]
pub mod tauchen;

pub use composite::CompositeIndex;
pub use joint_transition::JointTransition;
pub use markov_chain::MarkovChain;
