//! Threshold-crossing actuation: watches sensor readings per monitored quantity and
//! decides when a sustained excursion outside a configured band warrants a command.

pub mod engine;
pub mod excursion;
pub mod policy;

pub use engine::{ActuationEngine, QuantityKey};
pub use excursion::{Actuation, ExcursionState, Phase, Side, Trigger};
pub use policy::ThresholdPolicy;
