//! Policy evaluation: the block decision engine and the reconciliation
//! debouncer.

pub mod debounce;
pub mod decision;

pub use debounce::ReconciliationDebouncer;
pub use decision::{DecisionEngine, PolicyThresholds};
