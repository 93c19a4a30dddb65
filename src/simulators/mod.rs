//! Circuit execution
//!
//! Single-threaded, deterministic evaluation of circuit blueprints. The only
//! nondeterminism is measurement, which always draws from an injected source.

pub mod scheduler;

pub use scheduler::ObservationResults;
