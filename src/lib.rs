//! State-vector quantum circuit simulator
//!
//! This crate simulates quantum computation classically. It provides qubit
//! state vectors, dense and sparse unitary gates, and circuit blueprints made
//! of qubit groups linked by entanglement and observation. Blueprints run in a
//! single deterministic pass and can be persisted together with the states
//! and gates they use.

pub mod config;
pub mod error;
pub mod quantum;
pub mod serialization;
pub mod simulators;

pub use config::{CollapsePhase, SimulatorConfig};
pub use error::{QuantumError, Result};

// Create a prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{CollapsePhase, SimulatorConfig};
    pub use crate::error::{QuantumError, Result};
    pub use crate::quantum::prelude::*;
    pub use crate::serialization::{ObjectKind, Persist};
    pub use crate::simulators::ObservationResults;
}

// Version and crate information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
