//! Simulator configuration
//!
//! Tolerances, collapse behaviour and the entropy source used for measurement.
//! A config can be built in code or loaded from JSON; missing fields fall back
//! to their defaults.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Widest qubit group the simulator will allocate a state vector or gate for.
pub const MAX_QUBITS: usize = 30;

/// Allowed deviation of Σ|aᵢ|² from one.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Allowed deviation of T†T from the identity for sparse operators.
pub const SPARSE_UNITARITY_TOLERANCE: f64 = 1e-6;

/// Allowed deviation of T†T from the identity for dense operators.
pub const DENSE_UNITARITY_TOLERANCE: f64 = 1e-10;

/// Phase given to the surviving amplitude when a state collapses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapsePhase {
    /// The collapsed amplitude is exactly 1
    #[default]
    Real,
    /// The collapsed amplitude is e^{iφ} for a uniformly drawn φ
    Random,
}

/// Configuration for validation, measurement and circuit execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Allowed deviation of the squared norm from one
    pub normalization_tolerance: f64,

    /// Unitarity tolerance for sparse operators
    pub sparse_unitarity_tolerance: f64,

    /// Unitarity tolerance for dense operators
    pub dense_unitarity_tolerance: f64,

    /// Phase applied on collapse
    pub collapse_phase: CollapsePhase,

    /// Seed for the measurement entropy source; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            normalization_tolerance: NORMALIZATION_TOLERANCE,
            sparse_unitarity_tolerance: SPARSE_UNITARITY_TOLERANCE,
            dense_unitarity_tolerance: DENSE_UNITARITY_TOLERANCE,
            collapse_phase: CollapsePhase::Real,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// A default config with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        SimulatorConfig {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse a config from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Create the entropy source described by this config.
    ///
    /// A seeded config hands out an identically seeded generator on every call.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimulatorConfig::from_json_str(r#"{"seed": 7, "collapse_phase": "random"}"#)
            .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.collapse_phase, CollapsePhase::Random);
        assert_eq!(config.sparse_unitarity_tolerance, SPARSE_UNITARITY_TOLERANCE);
    }

    #[test]
    fn seeded_rng_repeats() {
        let config = SimulatorConfig::seeded(11);
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let err = SimulatorConfig::from_json_str("{ seed: ").unwrap_err();
        assert!(matches!(err, crate::QuantumError::Format(_)));
    }
}
