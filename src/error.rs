//! Error types shared by every layer of the simulator.

use thiserror::Error;

/// Errors that can occur while building, running or persisting quantum objects.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuantumError {
    /// A length is not a power of two, or two sizes disagree.
    #[error("Dimension error: {0}")]
    Dimension(String),

    /// An operator is empty, not square, or not unitary.
    #[error("Invalid gate: {0}")]
    InvalidGate(String),

    /// The circuit graph violates one of its invariants.
    #[error("Structural error: {0}")]
    Structural(String),

    /// A node was evaluated before one of its dependencies.
    #[error("Ordering error: {0}")]
    Ordering(String),

    /// Qubits were bound to a node that cannot take them.
    #[error("Binding error: {0}")]
    Binding(String),

    /// A persisted object is malformed or of the wrong kind.
    #[error("Format error: {0}")]
    Format(String),

    /// An amplitude vector with zero norm cannot describe a state.
    #[error("State vector has zero norm and cannot be normalized")]
    ZeroNorm,

    /// Reading or writing a persisted object failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for QuantumError {
    fn from(err: bincode::Error) -> Self {
        QuantumError::Format(format!("binary encoding failed: {err}"))
    }
}

impl From<serde_json::Error> for QuantumError {
    fn from(err: serde_json::Error) -> Self {
        QuantumError::Format(format!("JSON encoding failed: {err}"))
    }
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, QuantumError>;
