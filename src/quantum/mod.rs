// src/quantum/mod.rs
//! Quantum states, gates and circuit blueprints
//!
//! This module holds the amplitude model, the unitary gate abstraction and the
//! circuit graph that wires them together.

pub mod state;
pub mod sparse;
pub mod gate;
pub mod gate_operations;
pub mod standard_gates;
pub mod circuit;

pub use state::{Qubits, Observation, validate_length};
pub use sparse::SparseMatrix;
pub use gate::{QuantumGate, UnitaryOperator};
pub use gate_operations::{entangle_all, entangle_copies, tensor_all, tensor_copies};
pub use standard_gates::{StandardGate, grover_diffusion, phase_oracle};
pub use circuit::{QuantumCircuit, CircuitQubitsNode, QubitsRef, GateRef, Inbound, Outbound, NodeKind};

/// Re-export commonly used types and traits
pub mod prelude {
    pub use super::{Qubits, Observation};
    pub use super::{QuantumGate, UnitaryOperator, SparseMatrix, StandardGate};
    pub use super::{QuantumCircuit, QubitsRef, GateRef};
}
