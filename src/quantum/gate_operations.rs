// src/quantum/gate_operations.rs
//! Tensor products over lists of states and gates

use super::gate::QuantumGate;
use super::state::Qubits;
use crate::error::{QuantumError, Result};

/// Entangle an ordered list of states into one, left to right.
///
/// A single state is returned unchanged.
pub fn entangle_all(qubit_sets: &[Qubits]) -> Result<Qubits> {
    let (first, rest) = qubit_sets.split_first().ok_or_else(|| {
        QuantumError::Dimension("cannot entangle an empty list of qubits".to_string())
    })?;

    Ok(rest.iter().fold(first.clone(), |acc, q| acc.tensor(q)))
}

/// Entangle `copies` copies of the same state
pub fn entangle_copies(qubits: &Qubits, copies: usize) -> Result<Qubits> {
    if copies == 0 {
        return Err(QuantumError::Dimension(
            "cannot produce a 0-qubit system".to_string(),
        ));
    }

    let mut result = qubits.clone();
    for _ in 1..copies {
        result = result.tensor(qubits);
    }
    Ok(result)
}

/// Tensor an ordered list of gates into one gate, left to right
pub fn tensor_all(gates: &[QuantumGate]) -> Result<QuantumGate> {
    let (first, rest) = gates.split_first().ok_or_else(|| {
        QuantumError::Dimension("cannot tensor an empty list of gates".to_string())
    })?;

    rest.iter()
        .try_fold(first.clone(), |acc, gate| acc.tensor(gate))
}

/// Tensor `copies` copies of the same gate
pub fn tensor_copies(gate: &QuantumGate, copies: usize) -> Result<QuantumGate> {
    if copies == 0 {
        return Err(QuantumError::Dimension(
            "cannot produce a 0-qubit system gate".to_string(),
        ));
    }

    let mut result = gate.clone();
    for _ in 1..copies {
        result = result.tensor(gate)?;
    }
    Ok(result)
}
