// src/quantum/standard_gates.rs
//! A catalog of common gates
//!
//! Qubit 0 is the most significant bit of a basis index, so a controlled gate
//! built here uses the leftmost qubit as control. Permutation gates are stored
//! sparsely, everything else densely.

use ndarray::{array, Array2};
use num_complex::Complex64;

use super::gate::QuantumGate;
use super::sparse::SparseMatrix;
use crate::config::MAX_QUBITS;
use crate::error::{QuantumError, Result};

/// Common complex numbers used in gate matrices
pub mod constants {
    use num_complex::Complex64;

    /// The imaginary unit i
    pub const I: Complex64 = Complex64::new(0.0, 1.0);

    /// 1
    pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

    /// 0
    pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);

    /// 1/sqrt(2)
    pub const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;
}

/// Standard quantum gates (Pauli, Hadamard, etc.)
#[derive(Clone, Debug, PartialEq)]
pub enum StandardGate {
    /// Identity gate on the given number of qubits
    Identity(usize),

    /// Pauli-X gate (NOT gate)
    PauliX,

    /// Pauli-Y gate
    PauliY,

    /// Pauli-Z gate
    PauliZ,

    /// Hadamard gate
    Hadamard,

    /// Phase gate (S gate)
    S,

    /// π/8 gate (T gate)
    T,

    /// diag(1, e^{iθ})
    PhaseShift(f64),

    /// CNOT gate, control on the first qubit
    CNOT,

    /// Controlled-Z gate
    CZ,

    /// SWAP gate
    Swap,

    /// Toffoli gate (CCNOT), controls on the first two qubits
    Toffoli,
}

impl StandardGate {
    /// Number of qubits this gate acts on
    pub fn qubit_count(&self) -> usize {
        match self {
            StandardGate::Identity(n) => *n,
            StandardGate::PauliX
            | StandardGate::PauliY
            | StandardGate::PauliZ
            | StandardGate::Hadamard
            | StandardGate::S
            | StandardGate::T
            | StandardGate::PhaseShift(_) => 1,
            StandardGate::CNOT | StandardGate::CZ | StandardGate::Swap => 2,
            StandardGate::Toffoli => 3,
        }
    }

    /// Build the validated gate
    pub fn gate(&self) -> Result<QuantumGate> {
        use constants::*;
        match self {
            StandardGate::Identity(n) => {
                if *n == 0 || *n > MAX_QUBITS {
                    return Err(QuantumError::Dimension(format!(
                        "identity on {n} qubits"
                    )));
                }
                QuantumGate::from_sparse(SparseMatrix::identity(1 << n))
            }
            StandardGate::PauliX => QuantumGate::from_sparse(permutation(2, |j| j ^ 1)?),
            StandardGate::PauliY => QuantumGate::from_matrix(array![[ZERO, -I], [I, ZERO]]),
            StandardGate::PauliZ => QuantumGate::from_matrix(array![[ONE, ZERO], [ZERO, -ONE]]),
            StandardGate::Hadamard => {
                let factor = Complex64::new(FRAC_1_SQRT_2, 0.0);
                QuantumGate::from_matrix(array![[factor, factor], [factor, -factor]])
            }
            StandardGate::S => QuantumGate::from_matrix(array![[ONE, ZERO], [ZERO, I]]),
            StandardGate::T => QuantumGate::from_matrix(array![
                [ONE, ZERO],
                [ZERO, Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)]
            ]),
            StandardGate::PhaseShift(theta) => QuantumGate::from_matrix(array![
                [ONE, ZERO],
                [ZERO, Complex64::from_polar(1.0, *theta)]
            ]),
            StandardGate::CNOT => {
                QuantumGate::from_sparse(permutation(4, |j| if j & 0b10 != 0 { j ^ 1 } else { j })?)
            }
            StandardGate::CZ => QuantumGate::from_sparse(SparseMatrix::from_diagonal(&[
                ONE, ONE, ONE, -ONE,
            ])),
            StandardGate::Swap => QuantumGate::from_sparse(permutation(4, |j| {
                ((j & 1) << 1) | ((j >> 1) & 1)
            })?),
            StandardGate::Toffoli => QuantumGate::from_sparse(permutation(8, |j| {
                if j & 0b110 == 0b110 {
                    j ^ 1
                } else {
                    j
                }
            })?),
        }
    }
}

/// Sparse matrix sending |j⟩ to |target(j)⟩
fn permutation(dim: usize, target: impl Fn(usize) -> usize) -> Result<SparseMatrix> {
    SparseMatrix::from_triplets(dim, dim, (0..dim).map(|j| (target(j), j, constants::ONE)))
}

/// Grover diffusion operator 2|s⟩⟨s| − I, where |s⟩ is the uniform superposition
pub fn grover_diffusion(qubit_count: usize) -> Result<QuantumGate> {
    if qubit_count == 0 || qubit_count > MAX_QUBITS {
        return Err(QuantumError::Dimension(format!(
            "diffusion operator on {qubit_count} qubits"
        )));
    }
    let dim = 1usize << qubit_count;
    let off_diagonal = 2.0 / dim as f64;
    let matrix = Array2::from_shape_fn((dim, dim), |(r, c)| {
        let value = if r == c { off_diagonal - 1.0 } else { off_diagonal };
        Complex64::new(value, 0.0)
    });
    QuantumGate::from_matrix(matrix)
}

/// Phase oracle flipping the sign of the basis state |marked⟩
pub fn phase_oracle(qubit_count: usize, marked: usize) -> Result<QuantumGate> {
    if qubit_count == 0 || qubit_count > MAX_QUBITS {
        return Err(QuantumError::Dimension(format!(
            "oracle on {qubit_count} qubits"
        )));
    }
    let dim = 1usize << qubit_count;
    if marked >= dim {
        return Err(QuantumError::Dimension(format!(
            "marked state {marked} is not representable with {qubit_count} qubits"
        )));
    }

    let mut diagonal = vec![constants::ONE; dim];
    diagonal[marked] = -constants::ONE;
    QuantumGate::from_sparse(SparseMatrix::from_diagonal(&diagonal))
}
