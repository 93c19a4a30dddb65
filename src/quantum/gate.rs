// src/quantum/gate.rs
//! Quantum gates
//!
//! A [`QuantumGate`] wraps a [`UnitaryOperator`], which is either a dense
//! `ndarray` matrix or a [`SparseMatrix`]. The backing is chosen by the
//! constructor and never changes implicitly. A gate must pass validation
//! before it can be applied, composed or tensored.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use tracing::debug;

use super::sparse::SparseMatrix;
use super::state::Qubits;
use crate::config::SimulatorConfig;
use crate::error::{QuantumError, Result};

/// Matrix backing of a gate
#[derive(Clone, Debug, PartialEq)]
pub enum UnitaryOperator {
    /// Row-major dense matrix
    Dense(Array2<Complex64>),
    /// Compressed sparse row matrix
    Sparse(SparseMatrix),
}

impl UnitaryOperator {
    /// `(rows, cols)` of the backing matrix
    pub fn shape(&self) -> (usize, usize) {
        match self {
            UnitaryOperator::Dense(m) => m.dim(),
            UnitaryOperator::Sparse(m) => m.shape(),
        }
    }

    /// Whether the operator is stored sparsely
    pub fn is_sparse(&self) -> bool {
        matches!(self, UnitaryOperator::Sparse(_))
    }

    /// Entry at `(row, col)`
    pub fn entry(&self, row: usize, col: usize) -> Complex64 {
        match self {
            UnitaryOperator::Dense(m) => m
                .get((row, col))
                .copied()
                .unwrap_or_else(|| Complex64::new(0.0, 0.0)),
            UnitaryOperator::Sparse(m) => m.get(row, col),
        }
    }

    /// Dense copy of the operator
    pub fn to_dense(&self) -> Array2<Complex64> {
        match self {
            UnitaryOperator::Dense(m) => m.clone(),
            UnitaryOperator::Sparse(m) => m.to_dense(),
        }
    }

    fn is_unitary(&self, config: &SimulatorConfig) -> bool {
        match self {
            UnitaryOperator::Dense(m) => {
                let (rows, cols) = m.dim();
                if rows != cols {
                    return false;
                }
                let adjoint = m.t().mapv(|c| c.conj());
                let product = adjoint.dot(m);
                let tolerance = config.dense_unitarity_tolerance;
                product.indexed_iter().all(|((r, c), value)| {
                    let expected = if r == c { 1.0 } else { 0.0 };
                    (value - Complex64::new(expected, 0.0)).norm() <= tolerance
                })
            }
            UnitaryOperator::Sparse(m) => m.is_unitary(config.sparse_unitarity_tolerance),
        }
    }

    fn apply(&self, amplitudes: &Array1<Complex64>) -> Result<Array1<Complex64>> {
        match self {
            UnitaryOperator::Dense(m) => Ok(m.dot(amplitudes)),
            UnitaryOperator::Sparse(m) => m.mul_vec(amplitudes),
        }
    }

    /// Kronecker product. Entry `(r, s)` of `self` times entry `(v, w)` of
    /// `other` lands at `(r·dim₂ + v, s·dim₂ + w)`. Any sparse operand makes
    /// the result sparse.
    fn tensor(&self, other: &UnitaryOperator) -> UnitaryOperator {
        match (self, other) {
            (UnitaryOperator::Dense(a), UnitaryOperator::Dense(b)) => {
                UnitaryOperator::Dense(dense_kron(a, b))
            }
            (UnitaryOperator::Dense(a), UnitaryOperator::Sparse(b)) => {
                UnitaryOperator::Sparse(SparseMatrix::from_dense(a, 0.0).kron(b))
            }
            (UnitaryOperator::Sparse(a), UnitaryOperator::Dense(b)) => {
                UnitaryOperator::Sparse(a.kron(&SparseMatrix::from_dense(b, 0.0)))
            }
            (UnitaryOperator::Sparse(a), UnitaryOperator::Sparse(b)) => {
                UnitaryOperator::Sparse(a.kron(b))
            }
        }
    }

    /// Matrix product `self × other`; `other` acts first.
    fn compose(&self, other: &UnitaryOperator) -> Result<UnitaryOperator> {
        Ok(match (self, other) {
            (UnitaryOperator::Dense(a), UnitaryOperator::Dense(b)) => UnitaryOperator::Dense(a.dot(b)),
            (UnitaryOperator::Sparse(a), UnitaryOperator::Sparse(b)) => {
                UnitaryOperator::Sparse(a.matmul(b)?)
            }
            (UnitaryOperator::Dense(a), UnitaryOperator::Sparse(b)) => {
                UnitaryOperator::Dense(a.dot(&b.to_dense()))
            }
            (UnitaryOperator::Sparse(a), UnitaryOperator::Dense(b)) => {
                UnitaryOperator::Dense(a.to_dense().dot(b))
            }
        })
    }
}

fn dense_kron(f: &Array2<Complex64>, g: &Array2<Complex64>) -> Array2<Complex64> {
    let (f_rows, f_cols) = f.dim();
    let (g_rows, g_cols) = g.dim();
    let mut result = Array2::zeros((f_rows * g_rows, f_cols * g_cols));

    for i in 0..f_rows {
        for j in 0..f_cols {
            let scale = f[[i, j]];
            if scale.norm_sqr() == 0.0 {
                continue;
            }
            for k in 0..g_rows {
                for l in 0..g_cols {
                    result[[i * g_rows + k, j * g_cols + l]] = scale * g[[k, l]];
                }
            }
        }
    }

    result
}

/// A unitary operator together with its derived qubit count
#[derive(Clone, Debug, PartialEq)]
pub struct QuantumGate {
    operator: UnitaryOperator,
    qubit_count: usize,
    validated: bool,
}

impl QuantumGate {
    /// Wrap an operator without validating it.
    ///
    /// The gate cannot be used until [`QuantumGate::validate`] succeeds.
    pub fn unvalidated(operator: UnitaryOperator) -> Self {
        QuantumGate {
            operator,
            qubit_count: 0,
            validated: false,
        }
    }

    /// Validated gate from a dense matrix
    pub fn from_matrix(matrix: Array2<Complex64>) -> Result<Self> {
        let mut gate = Self::unvalidated(UnitaryOperator::Dense(matrix));
        gate.validate()?;
        Ok(gate)
    }

    /// Validated gate from a sparse matrix
    pub fn from_sparse(matrix: SparseMatrix) -> Result<Self> {
        let mut gate = Self::unvalidated(UnitaryOperator::Sparse(matrix));
        gate.validate()?;
        Ok(gate)
    }

    /// One-qubit gate sending |0⟩ to `zero_image` and |1⟩ to `one_image`
    pub fn from_columns(zero_image: [Complex64; 2], one_image: [Complex64; 2]) -> Result<Self> {
        let matrix = Array2::from_shape_fn((2, 2), |(row, col)| {
            if col == 0 {
                zero_image[row]
            } else {
                one_image[row]
            }
        });
        Self::from_matrix(matrix)
    }

    /// Validate with the default tolerances
    pub fn validate(&mut self) -> Result<()> {
        self.validate_with(&SimulatorConfig::default())
    }

    /// Check that the operator is a non-empty square unitary matrix whose
    /// dimension is a power of two, and derive the qubit count.
    pub fn validate_with(&mut self, config: &SimulatorConfig) -> Result<()> {
        let (rows, cols) = self.operator.shape();
        if rows == 0 || rows != cols {
            debug!(rows, cols, "rejected non-square gate");
            return Err(QuantumError::InvalidGate(format!(
                "operator must be a non-empty square matrix, got {rows}x{cols}"
            )));
        }
        if !rows.is_power_of_two() {
            debug!(rows, "rejected gate dimension");
            return Err(QuantumError::InvalidGate(format!(
                "operator dimension {rows} is not a power of two"
            )));
        }
        if !self.operator.is_unitary(config) {
            debug!(rows, sparse = self.operator.is_sparse(), "rejected non-unitary gate");
            return Err(QuantumError::InvalidGate(
                "operator is not unitary".to_string(),
            ));
        }

        self.qubit_count = rows.trailing_zeros() as usize;
        self.validated = true;
        Ok(())
    }

    /// Whether [`QuantumGate::validate`] has succeeded
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Number of qubits the gate acts on
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Dimension of the operator
    pub fn dimension(&self) -> usize {
        self.operator.shape().0
    }

    /// Backing operator
    pub fn operator(&self) -> &UnitaryOperator {
        &self.operator
    }

    fn ensure_validated(&self) -> Result<()> {
        if self.validated {
            Ok(())
        } else {
            Err(QuantumError::InvalidGate(
                "gate has not been validated".to_string(),
            ))
        }
    }

    /// Apply the gate to `qubits` in place.
    ///
    /// On error `qubits` is left untouched.
    pub fn apply(&self, qubits: &mut Qubits) -> Result<()> {
        self.ensure_validated()?;
        if qubits.qubit_count() != self.qubit_count {
            return Err(QuantumError::Dimension(format!(
                "{}-qubit gate applied to {} qubits",
                self.qubit_count,
                qubits.qubit_count()
            )));
        }

        let amplitudes = self.operator.apply(qubits.amplitudes())?;
        *qubits = qubits.with_amplitudes(amplitudes)?;
        Ok(())
    }

    /// Tensor product acting on `self.qubit_count() + other.qubit_count()` qubits
    pub fn tensor(&self, other: &QuantumGate) -> Result<QuantumGate> {
        self.ensure_validated()?;
        other.ensure_validated()?;

        Ok(QuantumGate {
            operator: self.operator.tensor(&other.operator),
            qubit_count: self.qubit_count + other.qubit_count,
            validated: true,
        })
    }

    /// Matrix product `self × other`, equivalent to applying `other` and then `self`
    pub fn compose(&self, other: &QuantumGate) -> Result<QuantumGate> {
        self.ensure_validated()?;
        other.ensure_validated()?;
        if self.dimension() != other.dimension() {
            return Err(QuantumError::Dimension(format!(
                "cannot compose {}-qubit and {}-qubit gates",
                self.qubit_count, other.qubit_count
            )));
        }

        Ok(QuantumGate {
            operator: self.operator.compose(&other.operator)?,
            qubit_count: self.qubit_count,
            validated: true,
        })
    }
}
