//! Persisted form of gates
//!
//! Dense gates store their full row-major matrix; sparse gates store only
//! their nonzero entries as parallel row, column and value arrays.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{complex_pairs, complex_values, kind_mismatch, record_dimension, Payload, Persist};
use crate::config::SimulatorConfig;
use crate::error::{QuantumError, Result};
use crate::quantum::gate::{QuantumGate, UnitaryOperator};
use crate::quantum::sparse::SparseMatrix;

/// Row-major dense gate matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseGateRecord {
    pub qubit_count: u32,
    pub entries: Vec<(f64, f64)>,
}

/// Nonzero entries of a sparse gate matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseGateRecord {
    pub qubit_count: u32,
    pub rows: Vec<u64>,
    pub cols: Vec<u64>,
    pub values: Vec<(f64, f64)>,
}

/// A gate of either backing, as stored in a circuit's gate table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GateRecord {
    Dense(DenseGateRecord),
    Sparse(SparseGateRecord),
}

impl TryFrom<&QuantumGate> for GateRecord {
    type Error = QuantumError;

    fn try_from(gate: &QuantumGate) -> Result<Self> {
        if !gate.is_validated() {
            return Err(QuantumError::InvalidGate(
                "only validated gates can be persisted".to_string(),
            ));
        }
        let qubit_count = gate.qubit_count() as u32;

        Ok(match gate.operator() {
            UnitaryOperator::Dense(matrix) => GateRecord::Dense(DenseGateRecord {
                qubit_count,
                entries: complex_pairs(matrix.iter()),
            }),
            UnitaryOperator::Sparse(matrix) => {
                let nnz = matrix.nnz();
                let mut record = SparseGateRecord {
                    qubit_count,
                    rows: Vec::with_capacity(nnz),
                    cols: Vec::with_capacity(nnz),
                    values: Vec::with_capacity(nnz),
                };
                for (row, col, value) in matrix.triplet_iter() {
                    record.rows.push(row as u64);
                    record.cols.push(col as u64);
                    record.values.push((value.re, value.im));
                }
                GateRecord::Sparse(record)
            }
        })
    }
}

impl GateRecord {
    /// Rebuild the gate and validate it with the tolerances of `config`
    pub fn into_gate_with(self, config: &SimulatorConfig) -> Result<QuantumGate> {
        let operator = match self {
            GateRecord::Dense(dense) => {
                let dim = record_dimension(dense.qubit_count)?;
                if dense.entries.len() != dim * dim {
                    return Err(QuantumError::Format(format!(
                        "dense gate on {} qubits needs {} entries, found {}",
                        dense.qubit_count,
                        dim * dim,
                        dense.entries.len()
                    )));
                }
                let matrix = Array2::from_shape_vec((dim, dim), complex_values(&dense.entries))
                    .map_err(|err| QuantumError::Format(format!("dense gate entries: {err}")))?;
                UnitaryOperator::Dense(matrix)
            }
            GateRecord::Sparse(sparse) => {
                let dim = record_dimension(sparse.qubit_count)?;
                let nnz = sparse.values.len();
                if sparse.rows.len() != nnz || sparse.cols.len() != nnz {
                    return Err(QuantumError::Format(format!(
                        "sparse gate arrays differ in length: {} rows, {} cols, {nnz} values",
                        sparse.rows.len(),
                        sparse.cols.len()
                    )));
                }
                // Every row of a unitary holds a nonzero entry
                if nnz < dim {
                    return Err(QuantumError::Format(format!(
                        "sparse gate on {} qubits has only {nnz} entries",
                        sparse.qubit_count
                    )));
                }
                let triplets = sparse
                    .rows
                    .iter()
                    .zip(&sparse.cols)
                    .zip(complex_values(&sparse.values))
                    .map(|((&row, &col), value)| (row as usize, col as usize, value));
                let matrix = SparseMatrix::from_triplets(dim, dim, triplets)
                    .map_err(|err| QuantumError::Format(format!("sparse gate entry: {err}")))?;
                UnitaryOperator::Sparse(matrix)
            }
        };

        let mut gate = QuantumGate::unvalidated(operator);
        gate.validate_with(config)?;
        Ok(gate)
    }
}

impl TryFrom<GateRecord> for QuantumGate {
    type Error = QuantumError;

    fn try_from(record: GateRecord) -> Result<Self> {
        record.into_gate_with(&SimulatorConfig::default())
    }
}

impl Persist for QuantumGate {
    fn to_payload(&self) -> Result<Payload> {
        Ok(match GateRecord::try_from(self)? {
            GateRecord::Dense(dense) => Payload::DenseGate(dense),
            GateRecord::Sparse(sparse) => Payload::SparseGate(sparse),
        })
    }

    fn from_payload(payload: Payload) -> Result<Self> {
        match payload {
            Payload::DenseGate(dense) => QuantumGate::try_from(GateRecord::Dense(dense)),
            Payload::SparseGate(sparse) => QuantumGate::try_from(GateRecord::Sparse(sparse)),
            other => Err(kind_mismatch("gate", other.kind())),
        }
    }
}
