//! Persisted form of qubit states

use serde::{Deserialize, Serialize};

use super::{complex_pairs, complex_values, kind_mismatch, record_dimension, Payload, Persist};
use crate::error::{QuantumError, Result};
use crate::quantum::state::Qubits;

/// Qubit count and ordered `(re, im)` amplitude pairs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QubitsRecord {
    pub qubit_count: u32,
    pub amplitudes: Vec<(f64, f64)>,
}

impl From<&Qubits> for QubitsRecord {
    fn from(qubits: &Qubits) -> Self {
        QubitsRecord {
            qubit_count: qubits.qubit_count() as u32,
            amplitudes: complex_pairs(qubits.amplitudes()),
        }
    }
}

impl TryFrom<QubitsRecord> for Qubits {
    type Error = QuantumError;

    fn try_from(record: QubitsRecord) -> Result<Self> {
        let expected = record_dimension(record.qubit_count)?;
        if record.amplitudes.len() != expected {
            return Err(QuantumError::Format(format!(
                "{} qubits need {expected} amplitudes, found {}",
                record.qubit_count,
                record.amplitudes.len()
            )));
        }
        Qubits::from_amplitudes(complex_values(&record.amplitudes))
    }
}

impl Persist for Qubits {
    fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::Qubits(QubitsRecord::from(self)))
    }

    fn from_payload(payload: Payload) -> Result<Self> {
        match payload {
            Payload::Qubits(record) => Qubits::try_from(record),
            other => Err(kind_mismatch("qubits", other.kind())),
        }
    }
}
