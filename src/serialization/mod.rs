//! Persistence for states, gates and circuits
//!
//! Every persisted object is wrapped in an [`Envelope`] that carries a format
//! version and a payload tagged with the object kind. The binary form is
//! bincode, the text form is JSON; both carry the same envelope. Runtime
//! values bound to circuit nodes are never persisted.

pub mod circuit;
pub mod gate;
pub mod qubits;

use std::fmt;
use std::fs;
use std::path::Path;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MAX_QUBITS;
use crate::error::{QuantumError, Result};

pub use circuit::{CircuitRecord, NodeRecord};
pub use gate::{DenseGateRecord, GateRecord, SparseGateRecord};
pub use qubits::QubitsRecord;

/// Envelope format version
pub const FORMAT_VERSION: u32 = 1;

/// Kind of object held by an envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Qubits,
    DenseGate,
    SparseGate,
    Circuit,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Qubits => "qubits",
            ObjectKind::DenseGate => "dense gate",
            ObjectKind::SparseGate => "sparse gate",
            ObjectKind::Circuit => "circuit",
        };
        f.write_str(name)
    }
}

/// Object-specific contents of an envelope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Qubits(QubitsRecord),
    DenseGate(DenseGateRecord),
    SparseGate(SparseGateRecord),
    Circuit(CircuitRecord),
}

impl Payload {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Payload::Qubits(_) => ObjectKind::Qubits,
            Payload::DenseGate(_) => ObjectKind::DenseGate,
            Payload::SparseGate(_) => ObjectKind::SparseGate,
            Payload::Circuit(_) => ObjectKind::Circuit,
        }
    }
}

/// Self-describing wrapper around a persisted object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Format version for compatibility checking
    pub version: u32,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(payload: Payload) -> Self {
        Envelope {
            version: FORMAT_VERSION,
            payload,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    /// Check version compatibility
    pub fn check_version(&self) -> Result<()> {
        if self.version > FORMAT_VERSION {
            return Err(QuantumError::Format(format!(
                "format version {} is newer than supported version {FORMAT_VERSION}",
                self.version
            )));
        }
        Ok(())
    }

    /// Decode a binary envelope
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = bincode::deserialize(bytes)?;
        envelope.check_version()?;
        Ok(envelope)
    }
}

/// Kind of the object stored in a binary envelope
pub fn peek_kind(bytes: &[u8]) -> Result<ObjectKind> {
    Ok(Envelope::from_bytes(bytes)?.kind())
}

pub(crate) fn kind_mismatch(expected: &str, found: ObjectKind) -> QuantumError {
    QuantumError::Format(format!("expected a {expected}, found a {found}"))
}

/// Objects that can be stored in an [`Envelope`]
pub trait Persist: Sized {
    /// Convert to a payload
    fn to_payload(&self) -> Result<Payload>;

    /// Rebuild from a payload. A payload of the wrong kind is a format error.
    fn from_payload(payload: Payload) -> Result<Self>;

    fn to_envelope(&self) -> Result<Envelope> {
        Ok(Envelope::new(self.to_payload()?))
    }

    fn from_envelope(envelope: Envelope) -> Result<Self> {
        envelope.check_version()?;
        Self::from_payload(envelope.payload)
    }

    /// Encode as bincode
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.to_envelope()?)?)
    }

    /// Decode from bincode
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_envelope(Envelope::from_bytes(bytes)?)
    }

    /// Encode as pretty-printed JSON
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_envelope()?)?)
    }

    /// Decode from JSON
    fn from_json(json: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(json)?;
        Self::from_envelope(envelope)
    }

    /// Write the binary encoding to `path`
    fn compile<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), &bytes)?;
        debug!(path = %path.as_ref().display(), bytes = bytes.len(), "compiled object");
        Ok(())
    }

    /// Read a binary encoding from `path`
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), bytes = bytes.len(), "loading object");
        Self::from_bytes(&bytes)
    }
}

pub(crate) fn complex_pairs<'a>(values: impl IntoIterator<Item = &'a Complex64>) -> Vec<(f64, f64)> {
    values.into_iter().map(|c| (c.re, c.im)).collect()
}

pub(crate) fn complex_values(pairs: &[(f64, f64)]) -> Vec<Complex64> {
    pairs
        .iter()
        .map(|&(re, im)| Complex64::new(re, im))
        .collect()
}

/// `2^qubit_count`, rejecting widths the simulator will not allocate
pub(crate) fn record_dimension(qubit_count: u32) -> Result<usize> {
    if qubit_count as usize > MAX_QUBITS {
        return Err(QuantumError::Format(format!(
            "{qubit_count} qubits exceed the limit of {MAX_QUBITS}"
        )));
    }
    Ok(1usize << qubit_count)
}
