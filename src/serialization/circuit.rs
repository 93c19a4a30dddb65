//! Persisted form of circuit blueprints
//!
//! The gate table and node table are stored in order, so every
//! [`GateRef`] and [`QubitsRef`](crate::quantum::QubitsRef) keeps its meaning after a round trip.

use serde::{Deserialize, Serialize};

use super::gate::GateRecord;
use super::{kind_mismatch, Payload, Persist};
use crate::config::SimulatorConfig;
use crate::error::{QuantumError, Result};
use crate::quantum::circuit::{CircuitQubitsNode, GateRef, Inbound, Outbound, QuantumCircuit};

/// One node of a persisted circuit. Bound values are not part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub qubit_count: u32,
    pub applied_gates: Vec<GateRef>,
    pub inbound: Inbound,
    pub outbound: Outbound,
    pub label: Option<String>,
}

/// Ordered gate and node tables, and the config the gates were validated with
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    #[serde(default)]
    pub config: SimulatorConfig,
    pub gates: Vec<GateRecord>,
    pub nodes: Vec<NodeRecord>,
}

impl From<&CircuitQubitsNode> for NodeRecord {
    fn from(node: &CircuitQubitsNode) -> Self {
        NodeRecord {
            qubit_count: node.qubit_count() as u32,
            applied_gates: node.applied_gates().to_vec(),
            inbound: node.inbound().clone(),
            outbound: node.outbound().clone(),
            label: node.label().map(str::to_string),
        }
    }
}

impl TryFrom<&QuantumCircuit> for CircuitRecord {
    type Error = QuantumError;

    fn try_from(circuit: &QuantumCircuit) -> Result<Self> {
        circuit.check()?;
        Ok(CircuitRecord {
            config: circuit.config().clone(),
            gates: circuit
                .gates()
                .iter()
                .map(GateRecord::try_from)
                .collect::<Result<_>>()?,
            nodes: circuit.nodes().iter().map(NodeRecord::from).collect(),
        })
    }
}

impl TryFrom<CircuitRecord> for QuantumCircuit {
    type Error = QuantumError;

    fn try_from(record: CircuitRecord) -> Result<Self> {
        let config = record.config;
        let gates = record
            .gates
            .into_iter()
            .map(|gate| gate.into_gate_with(&config))
            .collect::<Result<Vec<_>>>()?;
        let nodes = record
            .nodes
            .into_iter()
            .map(|node| {
                CircuitQubitsNode::from_parts(
                    node.qubit_count as usize,
                    node.applied_gates,
                    node.inbound,
                    node.outbound,
                    node.label,
                )
            })
            .collect();
        QuantumCircuit::from_tables(nodes, gates, config)
    }
}

impl Persist for QuantumCircuit {
    fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::Circuit(CircuitRecord::try_from(self)?))
    }

    fn from_payload(payload: Payload) -> Result<Self> {
        match payload {
            Payload::Circuit(record) => QuantumCircuit::try_from(record),
            other => Err(kind_mismatch("circuit", other.kind())),
        }
    }
}

