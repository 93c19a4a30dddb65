// src/quantum/circuit.rs
//! Circuit blueprints
//!
//! A [`QuantumCircuit`] describes the wiring of qubit groups and gates rather
//! than holding the qubits themselves. Nodes and gates live in append-only
//! tables and are addressed by stable indices ([`QubitsRef`], [`GateRef`]).
//! Because a node can only reference nodes created before it, creation order
//! is always a valid evaluation order.
//!
//! A node is *terminal* while nothing consumes it. Entangling it or marking it
//! for observation consumes it; after that no more gates can be queued on it.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gate::QuantumGate;
use super::state::Qubits;
use crate::config::{SimulatorConfig, MAX_QUBITS};
use crate::error::{QuantumError, Result};

/// Stable index of a qubit-group node in a circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitsRef(pub(crate) usize);

impl QubitsRef {
    /// Position of the node in the circuit's node table
    pub fn index(self) -> usize {
        self.0
    }
}

/// Refers to the node at `index`. Lookups through a circuit fail if it has
/// no such node.
impl From<usize> for QubitsRef {
    fn from(index: usize) -> Self {
        QubitsRef(index)
    }
}

impl fmt::Display for QubitsRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Stable index of a gate in a circuit's gate table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateRef(pub(crate) usize);

impl GateRef {
    /// Position of the gate in the circuit's gate table
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for GateRef {
    fn from(index: usize) -> Self {
        GateRef(index)
    }
}

impl fmt::Display for GateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Where a node's state comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
    /// An input node, bound externally or defaulting to |0…0⟩
    None,
    /// Tensor product of the listed nodes, in order
    EntangledFrom(Vec<QubitsRef>),
    /// The observed part of a full or partial observation
    ObservedFrom(QubitsRef),
    /// The residual part of a partial observation
    UnobservedFrom(QubitsRef),
}

/// What consumes a node's state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outbound {
    /// Nothing yet; the node is terminal
    None,
    /// Joined into the given entangled node
    EntangledTo(QubitsRef),
    /// Fully observed into `to`
    Observe { to: QubitsRef },
    /// Observed on the qubits selected by `bitmask`
    PartialObserve {
        bitmask: usize,
        observed: QubitsRef,
        unobserved: QubitsRef,
    },
}

/// How a node came to exist
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Created by [`QuantumCircuit::create_qubits`]
    Initial,
    /// Created by [`QuantumCircuit::entangle`]
    Entangled,
    /// Child of a full observation
    ObservedFull,
    /// Either child of a partial observation
    ObservedPartial,
}

/// A qubit-group placeholder
#[derive(Clone, Debug)]
pub struct CircuitQubitsNode {
    pub(crate) qubit_count: usize,
    pub(crate) applied_gates: Vec<GateRef>,
    pub(crate) inbound: Inbound,
    pub(crate) outbound: Outbound,
    pub(crate) label: Option<String>,
    pub(crate) input: Option<Qubits>,
    pub(crate) bound: Option<Qubits>,
}

impl CircuitQubitsNode {
    fn new(qubit_count: usize, inbound: Inbound) -> Self {
        CircuitQubitsNode {
            qubit_count,
            applied_gates: Vec::new(),
            inbound,
            outbound: Outbound::None,
            label: None,
            input: None,
            bound: None,
        }
    }

    pub(crate) fn from_parts(
        qubit_count: usize,
        applied_gates: Vec<GateRef>,
        inbound: Inbound,
        outbound: Outbound,
        label: Option<String>,
    ) -> Self {
        CircuitQubitsNode {
            qubit_count,
            applied_gates,
            inbound,
            outbound,
            label,
            input: None,
            bound: None,
        }
    }

    /// Width of the qubit group
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Gates queued on this node, in application order
    pub fn applied_gates(&self) -> &[GateRef] {
        &self.applied_gates
    }

    /// Where this node's state comes from
    pub fn inbound(&self) -> &Inbound {
        &self.inbound
    }

    /// What consumes this node's state
    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Label set with [`QuantumCircuit::label_qubits`]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Runtime value. For an input node this is the bound input until the
    /// circuit runs, and the value after its gates once it has.
    pub fn bound(&self) -> Option<&Qubits> {
        self.bound.as_ref()
    }

    /// Value bound with [`QuantumCircuit::bind_qubits`], used as the input of
    /// every run
    pub fn input(&self) -> Option<&Qubits> {
        self.input.as_ref()
    }

    /// Whether nothing consumes this node yet
    pub fn is_terminal(&self) -> bool {
        self.outbound == Outbound::None
    }

    /// Whether this node is a circuit input
    pub fn is_initial(&self) -> bool {
        self.inbound == Inbound::None
    }
}

/// A blueprint of qubit groups linked by entanglement and observation
#[derive(Clone, Debug, Default)]
pub struct QuantumCircuit {
    pub(crate) nodes: Vec<CircuitQubitsNode>,
    pub(crate) gates: Vec<QuantumGate>,
    config: SimulatorConfig,
}

impl QuantumCircuit {
    /// Create a new empty circuit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty circuit using `config` for validation and execution
    pub fn with_config(config: SimulatorConfig) -> Self {
        QuantumCircuit {
            config,
            ..Self::default()
        }
    }

    /// Rebuild a circuit from its tables and verify its structure
    pub(crate) fn from_tables(
        nodes: Vec<CircuitQubitsNode>,
        gates: Vec<QuantumGate>,
        config: SimulatorConfig,
    ) -> Result<Self> {
        let circuit = QuantumCircuit {
            nodes,
            gates,
            config,
        };
        circuit.check()?;
        Ok(circuit)
    }

    /// Tolerances, collapse phase and seed used by this circuit
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Replace the config. Gates already in the circuit are not re-validated.
    pub fn set_config(&mut self, config: SimulatorConfig) {
        self.config = config;
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> &[CircuitQubitsNode] {
        &self.nodes
    }

    /// All gates in insertion order
    pub fn gates(&self) -> &[QuantumGate] {
        &self.gates
    }

    /// Get a node by reference
    pub fn node(&self, qubits: QubitsRef) -> Result<&CircuitQubitsNode> {
        self.nodes.get(qubits.0).ok_or_else(|| {
            QuantumError::Structural(format!(
                "{qubits} does not exist in a circuit of {} nodes",
                self.nodes.len()
            ))
        })
    }

    /// Get a gate by reference
    pub fn gate(&self, gate: GateRef) -> Result<&QuantumGate> {
        self.gates.get(gate.0).ok_or_else(|| {
            QuantumError::Structural(format!(
                "{gate} does not exist in a circuit of {} gates",
                self.gates.len()
            ))
        })
    }

    /// Value currently bound to a node
    pub fn bound_qubits(&self, qubits: QubitsRef) -> Option<&Qubits> {
        self.nodes.get(qubits.0).and_then(|node| node.bound.as_ref())
    }

    /// Classify a node by how it was created
    pub fn node_kind(&self, qubits: QubitsRef) -> Result<NodeKind> {
        Ok(match &self.node(qubits)?.inbound {
            Inbound::None => NodeKind::Initial,
            Inbound::EntangledFrom(_) => NodeKind::Entangled,
            Inbound::UnobservedFrom(_) => NodeKind::ObservedPartial,
            Inbound::ObservedFrom(parent) => match self.node(*parent)?.outbound {
                Outbound::PartialObserve { .. } => NodeKind::ObservedPartial,
                _ => NodeKind::ObservedFull,
            },
        })
    }

    fn terminal_node(&self, qubits: QubitsRef) -> Result<&CircuitQubitsNode> {
        let node = self.node(qubits)?;
        if !node.is_terminal() {
            return Err(QuantumError::Structural(format!(
                "{qubits} has already been entangled or observed"
            )));
        }
        Ok(node)
    }

    fn push_node(&mut self, node: CircuitQubitsNode) -> QubitsRef {
        let qubits = QubitsRef(self.nodes.len());
        self.nodes.push(node);
        qubits
    }

    /// Create an input node of `qubit_count` qubits
    pub fn create_qubits(&mut self, qubit_count: usize) -> Result<QubitsRef> {
        check_width(qubit_count)?;
        let qubits = self.push_node(CircuitQubitsNode::new(qubit_count, Inbound::None));
        debug!(%qubits, qubit_count, "created qubits");
        Ok(qubits)
    }

    /// Attach a human-readable label to a node
    pub fn label_qubits(&mut self, qubits: QubitsRef, label: impl Into<String>) -> Result<()> {
        self.node(qubits)?;
        self.nodes[qubits.0].label = Some(label.into());
        Ok(())
    }

    /// Store a copy of `gate` in the circuit. The same gate can be applied any
    /// number of times.
    pub fn add_quantum_gate(&mut self, gate: &QuantumGate) -> Result<GateRef> {
        if !gate.is_validated() {
            return Err(QuantumError::InvalidGate(
                "only validated gates can be added to a circuit".to_string(),
            ));
        }
        let gate_ref = GateRef(self.gates.len());
        self.gates.push(gate.clone());
        debug!(gate = %gate_ref, qubit_count = gate.qubit_count(), "added gate");
        Ok(gate_ref)
    }

    /// Queue `gate` on `qubits`. Nothing is computed until the circuit runs.
    pub fn apply_quantum_gate_to_qubits(&mut self, gate: GateRef, qubits: QubitsRef) -> Result<()> {
        let gate_width = self.gate(gate)?.qubit_count();
        let node = self.terminal_node(qubits)?;
        if node.qubit_count != gate_width {
            return Err(QuantumError::Dimension(format!(
                "{gate_width}-qubit gate {gate} cannot act on {} qubits of {qubits}",
                node.qubit_count
            )));
        }

        self.nodes[qubits.0].applied_gates.push(gate);
        Ok(())
    }

    /// Join `qubit_sets` into one node. Their order fixes the tensor order, and
    /// none of them can be used afterwards.
    pub fn entangle(&mut self, qubit_sets: &[QubitsRef]) -> Result<QubitsRef> {
        if qubit_sets.is_empty() {
            return Err(QuantumError::Structural(
                "cannot entangle an empty list of qubits".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(qubit_sets.len());
        let mut qubit_count = 0;
        for &qubits in qubit_sets {
            if !seen.insert(qubits) {
                return Err(QuantumError::Structural(format!(
                    "{qubits} appears more than once in one entanglement"
                )));
            }
            qubit_count += self.terminal_node(qubits)?.qubit_count;
        }
        check_width(qubit_count)?;

        let entangled = QubitsRef(self.nodes.len());
        for &qubits in qubit_sets {
            self.nodes[qubits.0].outbound = Outbound::EntangledTo(entangled);
        }
        self.push_node(CircuitQubitsNode::new(
            qubit_count,
            Inbound::EntangledFrom(qubit_sets.to_vec()),
        ));
        debug!(qubits = %entangled, qubit_count, parts = qubit_sets.len(), "entangled qubits");
        Ok(entangled)
    }

    /// Mark `qubits` for full observation. Returns the node that receives the
    /// collapsed state.
    pub fn mark_for_observation(&mut self, qubits: QubitsRef) -> Result<QubitsRef> {
        let qubit_count = self.terminal_node(qubits)?.qubit_count;

        let observed = QubitsRef(self.nodes.len());
        self.nodes[qubits.0].outbound = Outbound::Observe { to: observed };
        self.push_node(CircuitQubitsNode::new(qubit_count, Inbound::ObservedFrom(qubits)));
        debug!(%qubits, %observed, "marked for observation");
        Ok(observed)
    }

    /// Mark the qubits of `qubits` selected by `bitmask` for observation.
    ///
    /// Returns the observed node and the node holding the unobserved
    /// remainder. A mask of zero or of all ones observes everything; in that
    /// case there is no remainder.
    pub fn mark_for_partial_observation(
        &mut self,
        qubits: QubitsRef,
        bitmask: usize,
    ) -> Result<(QubitsRef, Option<QubitsRef>)> {
        let qubit_count = self.terminal_node(qubits)?.qubit_count;
        let full_mask = (1usize << qubit_count) - 1;
        if bitmask > full_mask {
            return Err(QuantumError::Dimension(format!(
                "bitmask {bitmask:#b} selects qubits outside the {qubit_count} qubits of {qubits}"
            )));
        }
        if bitmask == 0 || bitmask == full_mask {
            return Ok((self.mark_for_observation(qubits)?, None));
        }

        let observed_count = bitmask.count_ones() as usize;
        let observed = QubitsRef(self.nodes.len());
        let unobserved = QubitsRef(self.nodes.len() + 1);
        self.nodes[qubits.0].outbound = Outbound::PartialObserve {
            bitmask,
            observed,
            unobserved,
        };
        self.push_node(CircuitQubitsNode::new(observed_count, Inbound::ObservedFrom(qubits)));
        self.push_node(CircuitQubitsNode::new(
            qubit_count - observed_count,
            Inbound::UnobservedFrom(qubits),
        ));
        debug!(%qubits, bitmask, %observed, %unobserved, "marked for partial observation");
        Ok((observed, Some(unobserved)))
    }

    /// Bind a runtime value to an input node
    pub fn bind_qubits(&mut self, qubits: QubitsRef, value: Qubits) -> Result<()> {
        let node = self.node(qubits)?;
        if !node.is_initial() {
            return Err(QuantumError::Binding(format!(
                "{qubits} is derived from other nodes and cannot be bound"
            )));
        }
        if node.qubit_count != value.qubit_count() {
            return Err(QuantumError::Binding(format!(
                "{qubits} holds {} qubits but {} were bound",
                node.qubit_count,
                value.qubit_count()
            )));
        }
        if !value.is_normalized(self.config.normalization_tolerance) {
            return Err(QuantumError::Binding(format!(
                "value bound to {qubits} has squared norm {}",
                value.norm_sqr()
            )));
        }

        let node = &mut self.nodes[qubits.0];
        node.input = Some(value.clone());
        node.bound = Some(value);
        Ok(())
    }

    /// Drop every runtime value, inputs included
    pub fn unbind_all_qubits(&mut self) {
        for node in &mut self.nodes {
            node.input = None;
            node.bound = None;
        }
    }

    /// Verify the structure of the circuit.
    ///
    /// Walks the nodes in creation order and fails on the first broken link,
    /// width mismatch or unknown reference.
    pub fn check(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            let this = QubitsRef(index);

            if node.qubit_count == 0 || node.qubit_count > MAX_QUBITS {
                return Err(structural(format!(
                    "{this} cannot hold {} qubits",
                    node.qubit_count
                )));
            }
            for &gate in &node.applied_gates {
                let width = self.gate(gate)?.qubit_count();
                if width != node.qubit_count {
                    return Err(structural(format!(
                        "{width}-qubit gate {gate} is queued on {} qubits of {this}",
                        node.qubit_count
                    )));
                }
            }
            for bound in node.input.iter().chain(node.bound.iter()) {
                if bound.qubit_count() != node.qubit_count {
                    return Err(structural(format!(
                        "{this} holds {} qubits but is bound to {}",
                        node.qubit_count,
                        bound.qubit_count()
                    )));
                }
            }

            self.check_inbound(this, node)?;
            self.check_outbound(this, node)?;
        }
        Ok(())
    }

    fn earlier_node(&self, this: QubitsRef, other: QubitsRef) -> Result<&CircuitQubitsNode> {
        if other.0 >= this.0 {
            return Err(structural(format!("{this} depends on later node {other}")));
        }
        self.node(other)
    }

    fn later_node(&self, this: QubitsRef, other: QubitsRef) -> Result<&CircuitQubitsNode> {
        if other.0 <= this.0 {
            return Err(structural(format!("{this} feeds earlier node {other}")));
        }
        self.node(other)
    }

    fn check_inbound(&self, this: QubitsRef, node: &CircuitQubitsNode) -> Result<()> {
        match &node.inbound {
            Inbound::None => Ok(()),
            Inbound::EntangledFrom(dependencies) => {
                if dependencies.is_empty() {
                    return Err(structural(format!("{this} is entangled from nothing")));
                }
                let mut seen = HashSet::with_capacity(dependencies.len());
                let mut total = 0;
                for &dependency in dependencies {
                    if !seen.insert(dependency) {
                        return Err(structural(format!(
                            "{dependency} is entangled into {this} twice"
                        )));
                    }
                    let parent = self.earlier_node(this, dependency)?;
                    if parent.outbound != Outbound::EntangledTo(this) {
                        return Err(structural(format!(
                            "{dependency} does not point back to entangled node {this}"
                        )));
                    }
                    total += parent.qubit_count;
                }
                if total != node.qubit_count {
                    return Err(structural(format!(
                        "{this} holds {} qubits but its parts hold {total}",
                        node.qubit_count
                    )));
                }
                Ok(())
            }
            Inbound::ObservedFrom(source) => {
                let parent = self.earlier_node(this, *source)?;
                let expected = match parent.outbound {
                    Outbound::Observe { to } if to == this => parent.qubit_count,
                    Outbound::PartialObserve { bitmask, observed, .. } if observed == this => {
                        bitmask.count_ones() as usize
                    }
                    _ => {
                        return Err(structural(format!(
                            "{source} is not observed into {this}"
                        )))
                    }
                };
                expect_width(this, node, expected)
            }
            Inbound::UnobservedFrom(source) => {
                let parent = self.earlier_node(this, *source)?;
                let expected = match parent.outbound {
                    Outbound::PartialObserve { bitmask, unobserved, .. } if unobserved == this => {
                        parent.qubit_count - bitmask.count_ones() as usize
                    }
                    _ => {
                        return Err(structural(format!(
                            "{source} does not leave {this} unobserved"
                        )))
                    }
                };
                expect_width(this, node, expected)
            }
        }
    }

    fn check_outbound(&self, this: QubitsRef, node: &CircuitQubitsNode) -> Result<()> {
        match &node.outbound {
            Outbound::None => Ok(()),
            Outbound::EntangledTo(target) => {
                let child = self.later_node(this, *target)?;
                match &child.inbound {
                    Inbound::EntangledFrom(parts) if parts.contains(&this) => Ok(()),
                    _ => Err(structural(format!(
                        "{target} does not list {this} among its parts"
                    ))),
                }
            }
            Outbound::Observe { to } => {
                let child = self.later_node(this, *to)?;
                if child.inbound != Inbound::ObservedFrom(this) {
                    return Err(structural(format!("{to} is not observed from {this}")));
                }
                Ok(())
            }
            Outbound::PartialObserve {
                bitmask,
                observed,
                unobserved,
            } => {
                let full_mask = (1usize << node.qubit_count) - 1;
                if *bitmask == 0 || *bitmask >= full_mask {
                    return Err(structural(format!(
                        "bitmask {bitmask:#b} is not a partial selection of {this}"
                    )));
                }
                if observed == unobserved {
                    return Err(structural(format!(
                        "{this} observes and leaves unobserved the same node {observed}"
                    )));
                }
                if self.later_node(this, *observed)?.inbound != Inbound::ObservedFrom(this) {
                    return Err(structural(format!("{observed} is not observed from {this}")));
                }
                if self.later_node(this, *unobserved)?.inbound != Inbound::UnobservedFrom(this) {
                    return Err(structural(format!(
                        "{unobserved} is not left unobserved by {this}"
                    )));
                }
                Ok(())
            }
        }
    }
}

fn structural(message: String) -> QuantumError {
    QuantumError::Structural(message)
}

fn expect_width(this: QubitsRef, node: &CircuitQubitsNode, expected: usize) -> Result<()> {
    if node.qubit_count != expected {
        return Err(structural(format!(
            "{this} holds {} qubits, expected {expected}",
            node.qubit_count
        )));
    }
    Ok(())
}

fn check_width(qubit_count: usize) -> Result<()> {
    if qubit_count == 0 {
        return Err(QuantumError::Dimension(
            "cannot create a qubits node of 0 qubits".to_string(),
        ));
    }
    if qubit_count > MAX_QUBITS {
        return Err(QuantumError::Dimension(format!(
            "{qubit_count} qubits exceed the limit of {MAX_QUBITS}"
        )));
    }
    Ok(())
}
