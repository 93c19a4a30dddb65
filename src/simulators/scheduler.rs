//! Circuit execution
//!
//! Evaluates a [`QuantumCircuit`] in one forward pass over its nodes. Node
//! creation order is topological, so every dependency has been computed by
//! the time a node is reached. The pass works on scratch storage; node
//! bindings and observation results are only written once every node has
//! been evaluated.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, trace};

use crate::config::CollapsePhase;
use crate::error::{QuantumError, Result};
use crate::quantum::circuit::{CircuitQubitsNode, Inbound, Outbound, QuantumCircuit, QubitsRef};
use crate::quantum::state::Qubits;

/// Observation outcomes keyed by the node that received the observed state
pub type ObservationResults = HashMap<QubitsRef, usize>;

impl QuantumCircuit {
    /// Run the circuit with the entropy source described by its config.
    ///
    /// See [`QuantumCircuit::run_with_rng`].
    pub fn run(&mut self, results: Option<&mut ObservationResults>) -> Result<()> {
        let mut rng = self.config().rng();
        self.run_with_rng(&mut rng, results)
    }

    /// Run the circuit, drawing measurement outcomes from `rng`.
    ///
    /// Input nodes use their bound value or |0…0⟩. Values derived during an
    /// earlier run are discarded and recomputed, so repeated runs only depend
    /// on the inputs. Every node ends up bound to its computed value, and each
    /// observation outcome is recorded in `results` under the observed node.
    ///
    /// The structure is checked first; on any error the circuit is left as it
    /// was.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        results: Option<&mut ObservationResults>,
    ) -> Result<()> {
        self.check()?;
        debug!(
            nodes = self.nodes.len(),
            gates = self.gates.len(),
            "running circuit"
        );

        let phase = self.config().collapse_phase;
        let mut pass = Pass::new(&self.nodes);
        for index in 0..self.nodes.len() {
            pass.evaluate(self, QubitsRef(index), phase, rng)?;
        }

        let Pass {
            values, observed, ..
        } = pass;
        for (node, value) in self.nodes.iter_mut().zip(values) {
            node.bound = value;
        }
        if let Some(results) = results {
            results.extend(observed);
        }
        Ok(())
    }
}

/// Scratch state of one scheduler pass
struct Pass {
    values: Vec<Option<Qubits>>,
    processed: Vec<bool>,
    observed: Vec<(QubitsRef, usize)>,
}

impl Pass {
    fn new(nodes: &[CircuitQubitsNode]) -> Self {
        Pass {
            values: nodes
                .iter()
                .map(|node| {
                    if node.is_initial() {
                        node.input.clone()
                    } else {
                        None
                    }
                })
                .collect(),
            processed: vec![false; nodes.len()],
            observed: Vec::new(),
        }
    }

    fn evaluate<R: Rng + ?Sized>(
        &mut self,
        circuit: &QuantumCircuit,
        this: QubitsRef,
        phase: CollapsePhase,
        rng: &mut R,
    ) -> Result<()> {
        let node = circuit.node(this)?;
        let index = this.index();

        match &node.inbound {
            Inbound::None => {}
            Inbound::EntangledFrom(parts) => {
                let joint = self.entangle_parts(circuit, this, parts)?;
                self.values[index] = Some(joint);
            }
            Inbound::ObservedFrom(source) | Inbound::UnobservedFrom(source) => {
                if self.values[index].is_none() {
                    return Err(QuantumError::Ordering(format!(
                        "{this} was reached before {source} was observed"
                    )));
                }
            }
        }

        let mut value = match self.values[index].take() {
            Some(value) => value,
            None => Qubits::new(node.qubit_count)?,
        };

        for &gate in &node.applied_gates {
            circuit.gate(gate)?.apply(&mut value)?;
            trace!(qubits = %this, %gate, "applied gate");
        }

        match &node.outbound {
            Outbound::None | Outbound::EntangledTo(_) => {}
            Outbound::Observe { to } => {
                let mut collapsed = value.clone();
                let observation = collapsed.observe_masked_with(0, phase, rng)?;
                debug!(qubits = %this, outcome = observation.outcome, "observed");
                self.observed.push((*to, observation.outcome));
                self.values[to.index()] = Some(collapsed);
            }
            Outbound::PartialObserve {
                bitmask,
                observed,
                unobserved,
            } => {
                let mut collapsed = value.clone();
                let observation = collapsed.observe_masked_with(*bitmask, phase, rng)?;
                let residual = observation.residual.ok_or_else(|| {
                    QuantumError::Structural(format!(
                        "bitmask {bitmask:#b} of {this} left no unobserved qubits"
                    ))
                })?;
                debug!(
                    qubits = %this,
                    bitmask,
                    outcome = observation.outcome,
                    "partially observed"
                );
                self.observed.push((*observed, observation.outcome));
                self.values[observed.index()] = Some(collapsed);
                self.values[unobserved.index()] = Some(residual);
            }
        }

        self.values[index] = Some(value);
        self.processed[index] = true;
        Ok(())
    }

    fn entangle_parts(
        &self,
        circuit: &QuantumCircuit,
        this: QubitsRef,
        parts: &[QubitsRef],
    ) -> Result<Qubits> {
        let mut joint: Option<Qubits> = None;
        for &part in parts {
            let ready = part.index() < this.index()
                && self.processed.get(part.index()).copied().unwrap_or(false);
            if !ready {
                return Err(QuantumError::Ordering(format!(
                    "{this} needs {part}, which has not been computed"
                )));
            }
            if circuit.node(part)?.outbound != Outbound::EntangledTo(this) {
                return Err(QuantumError::Ordering(format!(
                    "{part} is not entangled into {this}"
                )));
            }
            let value = self.values[part.index()].as_ref().ok_or_else(|| {
                QuantumError::Ordering(format!("{part} has no value to entangle into {this}"))
            })?;

            joint = Some(match joint {
                None => value.clone(),
                Some(acc) => acc.tensor(value),
            });
        }

        joint.ok_or_else(|| QuantumError::Structural(format!("{this} is entangled from nothing")))
    }
}
