use std::path::PathBuf;

use ndarray::array;
use num_complex::Complex64;

use qdag::quantum::circuit::{Inbound, Outbound, QuantumCircuit};
use qdag::quantum::gate::{QuantumGate, UnitaryOperator};
use qdag::quantum::sparse::SparseMatrix;
use qdag::quantum::standard_gates::{phase_oracle, StandardGate};
use qdag::quantum::state::Qubits;
use qdag::serialization::{peek_kind, Envelope, GateRecord, ObjectKind, Persist, FORMAT_VERSION};
use qdag::simulators::ObservationResults;
use qdag::{CollapsePhase, QuantumError, SimulatorConfig};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("qdag-{}-{name}", std::process::id()))
}

fn sample_qubits() -> Qubits {
    Qubits::from_amplitudes(vec![
        Complex64::new(0.5, 0.1),
        Complex64::new(-0.2, 0.7),
        Complex64::new(0.0, -0.3),
        Complex64::new(0.4, 0.0),
    ])
    .unwrap()
}

fn sample_circuit() -> QuantumCircuit {
    let mut circuit = QuantumCircuit::new();
    let h = circuit
        .add_quantum_gate(&StandardGate::Hadamard.gate().unwrap())
        .unwrap();
    let cnot = circuit
        .add_quantum_gate(&StandardGate::CNOT.gate().unwrap())
        .unwrap();

    let a = circuit.create_qubits(1).unwrap();
    let b = circuit.create_qubits(2).unwrap();
    circuit.label_qubits(a, "control").unwrap();
    circuit.apply_quantum_gate_to_qubits(h, a).unwrap();
    circuit.apply_quantum_gate_to_qubits(cnot, b).unwrap();
    let joint = circuit.entangle(&[a, b]).unwrap();
    let (_, unobserved) = circuit.mark_for_partial_observation(joint, 0b110).unwrap();
    circuit.mark_for_observation(unobserved.unwrap()).unwrap();
    circuit
}

fn assert_same_amplitudes(a: &Qubits, b: &Qubits) {
    assert_eq!(a.qubit_count(), b.qubit_count());
    for (x, y) in a.amplitudes().iter().zip(b.amplitudes().iter()) {
        assert!((x - y).norm() < 1e-3);
    }
}

fn assert_same_gate(a: &QuantumGate, b: &QuantumGate) {
    assert_eq!(a.qubit_count(), b.qubit_count());
    assert_eq!(a.operator().is_sparse(), b.operator().is_sparse());
    let dim = a.dimension();
    for r in 0..dim {
        for c in 0..dim {
            let diff = a.operator().entry(r, c) - b.operator().entry(r, c);
            assert!(diff.norm() < 1e-3);
        }
    }
}

fn assert_same_topology(a: &QuantumCircuit, b: &QuantumCircuit) {
    assert_eq!(a.nodes().len(), b.nodes().len());
    assert_eq!(a.gates().len(), b.gates().len());
    for (x, y) in a.nodes().iter().zip(b.nodes()) {
        assert_eq!(x.qubit_count(), y.qubit_count());
        assert_eq!(x.applied_gates(), y.applied_gates());
        assert_eq!(x.inbound(), y.inbound());
        assert_eq!(x.outbound(), y.outbound());
        assert_eq!(x.label(), y.label());
    }
    for (x, y) in a.gates().iter().zip(b.gates()) {
        assert_same_gate(x, y);
    }
}

#[test]
fn test_qubits_round_trip() {
    let qubits = sample_qubits();

    let bytes = qubits.to_bytes().unwrap();
    assert_eq!(peek_kind(&bytes).unwrap(), ObjectKind::Qubits);
    assert_same_amplitudes(&qubits, &Qubits::from_bytes(&bytes).unwrap());

    let json = qubits.to_json().unwrap();
    assert_same_amplitudes(&qubits, &Qubits::from_json(&json).unwrap());
}

#[test]
fn test_gate_round_trip_keeps_backing() {
    let dense = StandardGate::Hadamard.gate().unwrap();
    let bytes = dense.to_bytes().unwrap();
    assert_eq!(peek_kind(&bytes).unwrap(), ObjectKind::DenseGate);
    assert_same_gate(&dense, &QuantumGate::from_bytes(&bytes).unwrap());

    let sparse = phase_oracle(4, 9).unwrap();
    let bytes = sparse.to_bytes().unwrap();
    assert_eq!(peek_kind(&bytes).unwrap(), ObjectKind::SparseGate);
    let loaded = QuantumGate::from_bytes(&bytes).unwrap();
    assert!(loaded.is_validated());
    assert_same_gate(&sparse, &loaded);

    let toffoli = StandardGate::Toffoli.gate().unwrap();
    let json = toffoli.to_json().unwrap();
    assert_same_gate(&toffoli, &QuantumGate::from_json(&json).unwrap());
}

#[test]
fn test_non_unitary_gate_fails_on_load() {
    // Hand-written envelope holding a scaled identity
    let json = format!(
        r#"{{"version": {FORMAT_VERSION}, "payload": {{"SparseGate": {{
            "qubit_count": 1, "rows": [0, 1], "cols": [0, 1],
            "values": [[2.0, 0.0], [2.0, 0.0]]
        }}}}}}"#
    );
    assert!(matches!(
        QuantumGate::from_json(&json),
        Err(QuantumError::InvalidGate(_))
    ));

    let ragged = format!(
        r#"{{"version": {FORMAT_VERSION}, "payload": {{"SparseGate": {{
            "qubit_count": 1, "rows": [0, 1], "cols": [0],
            "values": [[1.0, 0.0], [1.0, 0.0]]
        }}}}}}"#
    );
    assert!(matches!(
        QuantumGate::from_json(&ragged),
        Err(QuantumError::Format(_))
    ));
}

#[test]
fn test_circuit_round_trip() {
    let circuit = sample_circuit();
    let loaded = QuantumCircuit::from_bytes(&circuit.to_bytes().unwrap()).unwrap();
    assert_same_topology(&circuit, &loaded);

    let loaded = QuantumCircuit::from_json(&circuit.to_json().unwrap()).unwrap();
    assert_same_topology(&circuit, &loaded);

    assert!(matches!(loaded.nodes()[2].inbound(), Inbound::EntangledFrom(parts) if parts.len() == 2));
    assert!(matches!(
        loaded.nodes()[2].outbound(),
        Outbound::PartialObserve { bitmask: 0b110, .. }
    ));
}

#[test]
fn test_bound_values_are_not_persisted() {
    let mut circuit = sample_circuit();
    let first = circuit.nodes().iter().position(|n| n.is_initial()).unwrap();
    let first = qdag::quantum::QubitsRef::from(first);
    circuit.bind_qubits(first, Qubits::basis(1, 1).unwrap()).unwrap();
    circuit.run(None).unwrap();
    assert!(circuit.nodes().iter().all(|n| n.bound().is_some()));

    let loaded = QuantumCircuit::from_bytes(&circuit.to_bytes().unwrap()).unwrap();
    assert!(loaded.nodes().iter().all(|n| n.bound().is_none() && n.input().is_none()));
    assert_same_topology(&circuit, &loaded);
}

#[test]
fn test_kind_mismatch_is_format_error() {
    let bytes = sample_qubits().to_bytes().unwrap();
    assert!(matches!(
        QuantumGate::from_bytes(&bytes),
        Err(QuantumError::Format(_))
    ));
    assert!(matches!(
        QuantumCircuit::from_bytes(&bytes),
        Err(QuantumError::Format(_))
    ));

    let gate_json = StandardGate::PauliX.gate().unwrap().to_json().unwrap();
    assert!(matches!(
        Qubits::from_json(&gate_json),
        Err(QuantumError::Format(_))
    ));
}

#[test]
fn test_malformed_input_is_format_error() {
    assert!(matches!(
        Qubits::from_bytes(&[1, 2, 3]),
        Err(QuantumError::Format(_))
    ));
    assert!(matches!(
        Qubits::from_json("{ not json"),
        Err(QuantumError::Format(_))
    ));

    let short = format!(
        r#"{{"version": {FORMAT_VERSION}, "payload": {{"Qubits": {{
            "qubit_count": 2, "amplitudes": [[1.0, 0.0], [0.0, 0.0]]
        }}}}}}"#
    );
    assert!(matches!(
        Qubits::from_json(&short),
        Err(QuantumError::Format(_))
    ));

    // Oversized or underfilled gate records fail before anything is allocated
    let records = [
        r#"{"SparseGate": {"qubit_count": 62, "rows": [], "cols": [], "values": []}}"#,
        r#"{"SparseGate": {"qubit_count": 20, "rows": [0], "cols": [0], "values": [[1.0, 0.0]]}}"#,
        r#"{"DenseGate": {"qubit_count": 62, "entries": []}}"#,
        r#"{"DenseGate": {"qubit_count": 1, "entries": [[1.0, 0.0]]}}"#,
    ];
    for payload in records {
        let json = format!(r#"{{"version": {FORMAT_VERSION}, "payload": {payload}}}"#);
        let result = QuantumGate::from_json(&json);
        assert!(
            matches!(result, Err(QuantumError::Format(_))),
            "{payload} should be a format error, got {result:?}"
        );
    }

    let huge_state = format!(
        r#"{{"version": {FORMAT_VERSION}, "payload": {{"Qubits": {{
            "qubit_count": 62, "amplitudes": []
        }}}}}}"#
    );
    assert!(matches!(
        Qubits::from_json(&huge_state),
        Err(QuantumError::Format(_))
    ));
}

#[test]
fn test_circuit_keeps_its_validation_tolerances() {
    let config = SimulatorConfig {
        dense_unitarity_tolerance: 1e-6,
        ..SimulatorConfig::seeded(12)
    };
    let slightly_off = array![
        [Complex64::new(1.0 + 1e-8, 0.0), Complex64::new(0.0, 0.0)],
        [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)]
    ];
    let mut gate = QuantumGate::unvalidated(UnitaryOperator::Dense(slightly_off));
    gate.validate_with(&config).unwrap();

    let mut circuit = QuantumCircuit::with_config(config.clone());
    let g = circuit.add_quantum_gate(&gate).unwrap();
    let q = circuit.create_qubits(1).unwrap();
    circuit.apply_quantum_gate_to_qubits(g, q).unwrap();

    let loaded = QuantumCircuit::from_bytes(&circuit.to_bytes().unwrap()).unwrap();
    assert_eq!(loaded.config(), &config);
    assert_same_topology(&circuit, &loaded);

    let loaded = QuantumCircuit::from_json(&circuit.to_json().unwrap()).unwrap();
    assert_eq!(loaded.config(), &config);

    // On its own the gate only reloads under the same tolerance
    let record = GateRecord::try_from(&gate).unwrap();
    assert!(matches!(
        QuantumGate::try_from(record.clone()),
        Err(QuantumError::InvalidGate(_))
    ));
    assert_same_gate(&gate, &record.into_gate_with(&config).unwrap());
}

#[test]
fn test_config_file_drives_a_loaded_circuit() {
    let config_path = temp_path("config.json");
    std::fs::write(
        &config_path,
        r#"{"seed": 77, "collapse_phase": "random", "sparse_unitarity_tolerance": 1e-5}"#,
    )
    .unwrap();
    let config = SimulatorConfig::from_file(&config_path).unwrap();
    std::fs::remove_file(&config_path).unwrap();

    assert_eq!(config.seed, Some(77));
    assert_eq!(config.collapse_phase, CollapsePhase::Random);
    assert_eq!(config.sparse_unitarity_tolerance, 1e-5);
    assert_eq!(config.dense_unitarity_tolerance, SimulatorConfig::default().dense_unitarity_tolerance);

    let mut circuit = QuantumCircuit::from_bytes(&sample_circuit().to_bytes().unwrap()).unwrap();
    assert_eq!(circuit.config(), &SimulatorConfig::default());
    circuit.set_config(config.clone());
    assert_eq!(circuit.config(), &config);

    let mut first = ObservationResults::new();
    circuit.run(Some(&mut first)).unwrap();
    let mut second = ObservationResults::new();
    circuit.run(Some(&mut second)).unwrap();
    assert_eq!(first, second);

    assert!(matches!(
        SimulatorConfig::from_file(temp_path("missing-config.json")),
        Err(QuantumError::Io(_))
    ));
}

#[test]
fn test_newer_version_rejected() {
    let mut envelope = sample_qubits().to_envelope().unwrap();
    envelope.version = FORMAT_VERSION + 1;
    let bytes = bincode::serialize(&envelope).unwrap();

    assert!(matches!(
        Envelope::from_bytes(&bytes),
        Err(QuantumError::Format(_))
    ));
    assert!(matches!(
        Qubits::from_bytes(&bytes),
        Err(QuantumError::Format(_))
    ));
}

#[test]
fn test_compile_and_load_files() {
    let qubits_path = temp_path("state.bin");
    let gate_path = temp_path("gate.bin");
    let circuit_path = temp_path("circuit.bin");

    let qubits = sample_qubits();
    qubits.compile(&qubits_path).unwrap();
    assert_same_amplitudes(&qubits, &Qubits::load(&qubits_path).unwrap());

    let gate = QuantumGate::from_sparse(SparseMatrix::identity(4)).unwrap();
    gate.compile(&gate_path).unwrap();
    assert_same_gate(&gate, &QuantumGate::load(&gate_path).unwrap());

    let circuit = sample_circuit();
    circuit.compile(&circuit_path).unwrap();
    assert_same_topology(&circuit, &QuantumCircuit::load(&circuit_path).unwrap());

    for path in [qubits_path, gate_path, circuit_path] {
        std::fs::remove_file(path).unwrap();
    }

    assert!(matches!(
        Qubits::load(temp_path("missing.bin")),
        Err(QuantumError::Io(_))
    ));
}
