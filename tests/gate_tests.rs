use ndarray::{array, Array2};
use num_complex::Complex64;

use qdag::quantum::gate::{QuantumGate, UnitaryOperator};
use qdag::quantum::gate_operations::{tensor_all, tensor_copies};
use qdag::quantum::sparse::SparseMatrix;
use qdag::quantum::standard_gates::{constants, grover_diffusion, phase_oracle, StandardGate};
use qdag::quantum::state::Qubits;
use qdag::{QuantumError, SimulatorConfig};

/// Helper function for comparing complex numbers with tolerance
fn complex_approx_eq(a: Complex64, b: Complex64, epsilon: f64) -> bool {
    (a - b).norm() < epsilon
}

fn matrices_approx_eq(a: &Array2<Complex64>, b: &Array2<Complex64>, epsilon: f64) -> bool {
    a.shape() == b.shape()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| complex_approx_eq(*x, *y, epsilon))
}

fn gate(standard: StandardGate) -> QuantumGate {
    standard.gate().unwrap()
}

/// Dense copy of a sparse standard gate
fn densified(standard: StandardGate) -> QuantumGate {
    QuantumGate::from_matrix(gate(standard).operator().to_dense()).unwrap()
}

#[test]
fn test_hadamard_twice_is_identity_on_zero() {
    let h = gate(StandardGate::Hadamard);
    let mut qubits = Qubits::new(1).unwrap();

    h.apply(&mut qubits).unwrap();
    assert!((qubits.probability(0) - 0.5).abs() < 1e-12);
    assert!((qubits.probability(1) - 0.5).abs() < 1e-12);

    h.apply(&mut qubits).unwrap();
    assert!(complex_approx_eq(qubits.amplitudes()[0], constants::ONE, 1e-12));
    assert!(complex_approx_eq(qubits.amplitudes()[1], constants::ZERO, 1e-12));
}

#[test]
fn test_pauli_x_composed_with_itself_is_identity() {
    let x = gate(StandardGate::PauliX);
    let xx = x.compose(&x).unwrap();
    assert!(xx.operator().is_sparse());
    assert!(matrices_approx_eq(
        &xx.operator().to_dense(),
        &Array2::eye(2).mapv(|v: f64| Complex64::new(v, 0.0)),
        1e-12
    ));
}

#[test]
fn test_compose_order() {
    // Z·X sends |0⟩ to Z|1⟩ = −|1⟩
    let z = gate(StandardGate::PauliZ);
    let x = gate(StandardGate::PauliX);
    let zx = z.compose(&x).unwrap();
    assert!(!zx.operator().is_sparse());

    let mut qubits = Qubits::new(1).unwrap();
    zx.apply(&mut qubits).unwrap();
    assert!(complex_approx_eq(qubits.amplitudes()[1], -constants::ONE, 1e-12));

    let cnot = gate(StandardGate::CNOT);
    assert!(matches!(z.compose(&cnot), Err(QuantumError::Dimension(_))));
}

#[test]
fn test_invalid_gates_rejected() {
    let not_unitary = array![
        [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)],
        [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)]
    ];
    assert!(matches!(
        QuantumGate::from_matrix(not_unitary),
        Err(QuantumError::InvalidGate(_))
    ));

    let not_square = Array2::<Complex64>::zeros((2, 4));
    assert!(matches!(
        QuantumGate::from_matrix(not_square),
        Err(QuantumError::InvalidGate(_))
    ));

    let three_by_three = Array2::<Complex64>::eye(3);
    assert!(matches!(
        QuantumGate::from_matrix(three_by_three),
        Err(QuantumError::InvalidGate(_))
    ));

    let empty = Array2::<Complex64>::zeros((0, 0));
    assert!(matches!(
        QuantumGate::from_matrix(empty),
        Err(QuantumError::InvalidGate(_))
    ));

    let sparse_scaled = SparseMatrix::from_diagonal(&[Complex64::new(2.0, 0.0); 2]);
    assert!(matches!(
        QuantumGate::from_sparse(sparse_scaled),
        Err(QuantumError::InvalidGate(_))
    ));
}

#[test]
fn test_unvalidated_gate_cannot_be_used() {
    let mut raw = QuantumGate::unvalidated(UnitaryOperator::Dense(Array2::eye(2)));
    let mut qubits = Qubits::new(1).unwrap();
    assert!(matches!(raw.apply(&mut qubits), Err(QuantumError::InvalidGate(_))));

    raw.validate().unwrap();
    assert!(raw.is_validated());
    assert_eq!(raw.qubit_count(), 1);
    raw.apply(&mut qubits).unwrap();
}

#[test]
fn test_validation_tolerance_from_config() {
    let eps = 1e-8;
    let slightly_off = array![
        [Complex64::new(1.0 + eps, 0.0), Complex64::new(0.0, 0.0)],
        [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)]
    ];
    let mut strict = QuantumGate::unvalidated(UnitaryOperator::Dense(slightly_off.clone()));
    assert!(strict.validate().is_err());

    let config = SimulatorConfig {
        dense_unitarity_tolerance: 1e-6,
        ..SimulatorConfig::default()
    };
    let mut lenient = QuantumGate::unvalidated(UnitaryOperator::Dense(slightly_off));
    lenient.validate_with(&config).unwrap();
}

#[test]
fn test_width_mismatch_on_apply() {
    let cnot = gate(StandardGate::CNOT);
    let mut qubits = Qubits::new(1).unwrap();
    let before = qubits.clone();
    assert!(matches!(cnot.apply(&mut qubits), Err(QuantumError::Dimension(_))));
    assert_eq!(qubits, before);
}

#[test]
fn test_from_columns() {
    // Columns of X
    let x = QuantumGate::from_columns(
        [constants::ZERO, constants::ONE],
        [constants::ONE, constants::ZERO],
    )
    .unwrap();
    let mut qubits = Qubits::new(1).unwrap();
    x.apply(&mut qubits).unwrap();
    assert!((qubits.probability(1) - 1.0).abs() < 1e-12);

    let bad = QuantumGate::from_columns(
        [constants::ONE, constants::ZERO],
        [constants::ONE, constants::ZERO],
    );
    assert!(matches!(bad, Err(QuantumError::InvalidGate(_))));
}

#[test]
fn test_cnot_flips_target_when_control_set() {
    let cnot = gate(StandardGate::CNOT);
    for (input, expected) in [(0b00, 0b00), (0b01, 0b01), (0b10, 0b11), (0b11, 0b10)] {
        let mut qubits = Qubits::basis(2, input).unwrap();
        cnot.apply(&mut qubits).unwrap();
        assert!(
            (qubits.probability(expected) - 1.0).abs() < 1e-12,
            "CNOT|{input:02b}⟩ should be |{expected:02b}⟩"
        );
    }
}

#[test]
fn test_tensor_across_backings_agrees() {
    // H is dense, X is sparse
    let h_dense = gate(StandardGate::Hadamard);
    let x_sparse = gate(StandardGate::PauliX);
    let x_dense = densified(StandardGate::PauliX);
    let h_sparse = QuantumGate::from_sparse(SparseMatrix::from_dense(
        &h_dense.operator().to_dense(),
        0.0,
    ))
    .unwrap();

    let reference = h_dense.tensor(&x_dense).unwrap();
    assert!(!reference.operator().is_sparse());
    assert_eq!(reference.qubit_count(), 2);

    for (left, right) in [
        (&h_dense, &x_sparse),
        (&h_sparse, &x_dense),
        (&h_sparse, &x_sparse),
    ] {
        let product = left.tensor(right).unwrap();
        assert!(product.operator().is_sparse());
        assert!(matrices_approx_eq(
            &product.operator().to_dense(),
            &reference.operator().to_dense(),
            1e-12
        ));
    }
}

#[test]
fn test_tensor_acts_on_each_factor() {
    // (X ⊗ I)|00⟩ = |10⟩
    let xi = gate(StandardGate::PauliX)
        .tensor(&gate(StandardGate::Identity(1)))
        .unwrap();
    let mut qubits = Qubits::new(2).unwrap();
    xi.apply(&mut qubits).unwrap();
    assert!((qubits.probability(0b10) - 1.0).abs() < 1e-12);
}

#[test]
fn test_tensor_utilities() {
    let h = gate(StandardGate::Hadamard);
    let hhh = tensor_copies(&h, 3).unwrap();
    assert_eq!(hhh.qubit_count(), 3);

    let mut qubits = Qubits::new(3).unwrap();
    hhh.apply(&mut qubits).unwrap();
    for p in qubits.probabilities() {
        assert!((p - 0.125).abs() < 1e-12);
    }

    let mixed = tensor_all(&[h.clone(), gate(StandardGate::CNOT)]).unwrap();
    assert_eq!(mixed.qubit_count(), 3);
    assert!(tensor_all(&[]).is_err());
    assert!(tensor_copies(&h, 0).is_err());
}

#[test]
fn test_standard_gates_are_unitary() {
    let catalog = [
        StandardGate::Identity(3),
        StandardGate::PauliX,
        StandardGate::PauliY,
        StandardGate::PauliZ,
        StandardGate::Hadamard,
        StandardGate::S,
        StandardGate::T,
        StandardGate::PhaseShift(0.3),
        StandardGate::CNOT,
        StandardGate::CZ,
        StandardGate::Swap,
        StandardGate::Toffoli,
    ];
    for standard in catalog {
        let built = standard.gate().unwrap();
        assert!(built.is_validated());
        assert_eq!(built.qubit_count(), standard.qubit_count());
    }
}

#[test]
fn test_t_squared_is_s() {
    let t = gate(StandardGate::T);
    let s = gate(StandardGate::S);
    let tt = t.compose(&t).unwrap();
    assert!(matrices_approx_eq(
        &tt.operator().to_dense(),
        &s.operator().to_dense(),
        1e-12
    ));
}

#[test]
fn test_oracle_and_diffusion() {
    let oracle = phase_oracle(3, 5).unwrap();
    assert!(oracle.operator().is_sparse());
    assert!(complex_approx_eq(oracle.operator().entry(5, 5), -constants::ONE, 1e-12));
    assert!(matches!(phase_oracle(3, 8), Err(QuantumError::Dimension(_))));

    let diffusion = grover_diffusion(3).unwrap();
    assert_eq!(diffusion.qubit_count(), 3);
    // Diffusion leaves the uniform superposition unchanged
    let mut uniform = Qubits::from_amplitudes(vec![constants::ONE; 8]).unwrap();
    let before = uniform.clone();
    diffusion.apply(&mut uniform).unwrap();
    let overlap = before.inner_product(&uniform).unwrap();
    assert!(complex_approx_eq(overlap, constants::ONE, 1e-9));
}
