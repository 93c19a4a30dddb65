// src/quantum/state.rs
//! Qubit state vectors
//!
//! A [`Qubits`] value holds the joint state of `n` qubits as `2^n` complex
//! amplitudes. Every constructor and every mutation leaves the vector
//! normalized. Measurement is the only nondeterministic operation and always
//! draws from a caller-supplied random source.

use std::f64::consts::TAU;
use std::fmt::{self, Display};
use std::ops::BitXor;

use ndarray::Array1;
use num_complex::Complex64;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::trace;

use crate::config::{CollapsePhase, MAX_QUBITS, NORMALIZATION_TOLERANCE};
use crate::error::{QuantumError, Result};

/// Check that `length` can hold a state vector and return its qubit count.
///
/// The length must be a non-zero power of two.
pub fn validate_length(length: usize) -> Result<usize> {
    if length == 0 || !length.is_power_of_two() {
        return Err(QuantumError::Dimension(format!(
            "state vector length must be a non-zero power of two, got {length}"
        )));
    }
    Ok(length.trailing_zeros() as usize)
}

/// Joint state of a group of qubits
#[derive(Clone, Debug, PartialEq)]
pub struct Qubits {
    qubit_count: usize,
    amplitudes: Array1<Complex64>,
}

/// Result of measuring a [`Qubits`] value
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Observed basis index. For a partial observation only the bits selected
    /// by the mask can be set.
    pub outcome: usize,

    /// State of the unobserved qubits, present only for a partial observation
    pub residual: Option<Qubits>,
}

impl Qubits {
    /// Create `qubit_count` qubits in |0…0⟩
    pub fn new(qubit_count: usize) -> Result<Self> {
        Self::basis(qubit_count, 0)
    }

    /// Create `qubit_count` qubits in the computational basis state |index⟩
    pub fn basis(qubit_count: usize, index: usize) -> Result<Self> {
        if qubit_count == 0 {
            return Err(QuantumError::Dimension(
                "cannot create a state of 0 qubits".to_string(),
            ));
        }
        if qubit_count > MAX_QUBITS {
            return Err(QuantumError::Dimension(format!(
                "{qubit_count} qubits exceed the limit of {MAX_QUBITS}"
            )));
        }

        let dim = 1usize << qubit_count;
        if index >= dim {
            return Err(QuantumError::Dimension(format!(
                "index {index} is out of range for a {qubit_count}-qubit state"
            )));
        }

        let mut amplitudes = Array1::zeros(dim);
        amplitudes[index] = Complex64::new(1.0, 0.0);

        Ok(Qubits {
            qubit_count,
            amplitudes,
        })
    }

    /// Create a state from raw amplitudes. The amplitudes are normalized.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Result<Self> {
        Self::from_array(Array1::from(amplitudes))
    }

    /// Create a state from an amplitude array. The amplitudes are normalized.
    pub fn from_array(amplitudes: Array1<Complex64>) -> Result<Self> {
        let qubit_count = validate_length(amplitudes.len())?;
        let mut qubits = Qubits {
            qubit_count,
            amplitudes,
        };
        qubits.normalize()?;
        Ok(qubits)
    }

    /// Number of qubits described by this state
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Length of the amplitude vector (2^n)
    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    /// Get a reference to the amplitudes
    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    /// Probability of observing the basis state |index⟩
    pub fn probability(&self, index: usize) -> f64 {
        self.amplitudes
            .get(index)
            .map(|amp| amp.norm_sqr())
            .unwrap_or(0.0)
    }

    /// Born-rule weights of every basis state
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|amp| amp.norm_sqr()).collect()
    }

    /// Sum of squared magnitudes
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|amp| amp.norm_sqr()).sum()
    }

    /// Whether the squared norm is within `tolerance` of one
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.norm_sqr() - 1.0).abs() <= tolerance
    }

    /// Inner product ⟨self|other⟩
    pub fn inner_product(&self, other: &Self) -> Result<Complex64> {
        if self.dimension() != other.dimension() {
            return Err(QuantumError::Dimension(format!(
                "inner product of {}-qubit and {}-qubit states",
                self.qubit_count, other.qubit_count
            )));
        }

        Ok(self
            .amplitudes
            .iter()
            .zip(other.amplitudes.iter())
            .map(|(a, b)| a.conj() * b)
            .sum())
    }

    /// Tensor (Kronecker) product. Amplitude `i·len(other) + j` of the result
    /// is `self[i]·other[j]`.
    pub fn tensor(&self, other: &Self) -> Self {
        let self_dim = self.dimension();
        let other_dim = other.dimension();
        let mut new_amplitudes = Array1::zeros(self_dim * other_dim);

        for i in 0..self_dim {
            for j in 0..other_dim {
                new_amplitudes[i * other_dim + j] = self.amplitudes[i] * other.amplitudes[j];
            }
        }

        Qubits {
            qubit_count: self.qubit_count + other.qubit_count,
            amplitudes: new_amplitudes,
        }
    }

    /// Build a state of the same width from new amplitudes, normalizing them.
    pub(crate) fn with_amplitudes(&self, amplitudes: Array1<Complex64>) -> Result<Self> {
        if amplitudes.len() != self.dimension() {
            return Err(QuantumError::Dimension(format!(
                "expected {} amplitudes, got {}",
                self.dimension(),
                amplitudes.len()
            )));
        }
        Self::from_array(amplitudes)
    }

    fn normalize(&mut self) -> Result<()> {
        let norm = self.norm_sqr().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(QuantumError::ZeroNorm);
        }
        if (norm - 1.0).abs() > f64::EPSILON {
            self.amplitudes.mapv_inplace(|amp| amp / norm);
        }
        debug_assert!(self.is_normalized(NORMALIZATION_TOLERANCE));
        Ok(())
    }

    /// Measure every qubit and collapse to the observed basis state.
    pub fn observe<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        Ok(self.observe_masked(0, rng)?.outcome)
    }

    /// Measure the qubits selected by `bitmask`.
    ///
    /// A mask of zero or of all ones measures everything. See
    /// [`Qubits::observe_masked_with`].
    pub fn observe_masked<R: Rng + ?Sized>(
        &mut self,
        bitmask: usize,
        rng: &mut R,
    ) -> Result<Observation> {
        self.observe_masked_with(bitmask, CollapsePhase::Real, rng)
    }

    /// Measure the qubits selected by `bitmask`.
    ///
    /// Outcomes are drawn by the Born rule. For a full measurement the state
    /// collapses to the sampled basis vector and no residual is returned.
    ///
    /// For a partial measurement the basis indices are grouped by
    /// `index & bitmask` and one group is sampled by its total weight. The
    /// amplitudes of that group, ordered by their unmasked bits, become the
    /// residual state. `self` becomes a `popcount(bitmask)`-qubit basis state
    /// at the position of the outcome among the observable values.
    pub fn observe_masked_with<R: Rng + ?Sized>(
        &mut self,
        bitmask: usize,
        phase: CollapsePhase,
        rng: &mut R,
    ) -> Result<Observation> {
        let full_mask = self.dimension() - 1;
        if bitmask & !full_mask != 0 {
            return Err(QuantumError::Dimension(format!(
                "bitmask {bitmask:#b} selects qubits outside a {}-qubit state",
                self.qubit_count
            )));
        }

        if bitmask == 0 || bitmask == full_mask {
            let outcome = sample_index(&self.probabilities(), rng)?;
            self.amplitudes = collapsed(self.dimension(), outcome, phase, rng);
            trace!(outcome, qubits = self.qubit_count, "full observation");
            return Ok(Observation {
                outcome,
                residual: None,
            });
        }

        let observed_qubits = bitmask.count_ones() as usize;
        let mut marginal = vec![0.0; 1 << observed_qubits];
        for (index, amp) in self.amplitudes.iter().enumerate() {
            marginal[compress_bits(index, bitmask)] += amp.norm_sqr();
        }

        let position = sample_index(&marginal, rng)?;
        let outcome = expand_bits(position, bitmask);

        let residual_amplitudes: Array1<Complex64> = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(index, _)| index & bitmask == outcome)
            .map(|(_, amp)| *amp)
            .collect();
        let residual = Qubits::from_array(residual_amplitudes)?;

        self.qubit_count = observed_qubits;
        self.amplitudes = collapsed(marginal.len(), position, phase, rng);
        trace!(
            outcome,
            bitmask,
            residual_qubits = residual.qubit_count,
            "partial observation"
        );

        Ok(Observation {
            outcome,
            residual: Some(residual),
        })
    }
}

impl Default for Qubits {
    /// One qubit in |0⟩
    fn default() -> Self {
        let mut amplitudes = Array1::zeros(2);
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Qubits {
            qubit_count: 1,
            amplitudes,
        }
    }
}

impl BitXor for &Qubits {
    type Output = Qubits;

    fn bitxor(self, rhs: &Qubits) -> Qubits {
        self.tensor(rhs)
    }
}

impl BitXor for Qubits {
    type Output = Qubits;

    fn bitxor(self, rhs: Qubits) -> Qubits {
        self.tensor(&rhs)
    }
}

impl Display for Qubits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}-qubit state:", self.qubit_count)?;

        let threshold = 1e-10;
        let mut has_entries = false;

        for (i, amp) in self.amplitudes.iter().enumerate() {
            let prob = amp.norm_sqr();
            if prob > threshold {
                has_entries = true;
                let bit_string = format!("{:0width$b}", i, width = self.qubit_count);
                writeln!(
                    f,
                    "  ({:.6}{:+.6}i) |{}⟩ [{:.1}%]",
                    amp.re,
                    amp.im,
                    bit_string,
                    prob * 100.0
                )?;
            }
        }

        if !has_entries {
            writeln!(f, "  (zero state)")?;
        }

        Ok(())
    }
}

fn sample_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<usize> {
    let dist = WeightedIndex::new(weights).map_err(|_| QuantumError::ZeroNorm)?;
    Ok(dist.sample(rng))
}

fn collapsed<R: Rng + ?Sized>(
    dimension: usize,
    index: usize,
    phase: CollapsePhase,
    rng: &mut R,
) -> Array1<Complex64> {
    let mut amplitudes = Array1::zeros(dimension);
    amplitudes[index] = match phase {
        CollapsePhase::Real => Complex64::new(1.0, 0.0),
        CollapsePhase::Random => Complex64::from_polar(1.0, rng.gen_range(0.0..TAU)),
    };
    amplitudes
}

/// Gather the bits of `value` selected by `mask` into the low bits.
fn compress_bits(value: usize, mask: usize) -> usize {
    let mut result = 0;
    let mut out_bit = 0;
    let mut remaining = mask;
    while remaining != 0 {
        let lowest = remaining & remaining.wrapping_neg();
        if value & lowest != 0 {
            result |= 1 << out_bit;
        }
        out_bit += 1;
        remaining &= remaining - 1;
    }
    result
}

/// Inverse of [`compress_bits`]: scatter the low bits of `value` onto `mask`.
fn expand_bits(value: usize, mask: usize) -> usize {
    let mut result = 0;
    let mut in_bit = 0;
    let mut remaining = mask;
    while remaining != 0 {
        let lowest = remaining & remaining.wrapping_neg();
        if value & (1 << in_bit) != 0 {
            result |= lowest;
        }
        in_bit += 1;
        remaining &= remaining - 1;
    }
    result
}
