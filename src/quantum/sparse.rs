// src/quantum/sparse.rs
//! Compressed sparse row storage for gate operators
//!
//! Permutation-like gates (identity, CNOT, oracles) have one nonzero per row;
//! storing them densely wastes `O(4^n)` memory. Entries are kept sorted by
//! row, then column, with exact zeros dropped.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::{QuantumError, Result};

/// A complex matrix in compressed sparse row form
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<Complex64>,
}

impl SparseMatrix {
    /// Build a matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate positions are summed and zero entries are dropped.
    pub fn from_triplets<I>(rows: usize, cols: usize, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, Complex64)>,
    {
        let mut entries: BTreeMap<(usize, usize), Complex64> = BTreeMap::new();
        for (row, col, value) in triplets {
            if row >= rows || col >= cols {
                return Err(QuantumError::Dimension(format!(
                    "entry ({row}, {col}) lies outside a {rows}x{cols} matrix"
                )));
            }
            *entries.entry((row, col)).or_default() += value;
        }

        let mut row_offsets = vec![0; rows + 1];
        let mut col_indices = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for ((row, col), value) in entries {
            if value.norm_sqr() == 0.0 {
                continue;
            }
            row_offsets[row + 1] += 1;
            col_indices.push(col);
            values.push(value);
        }
        for r in 0..rows {
            row_offsets[r + 1] += row_offsets[r];
        }

        Ok(SparseMatrix {
            rows,
            cols,
            row_offsets,
            col_indices,
            values,
        })
    }

    /// Square diagonal matrix
    pub fn from_diagonal(diagonal: &[Complex64]) -> Self {
        let dim = diagonal.len();
        let mut col_indices = Vec::with_capacity(dim);
        let mut values = Vec::with_capacity(dim);
        let mut row_offsets = Vec::with_capacity(dim + 1);
        row_offsets.push(0);
        for (i, value) in diagonal.iter().enumerate() {
            if value.norm_sqr() != 0.0 {
                col_indices.push(i);
                values.push(*value);
            }
            row_offsets.push(col_indices.len());
        }

        SparseMatrix {
            rows: dim,
            cols: dim,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// Square identity matrix
    pub fn identity(dim: usize) -> Self {
        Self::from_diagonal(&vec![Complex64::new(1.0, 0.0); dim])
    }

    /// Convert a dense matrix, keeping entries with magnitude above `threshold`
    pub fn from_dense(matrix: &Array2<Complex64>, threshold: f64) -> Self {
        let (rows, cols) = matrix.dim();
        let mut row_offsets = Vec::with_capacity(rows + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);
        for r in 0..rows {
            for c in 0..cols {
                let value = matrix[[r, c]];
                if value.norm() > threshold {
                    col_indices.push(c);
                    values.push(value);
                }
            }
            row_offsets.push(col_indices.len());
        }

        SparseMatrix {
            rows,
            cols,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored nonzero entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Entry at `(row, col)`, zero when not stored
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        if row >= self.rows {
            return Complex64::new(0.0, 0.0);
        }
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        match self.col_indices[range.clone()].binary_search(&col) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => Complex64::new(0.0, 0.0),
        }
    }

    /// Iterate over stored entries in row-major order
    pub fn triplet_iter(&self) -> impl Iterator<Item = (usize, usize, Complex64)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (self.row_offsets[row]..self.row_offsets[row + 1])
                .map(move |k| (row, self.col_indices[k], self.values[k]))
        })
    }

    /// Dense copy of this matrix
    pub fn to_dense(&self) -> Array2<Complex64> {
        let mut dense = Array2::zeros((self.rows, self.cols));
        for (row, col, value) in self.triplet_iter() {
            dense[[row, col]] = value;
        }
        dense
    }

    /// Matrix-vector product, computed row-parallel
    pub fn mul_vec(&self, vector: &Array1<Complex64>) -> Result<Array1<Complex64>> {
        if vector.len() != self.cols {
            return Err(QuantumError::Dimension(format!(
                "cannot multiply a {}x{} matrix by a vector of length {}",
                self.rows,
                self.cols,
                vector.len()
            )));
        }

        let products: Vec<Complex64> = (0..self.rows)
            .into_par_iter()
            .map(|row| {
                (self.row_offsets[row]..self.row_offsets[row + 1])
                    .map(|k| self.values[k] * vector[self.col_indices[k]])
                    .sum::<Complex64>()
            })
            .collect();

        Ok(Array1::from(products))
    }

    /// Conjugate transpose
    pub fn adjoint(&self) -> Self {
        let mut row_offsets = vec![0; self.cols + 1];
        for &col in &self.col_indices {
            row_offsets[col + 1] += 1;
        }
        for c in 0..self.cols {
            row_offsets[c + 1] += row_offsets[c];
        }

        let mut next = row_offsets.clone();
        let mut col_indices = vec![0; self.nnz()];
        let mut values = vec![Complex64::new(0.0, 0.0); self.nnz()];
        for (row, col, value) in self.triplet_iter() {
            let slot = next[col];
            col_indices[slot] = row;
            values[slot] = value.conj();
            next[col] += 1;
        }

        SparseMatrix {
            rows: self.cols,
            cols: self.rows,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// Matrix product `self × other`
    pub fn matmul(&self, other: &SparseMatrix) -> Result<Self> {
        if self.cols != other.rows {
            return Err(QuantumError::Dimension(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }

        let rows: Vec<Vec<(usize, Complex64)>> = (0..self.rows)
            .into_par_iter()
            .map(|row| {
                let mut acc: BTreeMap<usize, Complex64> = BTreeMap::new();
                for k in self.row_offsets[row]..self.row_offsets[row + 1] {
                    let mid = self.col_indices[k];
                    let left = self.values[k];
                    for j in other.row_offsets[mid]..other.row_offsets[mid + 1] {
                        *acc.entry(other.col_indices[j]).or_default() += left * other.values[j];
                    }
                }
                acc.into_iter().collect::<Vec<_>>()
            })
            .collect();

        let triplets = rows
            .into_iter()
            .enumerate()
            .flat_map(|(row, entries)| entries.into_iter().map(move |(col, v)| (row, col, v)));
        Self::from_triplets(self.rows, other.cols, triplets)
    }

    /// Kronecker product: entry `(r, s)` of `self` scales the block at
    /// `(r·rows₂, s·cols₂)`.
    pub fn kron(&self, other: &SparseMatrix) -> Self {
        let rows = self.rows * other.rows;
        let cols = self.cols * other.cols;
        let mut row_offsets = Vec::with_capacity(rows + 1);
        let mut col_indices = Vec::with_capacity(self.nnz() * other.nnz());
        let mut values = Vec::with_capacity(self.nnz() * other.nnz());
        row_offsets.push(0);

        // Row r·rows₂ + v gathers row r of self against row v of other; both are
        // column-sorted, so the output row is column-sorted too.
        for r in 0..self.rows {
            for v in 0..other.rows {
                for k in self.row_offsets[r]..self.row_offsets[r + 1] {
                    let s = self.col_indices[k];
                    for j in other.row_offsets[v]..other.row_offsets[v + 1] {
                        col_indices.push(s * other.cols + other.col_indices[j]);
                        values.push(self.values[k] * other.values[j]);
                    }
                }
                row_offsets.push(col_indices.len());
            }
        }

        SparseMatrix {
            rows,
            cols,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// Whether `self† × self` is within `tolerance` of the identity
    pub fn is_unitary(&self, tolerance: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        let product = match self.adjoint().matmul(self) {
            Ok(product) => product,
            Err(_) => return false,
        };

        (0..product.rows).all(|row| {
            let mut diagonal_seen = false;
            let entries_ok = (product.row_offsets[row]..product.row_offsets[row + 1]).all(|k| {
                let col = product.col_indices[k];
                let value = product.values[k];
                if col == row {
                    diagonal_seen = true;
                    (value - Complex64::new(1.0, 0.0)).norm() <= tolerance
                } else {
                    value.norm() <= tolerance
                }
            });
            entries_ok && diagonal_seen
        })
    }
}
