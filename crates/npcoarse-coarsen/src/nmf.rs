//! Nonnegative matrix factorization for the `mnmf` strategy.
//!
//! # Overview
//!
//! `mnmf` only needs per-vertex embeddings: the rows of `W` in
//! `X ≈ W · H`. The [`Factorizer`] trait is the seam; the bundled
//! [`MultiplicativeNmf`] runs Lee–Seung multiplicative updates for the
//! Frobenius loss from a seeded uniform random start.
//!
//! `X` is a sparse CSR matrix and only the `n × rank` and `rank × n`
//! factors are dense. No `n × n` dense product is ever formed: the error
//! uses `‖X − WH‖² = ‖X‖² − 2⟨X, WH⟩ + ⟨WᵀW, HHᵀ⟩`, where the middle term
//! is summed over the stored entries of `X` only.
//!
//! # Convergence
//!
//! Every 10 iterations the reconstruction error is measured. The loop stops
//! when the error drop since the previous check, relative to the initial
//! error, falls below `tol`, or after `max_iter` iterations.

use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;
use npcoarse_core::error::CoarsenError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, warn};

/// Guards multiplicative-update denominators.
const EPSILON: f64 = 1e-10;

/// Nonnegative factors with `x ≈ w * h`.
#[derive(Debug, Clone, PartialEq)]
pub struct Factors {
    /// `n × rank`; row `i` embeds vertex `i`.
    pub w: DMatrix<f64>,
    /// `rank × n`.
    pub h: DMatrix<f64>,
}

/// Low-rank nonnegative factorization.
pub trait Factorizer: Send + Sync {
    /// Factor `x` (square, nonnegative) at `rank`.
    ///
    /// # Errors
    ///
    /// Returns [`CoarsenError::Factorization`] when the factorization cannot
    /// produce finite factors.
    fn factorize(&self, x: &CsrMatrix<f64>, rank: usize) -> Result<Factors, CoarsenError>;
}

/// Multiplicative-update NMF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplicativeNmf {
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl Default for MultiplicativeNmf {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 0.005,
            seed: 0,
        }
    }
}

impl Factorizer for MultiplicativeNmf {
    #[instrument(skip(self, x), fields(n = x.nrows(), nnz = x.nnz()))]
    fn factorize(&self, x: &CsrMatrix<f64>, rank: usize) -> Result<Factors, CoarsenError> {
        if x.values().iter().any(|&v| v < 0.0 || !v.is_finite()) {
            return Err(CoarsenError::Factorization(
                "input matrix must be finite and nonnegative".to_string(),
            ));
        }
        let (rows, cols) = (x.nrows(), x.ncols());
        let rank = rank.max(1);
        let xt = x.transpose();
        let x_norm_sq: f64 = x.values().iter().map(|v| v * v).sum();

        // Uniform start scaled so that W·H has the magnitude of X.
        let cells = rows * cols;
        let mean = if cells == 0 {
            0.0
        } else {
            x.values().iter().sum::<f64>() / cells as f64
        };
        let scale = (mean / rank as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = DMatrix::from_fn(rows, rank, |_, _| scale * rng.gen_range(0.0..1.0));
        let mut h = DMatrix::from_fn(rank, cols, |_, _| scale * rng.gen_range(0.0..1.0));

        let initial_error = reconstruction_error(x, x_norm_sq, &w, &h);
        let mut previous_error = initial_error;
        let mut converged = initial_error <= 0.0;
        let mut iterations = 0;

        while !converged && iterations < self.max_iter {
            iterations += 1;

            // Wᵀ·X computed as (Xᵀ·W)ᵀ to keep the sparse operand on the left.
            let numerator = (&xt * &w).transpose();
            let denominator = w.transpose() * &w * &h;
            h.component_mul_assign(&numerator.component_div(&denominator.add_scalar(EPSILON)));

            let numerator = x * &h.transpose();
            let denominator = &w * (&h * h.transpose());
            w.component_mul_assign(&numerator.component_div(&denominator.add_scalar(EPSILON)));

            if iterations % 10 == 0 {
                let error = reconstruction_error(x, x_norm_sq, &w, &h);
                if (previous_error - error) / initial_error < self.tol {
                    converged = true;
                }
                previous_error = error;
            }
        }

        if !converged {
            warn!(
                max_iter = self.max_iter,
                "factorization reached the iteration limit before converging"
            );
        }
        if w.iter().chain(h.iter()).any(|v| !v.is_finite()) {
            return Err(CoarsenError::Factorization(format!(
                "non-finite factors after {iterations} iterations"
            )));
        }
        debug!(iterations, error = previous_error, "factorization finished");
        Ok(Factors { w, h })
    }
}

/// `‖X − WH‖_F` without materializing `WH`.
fn reconstruction_error(
    x: &CsrMatrix<f64>,
    x_norm_sq: f64,
    w: &DMatrix<f64>,
    h: &DMatrix<f64>,
) -> f64 {
    let cross: f64 = x
        .triplet_iter()
        .map(|(i, j, &v)| v * w.row(i).transpose().dot(&h.column(j)))
        .sum();
    let gram = (w.transpose() * w).component_mul(&(h * h.transpose())).sum();
    (x_norm_sq - 2.0 * cross + gram).max(0.0).sqrt()
}

/// Cosine similarity of rows `a` and `b` of `m`; 0 if either row is all zero.
#[must_use]
pub fn row_cosine(m: &DMatrix<f64>, a: usize, b: usize) -> f64 {
    let ra = m.row(a);
    let rb = m.row(b);
    let na = ra.norm();
    let nb = rb.norm();
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }
    ra.dot(&rb) / (na * nb)
}
