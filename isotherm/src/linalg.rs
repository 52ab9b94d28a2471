/////////////////////////////////////////////////////////////////////////////////////////////
//
// Dense symmetric solvers with Cholesky, Bunch-Kaufman and least squares fallbacks.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # linalg
//!
//! Helper linear algebra functionality.
//!
//! The reduced RBF system is symmetric and, for admissible kernels and drifts,
//! positive definite. Rounding and large smoothing-free systems can break that in
//! practice, so [`SystemSolver`] walks a chain of increasingly tolerant solvers:
//!
//! 1. Cholesky `LLᵀ`.
//! 2. Bunch-Kaufman `LBLᵀ` for symmetric indefinite matrices.
//! 3. Truncated SVD least squares when the factorisations yield non-finite values.

use crate::error::{IsothermError, Result};
use faer::{
    linalg::solvers::{Lblt, Llt, Solve},
    Mat, Side,
};
use serde::{Deserialize, Serialize};

/// Which solver produced the weights of a fitted system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    Cholesky,
    BunchKaufman,
    LeastSquares,
}

/// Relative cutoff for singular values treated as zero in the least squares fallback.
const SVD_RELATIVE_TOLERANCE: f64 = 1E-12;

enum Factorisation {
    Llt(Llt<f64>),
    Lblt(Lblt<f64>),
}

/// Factorised symmetric system.
///
/// Only the lower triangle of the matrix is accessed.
pub struct SystemSolver {
    matrix: Mat<f64>,
    factorisation: Factorisation,
}

impl SystemSolver {
    /// Try LLᵀ first. If it fails (matrix not SPD / numerically indefinite),
    /// fall back to Bunch–Kaufman LBLᵀ.
    pub fn new(matrix: Mat<f64>) -> Self {
        let factorisation = match matrix.llt(Side::Lower) {
            Ok(llt) => Factorisation::Llt(llt),
            Err(_) => {
                log::debug!(
                    "cholesky failed on {0}x{0} system, using bunch-kaufman",
                    matrix.nrows()
                );
                Factorisation::Lblt(matrix.lblt(Side::Lower))
            }
        };

        Self {
            matrix,
            factorisation,
        }
    }

    /// The method that will be tried first by [`SystemSolver::solve`].
    pub fn method(&self) -> SolveMethod {
        match self.factorisation {
            Factorisation::Llt(_) => SolveMethod::Cholesky,
            Factorisation::Lblt(_) => SolveMethod::BunchKaufman,
        }
    }

    /// Solves `A X = rhs`, falling back to least squares on a non-finite result.
    ///
    /// ### Errors
    /// `SingularSystem` if the least squares fallback fails too.
    pub fn solve(&self, rhs: &Mat<f64>) -> Result<(Mat<f64>, SolveMethod)> {
        let solution = match &self.factorisation {
            Factorisation::Llt(s) => s.solve(rhs),
            Factorisation::Lblt(s) => s.solve(rhs),
        };

        if solution.is_all_finite() {
            return Ok((solution, self.method()));
        }

        log::warn!(
            "{:?} produced non-finite weights on {1}x{1} system, using least squares",
            self.method(),
            self.matrix.nrows()
        );

        let solution = least_squares(&self.matrix, rhs)?;
        Ok((solution, SolveMethod::LeastSquares))
    }
}

/// Minimum norm least squares solution of a symmetric system by truncated SVD.
///
/// Singular values below `SVD_RELATIVE_TOLERANCE * s_max` are discarded.
pub fn least_squares(matrix: &Mat<f64>, rhs: &Mat<f64>) -> Result<Mat<f64>> {
    let n = matrix.nrows();

    // Mirror the lower triangle so the decomposition sees the same matrix as the factorisations.
    let symmetric = Mat::<f64>::from_fn(n, n, |i, j| {
        if i >= j {
            matrix[(i, j)]
        } else {
            matrix[(j, i)]
        }
    });

    let svd = symmetric
        .svd()
        .map_err(|e| IsothermError::singular(n, format!("svd did not converge: {:?}", e)))?;

    let singular_values = svd.S().column_vector();
    let s_max = singular_values.iter().fold(0.0f64, |acc, s| acc.max(s.abs()));
    let cutoff = SVD_RELATIVE_TOLERANCE * s_max * n.max(1) as f64;

    let rank = singular_values.iter().filter(|s| s.abs() > cutoff).count();
    if rank == 0 || !s_max.is_finite() {
        return Err(IsothermError::singular(n, "system matrix is numerically zero"));
    }

    // x = V diag(1/s) Uᵀ rhs over the retained singular triplets.
    let mut projected = svd.U().transpose() * rhs;
    for (i, s) in singular_values.iter().enumerate() {
        let scale = if s.abs() > cutoff { 1.0 / s } else { 0.0 };
        projected.row_mut(i).iter_mut().for_each(|v| *v *= scale);
    }
    let solution = svd.V() * &projected;

    if !solution.is_all_finite() {
        return Err(IsothermError::singular(n, "least squares solution is not finite"));
    }

    log::debug!("least squares retained {} of {} singular values", rank, n);
    Ok(solution)
}
