/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the RBF interpolator, coefficient management, and solver orchestration logic.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # rbf
//!
//! Dense radial basis function interpolation of scattered station values.
//!
//! When a polynomial drift is included the augmented system
//!
//! ```text
//! [ A   P ] [w]   [v]
//! [ Pᵀ  0 ] [c] = [0]
//! ```
//!
//! is reduced with Beatson's choice of `Q` (a Lagrange basis on a unisolvent set of
//! "special points") to `QᵀAQ γ = Qᵀv`, which is symmetric positive definite for
//! conditionally positive definite kernels and can be solved with Cholesky.
//!
//! Fitting is `O(N³)` time and `O(N²)` memory. Evaluation is `O(N·M)` for `M`
//! targets and runs in parallel over chunks of target rows.
//!
//! # References
//! 1.  R. K. Beatson, W. A. Light, and S. Billings. Fast solution of the radial basis
//!     function interpolation equations: domain decomposition methods. SIAM J. Sci.
//!     Comput., 22(5):1717–1740 (electronic), 2000.
//! 2. J. B. Cherrie. Fast Evaluation of Radial Basis Functions: Theory and Application.
//!     PhD thesis, University of Canterbury, 2000.

use crate::{
    common,
    error::{IsothermError, Result},
    grid::{FieldSample, Grid},
    interpolant_config::InterpolantSettings,
    linalg::{SolveMethod, SystemSolver},
    polynomials::{self, MonomialScaling},
    progress::{self, ProgressMsg, ProgressSink},
};

use faer::{
    linalg::{matmul, solvers::Solve},
    reborrow::*,
    Accum, Mat, Par,
};
use isotherm_utils::KernelParams;
use rayon::prelude::*;
use std::{collections::HashSet, sync::Arc, time::Instant};

/// Number of target rows evaluated per parallel task.
const EVAL_CHUNK_SIZE: usize = 1024;

/// Relative threshold on the pivoted QR diagonal below which a monomial is
/// treated as dependent on the others.
const RANK_TOLERANCE: f64 = 1E-10;

/// Coefficients of a solved RBF system.
#[derive(Debug, Clone)]
pub struct Coefficients {
    /// Weights associated with the RBF centers (data points), in input order.
    pub point_coefficients: Mat<f64>,

    /// Coefficients of the independent drift monomials, if a drift is present.
    pub poly_coefficients: Option<Mat<f64>>,
}

impl Coefficients {
    pub(crate) fn new(point_coefficients: Mat<f64>, poly_coefficients: Option<Mat<f64>>) -> Self {
        Self {
            point_coefficients,
            poly_coefficients,
        }
    }
}

/// A convenience builder for constructing an [`RbfInterpolator`].
///
/// The builder should be called via the [`RbfInterpolator::builder`] method.
pub struct RbfInterpolatorBuilder {
    points: Mat<f64>,
    point_values: Mat<f64>,
    interpolant_settings: InterpolantSettings,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RbfInterpolatorBuilder {
    fn new(points: Mat<f64>, point_values: Mat<f64>, interpolant_settings: InterpolantSettings) -> Self {
        Self {
            points,
            point_values,
            interpolant_settings,
            progress_callback: None,
        }
    }

    /// Optional callback for reporting solver progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Fits the interpolant.
    ///
    /// ### Errors
    /// - `EmptyInput` if there are no points.
    /// - `InvalidParameter` for invalid settings or malformed inputs.
    /// - `SingularSystem` if the system cannot be solved.
    pub fn build(self) -> Result<RbfInterpolator> {
        RbfInterpolator::new(
            self.points,
            self.point_values,
            self.interpolant_settings,
            self.progress_callback,
        )
    }
}

/// Drift polynomial of a fitted interpolant.
#[derive(Debug, Clone)]
struct DriftBasis {
    scaling: MonomialScaling,

    /// Indices of the independent monomial columns the coefficients refer to.
    columns: Vec<usize>,
}

/// A fitted radial basis function interpolant.
#[derive(Debug)]
pub struct RbfInterpolator {
    /// Coordinates of the input data points, `(n x 2)`.
    pub points: Mat<f64>,

    /// Values at each input point, `(n x channels)`.
    pub point_values: Mat<f64>,

    coefficients: Coefficients,

    interpolant_settings: InterpolantSettings,

    /// Resolved kernel shape parameter.
    epsilon: f64,

    drift_basis: Option<DriftBasis>,

    solve_method: SolveMethod,

    progress_callback: Option<Arc<dyn ProgressSink>>,
}

/// Weights and method produced by one of the system solves.
struct Solution {
    coefficients: Coefficients,
    drift_basis: Option<DriftBasis>,
    method: SolveMethod,
}

impl RbfInterpolator {
    /// Creates a new [`RbfInterpolatorBuilder`] for the given points,
    /// values, and kernel settings.
    pub fn builder(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> RbfInterpolatorBuilder {
        RbfInterpolatorBuilder::new(points, point_values, interpolant_settings)
    }

    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> Result<Self> {
        let solver_start = Instant::now();

        interpolant_settings.validate()?;

        let num_points = points.nrows();
        if num_points == 0 {
            return Err(IsothermError::EmptyInput { dropped: 0 });
        }
        if points.ncols() != 2 {
            return Err(IsothermError::invalid(
                "points",
                format!("expected 2 coordinate columns, got {}", points.ncols()),
            ));
        }
        if point_values.nrows() != num_points || point_values.ncols() == 0 {
            return Err(IsothermError::invalid(
                "point_values",
                format!(
                    "expected {} rows with at least one column, got {}x{}",
                    num_points,
                    point_values.nrows(),
                    point_values.ncols()
                ),
            ));
        }
        if !points.is_all_finite() || !point_values.is_all_finite() {
            return Err(IsothermError::invalid("points", "coordinates and values must be finite"));
        }

        let epsilon = interpolant_settings
            .epsilon
            .unwrap_or_else(|| common::mean_point_spacing(&points));
        let kernel_params = interpolant_settings.kernel_params(epsilon);

        let solution = match interpolant_settings.drift.basis_size() {
            0 => solve_without_drift(&points, &point_values, &interpolant_settings, &kernel_params)?,
            _ => solve_with_drift(&points, &point_values, &interpolant_settings, &kernel_params)?,
        };

        progress::emit(
            &progress_callback,
            ProgressMsg::SystemSolved {
                num_points,
                method: solution.method,
            },
        );

        log::info!(
            "solved RBF for {} points in {:?} (kernel {:?}, drift {:?}, method {:?})",
            num_points,
            solver_start.elapsed(),
            interpolant_settings.kernel_type,
            interpolant_settings.drift,
            solution.method
        );

        Ok(Self {
            points,
            point_values,
            coefficients: solution.coefficients,
            interpolant_settings,
            epsilon,
            drift_basis: solution.drift_basis,
            solve_method: solution.method,
            progress_callback,
        })
    }

    /// The solved RBF and drift coefficients.
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn settings(&self) -> &InterpolantSettings {
        &self.interpolant_settings
    }

    /// The kernel shape parameter used for the fit.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Which solver in the fallback chain produced the weights.
    pub fn solve_method(&self) -> SolveMethod {
        self.solve_method
    }

    fn kernel_params(&self) -> KernelParams {
        self.interpolant_settings.kernel_params(self.epsilon)
    }

    /// Evaluates one block of targets.
    fn evaluate_block(&self, target_points: &Mat<f64>, kernel_params: &KernelParams) -> Mat<f64> {
        let a_matrix = isotherm_utils::get_a_matrix(target_points, &self.points, kernel_params);
        let mut values = &a_matrix * &self.coefficients.point_coefficients;

        if let (Some(basis), Some(poly)) = (&self.drift_basis, &self.coefficients.poly_coefficients) {
            let monomials = polynomials::evaluate_monomials(
                target_points,
                self.interpolant_settings.drift,
                &basis.scaling,
            );
            let independent = Mat::<f64>::from_fn(monomials.nrows(), basis.columns.len(), |i, j| {
                monomials[(i, basis.columns[j])]
            });
            values += independent * poly;
        }

        values
    }

    /// Evaluate the interpolant at `target_points`.
    ///
    /// Targets are split into blocks evaluated in parallel; each output row is
    /// written exactly once, so the result does not depend on the thread count.
    ///
    /// ### Returns
    /// A `(n_targets × n_value_channels)` matrix of interpolated values.
    pub fn evaluate(&self, target_points: &Mat<f64>) -> Mat<f64> {
        let num_targets = target_points.nrows();
        let num_channels = self.point_values.ncols();
        let kernel_params = self.kernel_params();

        let blocks: Vec<(usize, Mat<f64>)> = (0..num_targets)
            .step_by(EVAL_CHUNK_SIZE)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|start| {
                let len = EVAL_CHUNK_SIZE.min(num_targets - start);
                let block = target_points.subrows(start, len).to_owned();
                (start, self.evaluate_block(&block, &kernel_params))
            })
            .collect();

        let mut values = Mat::<f64>::zeros(num_targets, num_channels);
        for (start, block) in blocks {
            values.subrows_mut(start, block.nrows()).copy_from(&block);
        }

        values
    }

    /// Evaluates the first value channel at every grid node.
    ///
    /// Non-finite results are reported as missing.
    pub fn evaluate_grid(&self, grid: &Grid) -> FieldSample {
        let values = self.evaluate(&grid.nodes());
        let field = FieldSample::from_raw(values.col(0).iter().copied());

        progress::emit(
            &self.progress_callback,
            ProgressMsg::FieldEvaluated {
                nodes: field.len(),
                missing: field.missing(),
            },
        );

        field
    }

    /// Evaluate the interpolant at the original source points.
    ///
    /// - When `add_smoothing = true`, the diagonal smoothing term is added back so the
    ///   evaluated values reproduce the input samples.
    /// - When `add_smoothing = false`, you observe the smoothed fit.
    pub fn evaluate_at_source(&self, add_smoothing: bool) -> Mat<f64> {
        let mut values = self.evaluate(&self.points);

        if add_smoothing && self.interpolant_settings.smoothing != 0.0 {
            values += &self.coefficients.point_coefficients * self.interpolant_settings.smoothing;
        }

        values
    }
}

/// Solves `(A + λI) w = v` for kernels that need no drift.
fn solve_without_drift(
    points: &Mat<f64>,
    point_values: &Mat<f64>,
    interpolant_settings: &InterpolantSettings,
    kernel_params: &KernelParams,
) -> Result<Solution> {
    let lhs = isotherm_utils::get_a_matrix_symmetric_solver(
        points,
        kernel_params,
        interpolant_settings.smoothing,
    );

    let (weights, method) = SystemSolver::new(lhs).solve(point_values)?;

    Ok(Solution {
        coefficients: Coefficients::new(weights, None),
        drift_basis: None,
        method,
    })
}

/// Solves the drift-augmented system by the null space method.
///
/// If the monomial basis is rank-deficient on the points (for example all points on a
/// line with a linear drift) only a linearly independent subset of monomials is kept.
fn solve_with_drift(
    points: &Mat<f64>,
    point_values: &Mat<f64>,
    interpolant_settings: &InterpolantSettings,
    kernel_params: &KernelParams,
) -> Result<Solution> {
    let num_points = points.nrows();
    let num_rhs = point_values.ncols();

    let scaling = MonomialScaling::from_points(points);
    let monomials = polynomials::evaluate_monomials(points, interpolant_settings.drift, &scaling);

    // QR with column pivoting to identify linearly independent monomials.
    let qrc = monomials.col_piv_qr();
    let rc = qrc.thin_R();
    let (piv_fwd, _) = qrc.P().arrays();

    let thresh = RANK_TOLERANCE * rc.get(0, 0).abs();
    let rank = rc
        .diagonal()
        .column_vector()
        .iter()
        .filter(|val| val.abs() > thresh)
        .count();

    if rank == 0 {
        return Err(IsothermError::singular(num_points, "drift basis has zero rank"));
    }

    let mut columns: Vec<usize> = piv_fwd[..rank].to_vec();
    columns.sort_unstable();

    let full_rank_monomials = Mat::<f64>::from_fn(num_points, rank, |i, j| monomials[(i, columns[j])]);

    // Rank-revealing QR on the transpose selects well separated "special points".
    let qrr = full_rank_monomials.transpose().to_owned().col_piv_qr();
    let (piv_fwd, _) = qrr.P().arrays();

    let mut special_point_indices: Vec<usize> = piv_fwd[..rank].to_vec();
    special_point_indices.sort_unstable();

    let special_set: HashSet<usize> = special_point_indices.iter().copied().collect();
    let non_special_point_indices: Vec<usize> =
        (0..num_points).filter(|i| !special_set.contains(i)).collect();

    let order: Vec<usize> = special_point_indices
        .iter()
        .chain(non_special_point_indices.iter())
        .copied()
        .collect();

    let special_point_monomials =
        isotherm_utils::select_mat_rows(&full_rank_monomials, &special_point_indices);
    let non_special_point_monomials =
        isotherm_utils::select_mat_rows(&full_rank_monomials, &non_special_point_indices);

    let sorted_points = isotherm_utils::select_mat_rows(points, &order);
    let sorted_values = isotherm_utils::select_mat_rows(point_values, &order);

    let a_matrix = isotherm_utils::get_a_matrix_symmetric_solver(
        &sorted_points,
        kernel_params,
        interpolant_settings.smoothing,
    );

    let m = num_points - rank;
    let mut sorted_weights = Mat::<f64>::zeros(num_points, num_rhs);

    let method = if m == 0 {
        // Points are exactly the special points: the drift alone interpolates them.
        log::debug!("reduced RBF system is empty, drift interpolates all {} points", num_points);
        SolveMethod::Cholesky
    } else {
        // Q = [q_top; I] with q_top = -(P_n P_s^{-1})ᵀ, so PᵀQ = 0.
        let lagrange_coefficients = polynomials::get_lagrange_coefficients(&special_point_monomials);
        let q_matrix_top = -polynomials::evaluate_lagrange_polynomials(
            &non_special_point_monomials,
            &lagrange_coefficients,
        )
        .transpose();

        let q = &q_matrix_top;
        let qt = q.transpose();
        let a11 = a_matrix.submatrix(0, 0, rank, rank);
        let a12 = a_matrix.submatrix(0, rank, rank, m);
        let a21 = a_matrix.submatrix(rank, 0, m, rank);
        let a22 = a_matrix.submatrix(rank, rank, m, m);

        let mut lhs = Mat::<f64>::zeros(m, m);

        // QᵀAQ = qᵀ A11 q + qᵀ A12 + A21 q + A22
        let mut a11_q = Mat::<f64>::zeros(rank, m);
        matmul::matmul(a11_q.rb_mut(), Accum::Replace, a11.rb(), q.rb(), 1.0, Par::Seq);
        matmul::matmul(lhs.rb_mut(), Accum::Add, qt.rb(), a11_q.rb(), 1.0, Par::Seq);
        matmul::matmul(lhs.rb_mut(), Accum::Add, qt.rb(), a12.rb(), 1.0, Par::Seq);
        matmul::matmul(lhs.rb_mut(), Accum::Add, a21.rb(), q.rb(), 1.0, Par::Seq);
        lhs += a22;

        // rhs = q_topᵀ v_special + v_non_special
        let rhs = qt * sorted_values.subrows(0, rank) + sorted_values.subrows(rank, m);

        let (gamma, method) = SystemSolver::new(lhs).solve(&rhs)?;

        sorted_weights
            .subrows_mut(0, rank)
            .copy_from(q * &gamma);
        sorted_weights.subrows_mut(rank, m).copy_from(&gamma);

        method
    };

    // The drift interpolates the residual r = v - A w at the special points.
    let residual = sorted_values.subrows(0, rank) - a_matrix.subrows(0, rank) * &sorted_weights;
    let poly_coefficients = special_point_monomials.partial_piv_lu().solve(&residual);

    if !poly_coefficients.is_all_finite() {
        return Err(IsothermError::singular(num_points, "drift coefficients are not finite"));
    }

    let mut point_coefficients = Mat::<f64>::zeros(num_points, num_rhs);
    for (sorted_idx, &original_idx) in order.iter().enumerate() {
        point_coefficients
            .row_mut(original_idx)
            .copy_from(sorted_weights.row(sorted_idx));
    }

    Ok(Solution {
        coefficients: Coefficients::new(point_coefficients, Some(poly_coefficients)),
        drift_basis: Some(DriftBasis { scaling, columns }),
        method,
    })
}
