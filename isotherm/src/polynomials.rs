/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates polynomial and Lagrange bases used for drift terms in RBF interpolation.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{common, interpolant_config::Drift};
use faer::Mat;
use faer::{linalg::solvers::Solve, unzip, zip};

/// Per-axis translation and scale mapping source points into `[-1, 1]^2`.
///
/// Stored with a fitted interpolant so evaluation points are scaled the same way.
#[derive(Debug, Clone)]
pub struct MonomialScaling {
    pub translation_factor: Vec<f64>,
    pub scale_factor: Vec<f64>,
}

impl MonomialScaling {
    pub fn from_points(points: &Mat<f64>) -> Self {
        let (translation_factor, scale_factor) = common::get_cheb_cube_scaling_factors(points);
        Self {
            translation_factor,
            scale_factor,
        }
    }
}

/// Evaluates the monomial basis `[1, x, y, x², xy, y²]` truncated to `drift`.
///
/// Returns an `(n x basis_size)` matrix.
pub fn evaluate_monomials(points: &Mat<f64>, drift: Drift, scaling: &MonomialScaling) -> Mat<f64> {
    let mut scaled_points = points.clone();
    common::scale_points(
        &mut scaled_points,
        &scaling.translation_factor,
        &scaling.scale_factor,
    );

    let (n, d) = scaled_points.shape();
    let degree = drift.degree();
    let mut monomials = Mat::<f64>::zeros(n, drift.basis_size());

    if degree < 0 {
        return monomials;
    }

    // constant column
    monomials.col_mut(0).fill(1.0);

    // linear columns
    if degree >= 1 {
        monomials
            .subcols_mut(1, d)
            .copy_from(&scaled_points.as_ref());
    }

    // quadratic columns
    if degree == 2 {
        let start = 1 + d;
        let mut k = 0usize;

        for i in 0..d {
            let xi = scaled_points.col(i);
            for j in i..d {
                let xj = scaled_points.col(j);
                let mut dst = monomials.col_mut(start + k);

                zip!(&mut dst, &xi, &xj).for_each(|unzip!(dst, xi, xj)| {
                    *dst = xi * xj;
                });

                k += 1;
            }
        }
    }

    monomials
}

/// Coefficients of the Lagrange basis on a unisolvent set of points.
///
/// `monomials` is the square monomial matrix of those points; the result is its inverse.
pub fn get_lagrange_coefficients(monomials: &Mat<f64>) -> Mat<f64> {
    let (nrows, ncols) = monomials.shape();
    let rhs = Mat::<f64>::identity(nrows, ncols);
    let lu = monomials.full_piv_lu();
    lu.solve(rhs)
}

pub fn evaluate_lagrange_polynomials(
    monomials: &Mat<f64>,
    lagrange_coefficients: &Mat<f64>,
) -> Mat<f64> {
    monomials * lagrange_coefficients
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*, Mat};

    fn unit_scaling() -> MonomialScaling {
        MonomialScaling {
            translation_factor: vec![0.0; 2],
            scale_factor: vec![1.0; 2],
        }
    }

    fn run_case(points: Mat<f64>, drift: Drift, expected: Mat<f64>) {
        let monomials = evaluate_monomials(&points, drift, &unit_scaling());
        assert!(monomials.ncols() == expected.ncols());

        let approx_eq = CwiseMat(ApproxEq::eps() * 128.0 * 2.0);
        assert!(&monomials ~ &expected);
    }

    #[test]
    fn monomials_none() {
        let points = mat![[1.0, 2.0], [3.0, 4.0]];
        let monomials = evaluate_monomials(&points, Drift::None, &unit_scaling());
        assert!(monomials.shape() == (2, 0));
    }

    #[test]
    fn monomials_constant() {
        let points = mat![[1.0, 2.0], [1.0, 2.0]];
        // Basis: [1]
        let expected = mat![[1.0], [1.0]];
        run_case(points, Drift::Constant, expected);
    }

    #[test]
    fn monomials_linear() {
        let points = mat![[1.0, 2.0], [3.0, 4.0]];
        // Basis: [1, x, y]
        let expected = mat![[1.0, 1.0, 2.0], [1.0, 3.0, 4.0]];
        run_case(points, Drift::Linear, expected);
    }

    #[test]
    fn monomials_quadratic() {
        let points = mat![[1.0, 2.0], [3.0, 4.0]];
        // Basis: [1, x, y, x^2, x*y, y^2]
        let expected = mat![
            [1.0, 1.0, 2.0,  1.0,  2.0,  4.0],
            [1.0, 3.0, 4.0,  9.0, 12.0, 16.0],
        ];
        run_case(points, Drift::Quadratic, expected);
    }

    #[test]
    fn scaled_monomials_lie_in_unit_square() {
        let points = mat![[100.0, -50.0], [300.0, 150.0], [200.0, 50.0]];
        let scaling = MonomialScaling::from_points(&points);
        let monomials = evaluate_monomials(&points, Drift::Linear, &scaling);

        let expected = mat![[1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [1.0, 0.0, 0.0]];
        let approx_eq = CwiseMat(ApproxEq::eps() * 128.0);
        assert!(&monomials ~ &expected);
    }

    #[test]
    fn lagrange_basis_is_cardinal_on_its_points() {
        let points = mat![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let monomials = evaluate_monomials(&points, Drift::Linear, &unit_scaling());
        let coefficients = get_lagrange_coefficients(&monomials);
        let basis = evaluate_lagrange_polynomials(&monomials, &coefficients);

        let approx_eq = CwiseMat(ApproxEq::eps() * 128.0 * 3.0);
        assert!(&basis ~ &Mat::<f64>::identity(3, 3));
    }
}
