/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete RBF kernel functions and their faer-compatible evaluations.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, KernelFunction, KernelParams};
use faer::RowRef;

/// Linear RBF kernel with `phi(r) = -r`.
///
/// The sign is flipped so that the system projected onto the constant
/// polynomial null space is positive definite.
#[derive(Clone, Debug, Copy)]
pub struct LinearRbfKernel;

impl LinearRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        -r
    }
}

impl KernelFunction for LinearRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for LinearRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        LinearRbfKernel
    }
}

/// Thin plate spline RBF kernel with `phi(r) = r^2 log r`.
#[derive(Clone, Debug, Copy)]
pub struct ThinPlateSplineRbfKernel;

impl ThinPlateSplineRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        match r.abs() < f64::EPSILON {
            true => 0.0,
            false => r.powi(2) * r.ln(),
        }
    }
}

impl KernelFunction for ThinPlateSplineRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for ThinPlateSplineRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        ThinPlateSplineRbfKernel
    }
}

/// Multiquadric RBF kernel with `phi(r) = -sqrt((r / epsilon)^2 + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct MultiquadricRbfKernel {
    pub epsilon: f64,
    inv_eps2: f64,
}

impl MultiquadricRbfKernel {
    #[inline(always)]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_eps2: 1.0 / (epsilon * epsilon),
        }
    }

    #[inline(always)]
    pub fn eval_r2(&self, r2: f64) -> f64 {
        -(r2 * self.inv_eps2 + 1.0).sqrt()
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        self.eval_r2(r * r)
    }
}

impl KernelFunction for MultiquadricRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        self.eval_r2(get_distance_sq(target, source))
    }
}

impl KernelFromParams for MultiquadricRbfKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Gaussian RBF kernel with `phi(r) = exp(-(r / epsilon)^2)`.
///
/// Strictly positive definite, so no polynomial drift is required.
#[derive(Clone, Debug, Copy)]
pub struct GaussianRbfKernel {
    pub epsilon: f64,
    inv_eps2: f64,
}

impl GaussianRbfKernel {
    #[inline(always)]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_eps2: 1.0 / (epsilon * epsilon),
        }
    }

    #[inline(always)]
    pub fn eval_r2(&self, r2: f64) -> f64 {
        (-r2 * self.inv_eps2).exp()
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        self.eval_r2(r * r)
    }
}

impl KernelFunction for GaussianRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        self.eval_r2(get_distance_sq(target, source))
    }
}

impl KernelFromParams for GaussianRbfKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Returns the squared Euclidean distance between two points.
#[inline(always)]
pub fn get_distance_sq(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::mat;

    #[test]
    fn thin_plate_is_zero_at_origin() {
        let k = ThinPlateSplineRbfKernel;
        assert!(k.phi(0.0) == 0.0);
        assert!((k.phi(2.0) - 4.0 * 2f64.ln()).abs() < 1e-14);
    }

    #[test]
    fn shape_parameter_scales_distance() {
        let g = GaussianRbfKernel::new(2.0);
        assert!((g.phi(2.0) - (-1.0f64).exp()).abs() < 1e-14);
        assert!(g.phi(0.0) == 1.0);

        let mq = MultiquadricRbfKernel::new(3.0);
        assert!((mq.phi(4.0) + (16.0f64 / 9.0 + 1.0).sqrt()).abs() < 1e-14);
    }

    #[test]
    fn evaluate_matches_phi() {
        let points = mat![[0.0, 0.0], [3.0, 4.0f64]];
        let k = LinearRbfKernel;
        assert!(k.evaluate(points.row(0), points.row(1)) == -5.0);

        let g = GaussianRbfKernel::new(5.0);
        let expected = (-1.0f64).exp();
        assert!((g.evaluate(points.row(0), points.row(1)) - expected).abs() < 1e-14);
    }
}
