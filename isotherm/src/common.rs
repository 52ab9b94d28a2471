/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for extent snapping, monomial scaling, and kernel shape defaults.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::Mat;

/// Round a value down to the nearest multiple of resolution
pub(crate) fn round_down(value: f64, resolution: f64) -> f64 {
    (value / resolution).floor() * resolution
}

/// Round a value up to the nearest multiple of resolution
pub(crate) fn round_up(value: f64, resolution: f64) -> f64 {
    (value / resolution).ceil() * resolution
}

/// Compute translation and scale factors to map points into the `[-1, 1]` cube.
///
/// The translation is the midpoint of each coordinate range and the scale
/// is half the range, with zeros replaced by `1.0` to avoid division by zero.
pub(crate) fn get_cheb_cube_scaling_factors(point_locations: &Mat<f64>) -> (Vec<f64>, Vec<f64>) {
    let dimensions = point_locations.ncols();
    let extents = isotherm_utils::get_pointarray_extents(point_locations);

    if extents.is_empty() {
        return (vec![0.0; dimensions], vec![1.0; dimensions]);
    }

    let translation_factor = (0..dimensions)
        .map(|d| (extents[d + dimensions] + extents[d]) / 2.0)
        .collect();

    let scale_factor = (0..dimensions)
        .map(|d| (extents[d + dimensions] - extents[d]) / 2.0)
        .map(|s| if s == 0.0 { 1.0 } else { s })
        .collect();

    (translation_factor, scale_factor)
}

/// Apply translation and scaling to map points into a normalized cube.
///
/// For each coordinate `x`, applies `(x - translation_factor[d]) / scale_factor[d]`.
pub(crate) fn scale_points(points: &mut Mat<f64>, translation_factor: &[f64], scale_factor: &[f64]) {
    points.row_iter_mut().for_each(|row| {
        row.iter_mut().enumerate().for_each(|(col_idx, element)| {
            *element = (*element - translation_factor[col_idx]) / scale_factor[col_idx];
        });
    });
}

/// Average spacing between points, used as the default kernel shape parameter.
///
/// Computed as `(prod(edges) / n)^(1 / len(edges))` over the non-zero edge
/// lengths of the bounding box. Falls back to `1.0` when every edge is zero.
pub(crate) fn mean_point_spacing(points: &Mat<f64>) -> f64 {
    let n = points.nrows();
    let dims = points.ncols();
    let extents = isotherm_utils::get_pointarray_extents(points);

    if n == 0 || extents.is_empty() {
        return 1.0;
    }

    let edges: Vec<f64> = (0..dims)
        .map(|d| extents[d + dims] - extents[d])
        .filter(|e| *e > 0.0)
        .collect();

    if edges.is_empty() {
        return 1.0;
    }

    let volume: f64 = edges.iter().product();
    (volume / n as f64).powf(1.0 / edges.len() as f64)
}

/// Generate a matrix of random points in the unit square from a fixed seed.
#[cfg(test)]
pub(crate) fn generate_random_points(n: usize, d: usize, seed: u64) -> Mat<f64> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    Mat::from_fn(n, d, |_, _| rng.random_range(0.0..1.0))
}
