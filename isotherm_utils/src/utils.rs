/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies general-purpose utilities for matrices, distances, and dense kernel matrices.
//
// Created on: 12 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, KernelFunction};
use faer::{Mat, RowRef};
use serde::{Deserialize, Serialize};

/// Returns an owned `Mat<T>` from a subset of row indices.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use isotherm_utils::select_mat_rows;
///
/// let matrix = mat![
///     [0.0, 1.0],
///     [1.0, 1.0],
///     [2.0, 2.0],
///     [3.0, 3.0f64],
/// ];
///
/// let sub_matrix = select_mat_rows(&matrix, &[0usize, 2]);
///
/// assert_eq!(
///     sub_matrix,
///     mat![
///         [0.0, 1.0],
///         [2.0, 2.0f64],
///     ]
/// );
/// ```
#[inline(always)]
pub fn select_mat_rows<T>(existing_mat: &Mat<T>, row_indices: &[usize]) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        existing_mat.get(row_indices[i], j).clone()
    })
}

/// Computes the axis aligned bounding box (AABB) extents of a matrix of points.
///
/// Returns a flat vector containing the minimum and maximum values along each column (dimension)
/// of the input matrix. The result is arranged as:
///
/// `[min_0, min_1, ..., min_n, max_0, max_1, ..., max_n]`
///
/// where `n` is the number of columns in the matrix. An empty matrix yields an
/// empty vector.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use isotherm_utils::get_pointarray_extents;
///
/// let points = mat![
///     [1.0, 2.0],
///     [3.0, -1.0],
///     [0.5, 4.0f64]
/// ];
/// let extents = get_pointarray_extents(&points);
/// assert_eq!(extents, vec![0.5, -1.0, 3.0, 4.0]);
/// ```
#[inline(always)]
pub fn get_pointarray_extents<T>(points: &Mat<T>) -> Vec<T>
where
    T: PartialOrd + Clone,
{
    let (nrows, ncols) = points.shape();
    if nrows == 0 {
        return Vec::new();
    }

    // The first half of the vector stores mins, the second half stores maxs.
    let mut extents: Vec<T> = Vec::with_capacity(2 * ncols);
    extents.extend((0..ncols).map(|col| points.get(0, col).clone()));
    extents.extend((0..ncols).map(|col| points.get(0, col).clone()));

    for row in points.row_iter() {
        for (col, item) in row.iter().enumerate() {
            if item < &extents[col] {
                extents[col] = item.clone();
            }
            if item > &extents[col + ncols] {
                extents[col + ncols] = item.clone();
            }
        }
    }

    extents
}

/// Calculates the euclidean distance between two points.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use isotherm_utils::get_distance;
///
/// let points = mat![
///     [1.0, 2.0],
///     [4.0, 6.0],
/// ];
///
/// assert_eq!(get_distance(points.row(0), points.row(1)), 5.0);
/// ```
#[inline(always)]
pub fn get_distance(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist.sqrt()
}

/// Builds a dense kernel matrix using a typed kernel function.
#[inline(always)]
pub fn get_a_matrix_typed<K>(
    target_points: &Mat<f64>,
    source_points: &Mat<f64>,
    kernel_function: &K,
) -> Mat<f64>
where
    K: KernelFunction,
{
    let m = target_points.nrows();
    let n = source_points.nrows();

    let mut a_matrix = Mat::<f64>::zeros(m, n);

    for j in 0..n {
        let source = source_points.row(j);

        for i in 0..m {
            let target = target_points.row(i);

            a_matrix[(i, j)] = kernel_function.evaluate(target, source);
        }
    }

    a_matrix
}

/// Builds a symmetric kernel matrix using a typed kernel function, adding the
/// smoothing term on the diagonal.
#[inline(always)]
pub fn get_a_matrix_symmetric_solver_typed<K>(
    points: &Mat<f64>,
    kernel_function: &K,
    smoothing: f64,
) -> Mat<f64>
where
    K: KernelFunction,
{
    let n = points.nrows();

    let mut a_matrix = Mat::<f64>::zeros(n, n);

    for j in 0..n {
        let source_row = points.row(j);

        for i in j..n {
            let target_row = points.row(i);
            let mut k_val = kernel_function.evaluate(target_row, source_row);

            if i == j {
                k_val += smoothing;
            }

            // Write both symmetric entries
            a_matrix[(i, j)] = k_val;
            a_matrix[(j, i)] = k_val;
        }
    }

    a_matrix
}

// K-free dispatcher generated from the kernel registry below.
// Assumes each kernel type implements `KernelFromParams::from_params(&KernelParams) -> K`
// and exposes an inherent `phi(r)`.
macro_rules! for_each_kernel {
    ( registry = [ $( ($V:ident, $Kty:path) ),* $(,)? ] ) => {

        /// Runtime kernel selector built from the kernel registry
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum KernelType {
            $( $V, )*
        }

        /// Builds a dense kernel matrix for the selected [`KernelType`].
        #[inline(always)]
        pub fn get_a_matrix(
            target_points: &Mat<f64>,
            source_points: &Mat<f64>,
            params: &crate::KernelParams,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        crate::utils::get_a_matrix_typed(target_points, source_points, &k)
                    }
                ),*
            }
        }

        /// Builds a symmetric kernel matrix with a smoothing term on the diagonal.
        #[inline(always)]
        pub fn get_a_matrix_symmetric_solver(
            points: &Mat<f64>,
            params: &crate::KernelParams,
            smoothing: f64,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        crate::utils::get_a_matrix_symmetric_solver_typed(points, &k, smoothing)
                    }
                ),*
            }
        }

        /// Evaluates the selected kernel function at distance `r`.
        #[inline(always)]
        pub fn kernel_phi(
            r: f64,
            params: &crate::KernelParams,
        ) -> f64 {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        k.phi(r)
                    }
                ), *
            }
        }
    };
}

for_each_kernel! {
    registry = [
        (LinearRbf,          crate::kernels::LinearRbfKernel),
        (ThinPlateSplineRbf, crate::kernels::ThinPlateSplineRbfKernel),
        (MultiquadricRbf,    crate::kernels::MultiquadricRbfKernel),
        (GaussianRbf,        crate::kernels::GaussianRbfKernel),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KernelParams;
    use equator::assert;
    use faer::mat;

    #[test]
    fn symmetric_matrix_adds_smoothing_on_diagonal() {
        let points = mat![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0f64]];
        let params = KernelParams::builder(KernelType::LinearRbf).build();

        let a = get_a_matrix_symmetric_solver(&points, &params, 0.5);
        let plain = get_a_matrix(&points, &points, &params);

        for i in 0..3 {
            for j in 0..3 {
                let expected = plain[(i, j)] + if i == j { 0.5 } else { 0.0 };
                assert!(a[(i, j)] == expected);
                assert!(a[(i, j)] == a[(j, i)]);
            }
        }
        assert!(a[(1, 2)] == -(5.0f64).sqrt());
    }

    #[test]
    fn kernel_phi_dispatches_on_type() {
        let params = KernelParams::builder(KernelType::GaussianRbf)
            .epsilon(2.0)
            .build();
        assert!((kernel_phi(2.0, &params) - (-1.0f64).exp()).abs() < 1e-14);

        let params = KernelParams::builder(KernelType::LinearRbf).build();
        assert!(kernel_phi(3.0, &params) == -3.0);
    }

    #[test]
    fn extents_of_empty_matrix_are_empty() {
        let points = Mat::<f64>::zeros(0, 2);
        assert!(get_pointarray_extents(&points).is_empty());
    }
}
