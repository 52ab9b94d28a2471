/////////////////////////////////////////////////////////////////////////////////////////////
//
// Regular target grids snapped to the horizontal resolution, and the fields sampled on them.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Regular grids covering the projected observations.
use crate::{
    common,
    error::{IsothermError, Result},
    observations::CleanedPoint,
};
use faer::Mat;
use serde::{Deserialize, Serialize};

/// Axis aligned bounding box in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Bounding box of a set of points, `None` when the set is empty.
    pub fn from_points(points: &[CleanedPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);

        Some(points.iter().fold(init, |e, p| {
            Self::new(e.xmin.min(p.x), e.ymin.min(p.y), e.xmax.max(p.x), e.ymax.max(p.y))
        }))
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Whether every point lies inside this extent.
    pub fn contains_all(&self, points: &[CleanedPoint]) -> bool {
        points.iter().all(|p| self.contains(p.x, p.y))
    }
}

/// Upper bound on `nx * ny` for a grid built by [`Grid::covering`].
pub const MAX_GRID_NODES: usize = 1 << 28;

/// Number of nodes along an axis spanning `steps` multiples of the spacing.
fn node_count(steps: f64, hres: f64) -> Result<usize> {
    let steps = steps.round();
    if !steps.is_finite() || steps < 0.0 || steps >= MAX_GRID_NODES as f64 {
        return Err(IsothermError::invalid(
            "hres",
            format!("spacing {} gives {} steps along one axis", hres, steps),
        ));
    }
    Ok(steps as usize + 1)
}

/// A regular grid of `nx * ny` nodes with `x` varying fastest.
///
/// Node `k = j * nx + i` sits at `origin + (i, j) * spacing`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub origin: (f64, f64),
    pub spacing: f64,
    pub nx: usize,
    pub ny: usize,
}

impl Grid {
    /// Builds the grid covering `extent` expanded by `buffer`.
    ///
    /// Each side is snapped outward to the next multiple of `hres`, so grids
    /// built for different data sets at the same resolution share node positions.
    ///
    /// ### Errors
    /// - `InvalidParameter` if `hres` is not finite and positive, if `buffer` is
    ///   negative or not finite, or if the grid would exceed [`MAX_GRID_NODES`].
    /// - `DegenerateExtent` if the extent has zero width or zero height.
    pub fn covering(extent: &Extent, hres: f64, buffer: f64) -> Result<Self> {
        if !hres.is_finite() || hres <= 0.0 {
            return Err(IsothermError::invalid(
                "hres",
                format!("must be finite and > 0, got {}", hres),
            ));
        }

        if !buffer.is_finite() || buffer < 0.0 {
            return Err(IsothermError::invalid(
                "grid_buffer",
                format!("must be finite and >= 0, got {}", buffer),
            ));
        }

        if !extent.is_finite() || !(extent.width() > 0.0) || !(extent.height() > 0.0) {
            return Err(IsothermError::DegenerateExtent {
                xmin: extent.xmin,
                ymin: extent.ymin,
                xmax: extent.xmax,
                ymax: extent.ymax,
            });
        }

        let xmin = common::round_down(extent.xmin - buffer, hres);
        let ymin = common::round_down(extent.ymin - buffer, hres);
        let xmax = common::round_up(extent.xmax + buffer, hres);
        let ymax = common::round_up(extent.ymax + buffer, hres);

        let nx = node_count((xmax - xmin) / hres, hres)?;
        let ny = node_count((ymax - ymin) / hres, hres)?;
        match nx.checked_mul(ny) {
            Some(n) if n <= MAX_GRID_NODES => {}
            _ => {
                return Err(IsothermError::invalid(
                    "hres",
                    format!(
                        "{} x {} nodes exceeds the limit of {} at spacing {}",
                        nx, ny, MAX_GRID_NODES, hres
                    ),
                ))
            }
        }

        Ok(Self {
            origin: (xmin, ymin),
            spacing: hres,
            nx,
            ny,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    /// Linear node index of column `i`, row `j`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    #[inline]
    pub fn node_ij(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.origin.0 + i as f64 * self.spacing,
            self.origin.1 + j as f64 * self.spacing,
        )
    }

    #[inline]
    pub fn node(&self, k: usize) -> (f64, f64) {
        self.node_ij(k % self.nx, k / self.nx)
    }

    /// All node coordinates as an `(nx * ny) x 2` matrix in grid order.
    pub fn nodes(&self) -> Mat<f64> {
        Mat::from_fn(self.num_nodes(), 2, |k, d| {
            let (x, y) = self.node(k);
            if d == 0 { x } else { y }
        })
    }

    /// Extent spanned by the outermost nodes.
    pub fn extent(&self) -> Extent {
        let (xmax, ymax) = self.node_ij(self.nx.saturating_sub(1), self.ny.saturating_sub(1));
        Extent::new(self.origin.0, self.origin.1, xmax, ymax)
    }

    /// Whether `(x, y)` lies within the grid, allowing for rounding in the node positions.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let tol = 1E-9 * self.spacing;
        let e = self.extent();
        x >= e.xmin - tol && x <= e.xmax + tol && y >= e.ymin - tol && y <= e.ymax + tol
    }
}

/// Field values sampled at each grid node, in grid order.
///
/// `None` marks a node where evaluation was not finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    values: Vec<Option<f64>>,
}

impl FieldSample {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    /// Wraps raw evaluations, marking non-finite values as missing.
    pub fn from_raw(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .collect(),
        )
    }

    #[inline]
    pub fn get(&self, k: usize) -> Option<f64> {
        self.values.get(k).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}
