/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for station isotherm mapping.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Isotherm maps from scattered station observations.
//!
//! Turns sparse temperature readings at weather stations into a continuous field on
//! a regular grid, classifies it into discrete bands and traces the isolines between
//! them. The stages are:
//!
//! - **Cleaning** - records with missing values are dropped and stations reported
//!   twice at the same position are collapsed by an explicit [`DuplicatePolicy`].
//! - **Projection** - longitude/latitude are mapped to planar metres, by default
//!   with the ellipsoidal [`Mercator`](projection::Mercator) projection.
//! - **Gridding** - a [`Grid`] snapped to the horizontal resolution covers every station.
//! - **Interpolation** - a dense Radial Basis Function (RBF) interpolant with optional
//!   polynomial drift and smoothing is fitted and evaluated at every node.
//! - **Classification** - each node is assigned a band from the threshold [`Levels`],
//!   and isolines are traced with marching squares.
//!
//! The RBF system is solved directly, which requires **O(N²)** memory and **O(N³)**
//! operations. That is comfortable for national station networks of a few thousand
//! points; evaluation is **O(N·M)** over `M` grid nodes and runs in parallel.
//!
//! Check out the examples directory in the repository for a complete station map run.
//!
//! # Examples
//!
//! ```
//! use isotherm::{
//!     MapConfig, Observation, Pipeline,
//!     interpolant_config::RBFKernelType,
//!     projection::ProjectionKind,
//! };
//!
//! // Four stations already in planar coordinates.
//! let stations = vec![
//!     Observation::new(0.0, 0.0, 10.0),
//!     Observation::new(1.0, 0.0, 20.0),
//!     Observation::new(0.0, 1.0, 10.0),
//!     Observation::new(1.0, 1.0, 20.0),
//! ];
//!
//! let config = MapConfig::builder()
//!     .hres(0.5)
//!     .rbf_kernel(RBFKernelType::Linear)
//!     .smoothing(0.0)
//!     .projection(ProjectionKind::Identity)
//!     .build()?;
//!
//! let map = Pipeline::new(config)?.run(&stations)?;
//!
//! // The centre node lies halfway between the two columns of stations.
//! let centre = map.field.get(map.grid.index(1, 1)).unwrap();
//! assert!((centre - 15.0).abs() < 1E-9);
//! # Ok::<(), isotherm::IsothermError>(())
//! ```
//!
//! # References
//! 1.  R. K. Beatson, W. A. Light, and S. Billings. Fast solution of the radial basis
//!     function interpolation equations: domain decomposition methods. SIAM J. Sci.
//!     Comput., 22(5):1717–1740 (electronic), 2000.
//! 2.  Fasshauer, G., 2007. Meshfree Approximation Methods with Matlab. World Scientific Publishing Co.
//! 3.  J. B. Cherrie. Fast Evaluation of Radial Basis Functions: Theory and Application.
//!     PhD thesis, University of Canterbury, 2000.
pub mod interpolant_config;

mod common;

mod error;

pub mod observations;

pub mod projection;

pub mod grid;

mod polynomials;

pub mod linalg;

mod rbf;

pub mod classify;

pub mod contour;

pub mod palette;

pub mod progress;

pub mod config;

mod pipeline;

pub use {
    classify::{classify_field, Levels},
    config::{MapConfig, MapConfigBuilder},
    contour::{trace_all_isolines, trace_isolines, Isoline},
    error::{IsothermError, PipelineStage, Result},
    grid::{Extent, FieldSample, Grid},
    observations::{
        clean_observations, read_observations_csv, CleanedPoint, CleaningOutcome, CsvLayout,
        DuplicatePolicy, Observation,
    },
    palette::{Palette, Rgb},
    pipeline::{ClassifiedMap, Pipeline},
    projection::{project_points, Projection},
    rbf::{Coefficients, RbfInterpolator, RbfInterpolatorBuilder},
};
