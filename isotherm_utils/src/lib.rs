/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports kernel utilities and helper functions used across the isotherm crates.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`isotherm`] crate
//!
//! Radial basis kernels, distance helpers and dense kernel matrix assembly.
mod rbf_kernels;
mod traits;
mod utils;
mod kernel_helpers;

/// Implemented kernels for use in the [`isotherm`] crate.
pub mod kernels {
    pub use super::rbf_kernels::*;
}

pub use {
    kernel_helpers::{KernelParams, KernelParamsBuilder},
    utils::{
        KernelType, get_a_matrix, get_a_matrix_symmetric_solver, get_a_matrix_typed,
        get_distance, get_pointarray_extents, select_mat_rows, kernel_phi,
    },
    traits::{KernelFromParams, KernelFunction},
};
