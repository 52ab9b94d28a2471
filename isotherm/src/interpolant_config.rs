/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies kernel, drift, smoothing and shape options for configuring RBF interpolants.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies kernel, drift, smoothing and shape options for configuring RBF interpolants.
use crate::error::{IsothermError, Result};
use isotherm_utils::{KernelParams, KernelType};
use serde::{Deserialize, Serialize};

/// Polynomial drift added to the RBF system.
///
/// Monomials are evaluated on the source points scaled into `[-1, 1]^2`, so the
/// drift is independent of the units of the projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drift {
    None,
    Constant,
    Linear,
    Quadratic,
}

impl Drift {
    /// Degree of the drift polynomial, `-1` for no drift.
    pub fn degree(&self) -> i32 {
        match self {
            Drift::None => -1,
            Drift::Constant => 0,
            Drift::Linear => 1,
            Drift::Quadratic => 2,
        }
    }

    /// Number of monomial columns for a two-dimensional drift of this degree.
    pub fn basis_size(&self) -> usize {
        match self.degree() {
            d if d < 0 => 0,
            d => {
                let k = (d + 1) as usize;
                k * (k + 1) / 2
            }
        }
    }
}

/// Radial basis function kernels available for interpolation.
///
/// | Kernel        | φ(r)                 | Minimum drift |
/// |---------------|----------------------|---------------|
/// | `linear`      | `-r`                 | constant      |
/// | `thin_plate`  | `r² ln r`            | linear        |
/// | `multiquadric`| `-sqrt((r/ε)² + 1)`  | constant      |
/// | `gaussian`    | `exp(-(r/ε)²)`       | none          |
#[derive(Clone, Debug, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RBFKernelType {
    Linear,
    Gaussian,
    Multiquadric,
    ThinPlate,
}

impl RBFKernelType {
    /// Whether the kernel depends on the shape parameter ε.
    pub fn uses_epsilon(&self) -> bool {
        matches!(self, RBFKernelType::Gaussian | RBFKernelType::Multiquadric)
    }
}

/// Returns the minimum required [`Drift`] for the provided [`RBFKernelType`]
pub fn get_min_drift(kernel: RBFKernelType) -> Drift {
    match kernel {
        RBFKernelType::Linear => Drift::Constant,
        RBFKernelType::ThinPlate => Drift::Linear,
        RBFKernelType::Multiquadric => Drift::Constant,
        RBFKernelType::Gaussian => Drift::None,
    }
}

/// A convenience builder for constructing a [`InterpolantSettings`] instance
/// with parameters tailored to the selected kernel type.
///
/// The builder should be called via the [`InterpolantSettings::builder`] method.
///
/// See [`InterpolantSettings`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct InterpolantSettingsBuilder {
    pub kernel_type: RBFKernelType,
    pub drift: Drift,
    pub smoothing: f64,
    pub epsilon: Option<f64>,
}

impl InterpolantSettingsBuilder {
    fn new(kernel_type: RBFKernelType) -> Self {
        Self {
            kernel_type,
            drift: get_min_drift(kernel_type),
            smoothing: 0.0,
            epsilon: None,
        }
    }

    /// Sets the drift term.
    pub fn drift(mut self, drift: Drift) -> Self {
        self.drift = drift;
        self
    }

    /// Sets the smoothing value added to the diagonal of the kernel matrix.
    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Sets the shape parameter. Only used by gaussian and multiquadric kernels.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Builds and returns an instance of [`InterpolantSettings`] from the values
    /// defined in the builder.
    pub fn build(self) -> InterpolantSettings {
        InterpolantSettings {
            kernel_type: self.kernel_type,
            drift: self.drift,
            smoothing: self.smoothing,
            epsilon: self.epsilon,
        }
    }
}

/// Kernel, drift and regularisation used to fit an [`RbfInterpolator`](crate::RbfInterpolator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolantSettings {
    /// The RBF kernel to use for interpolation.
    pub kernel_type: RBFKernelType,

    /// The polynomial drift term added to the RBF system.
    pub drift: Drift,

    /// Added to the diagonal of the kernel matrix. `0.0` enforces an exact fit
    /// to all input data; larger values soften the fit.
    pub smoothing: f64,

    /// Shape parameter for gaussian and multiquadric kernels. When `None` the
    /// mean point spacing of the source points is used.
    pub epsilon: Option<f64>,
}

impl InterpolantSettings {
    /// Returns a new [`InterpolantSettingsBuilder`] for the given kernel type.
    pub fn builder(kernel_type: RBFKernelType) -> InterpolantSettingsBuilder {
        InterpolantSettingsBuilder::new(kernel_type)
    }

    /// Checks the numeric parameters and the drift against the kernel minimum.
    pub fn validate(&self) -> Result<()> {
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(IsothermError::invalid(
                "smoothing",
                format!("must be finite and >= 0, got {}", self.smoothing),
            ));
        }

        if let Some(epsilon) = self.epsilon {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(IsothermError::invalid(
                    "epsilon",
                    format!("must be finite and > 0, got {}", epsilon),
                ));
            }
        }

        let min_drift = get_min_drift(self.kernel_type);
        if self.drift < min_drift {
            return Err(IsothermError::invalid(
                "drift",
                format!(
                    "{:?} kernel requires at least {:?} drift, got {:?}",
                    self.kernel_type, min_drift, self.drift
                ),
            ));
        }

        Ok(())
    }

    /// Kernel parameters for the low level matrix assembly, using `epsilon`
    /// as the resolved shape parameter.
    pub fn kernel_params(&self, epsilon: f64) -> KernelParams {
        let kernel_type = match self.kernel_type {
            RBFKernelType::Linear => KernelType::LinearRbf,
            RBFKernelType::ThinPlate => KernelType::ThinPlateSplineRbf,
            RBFKernelType::Multiquadric => KernelType::MultiquadricRbf,
            RBFKernelType::Gaussian => KernelType::GaussianRbf,
        };
        KernelParams::builder(kernel_type).epsilon(epsilon).build()
    }
}
