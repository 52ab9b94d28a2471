/////////////////////////////////////////////////////////////////////////////////////////////
//
// Assigns interpolated values to the discrete bands delimited by the threshold levels.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    error::{IsothermError, Result},
    grid::FieldSample,
};
use serde::{Deserialize, Serialize};

/// Strictly increasing threshold levels partitioning the value axis into bands.
///
/// `K` levels define `K - 1` half-open bands `[levels[i], levels[i + 1])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Levels(Vec<f64>);

impl Levels {
    /// ### Errors
    /// `InvalidParameter` unless there are at least two finite, strictly increasing levels.
    pub fn new(levels: Vec<f64>) -> Result<Self> {
        if levels.len() < 2 {
            return Err(IsothermError::invalid(
                "levels",
                format!("at least 2 levels are required, got {}", levels.len()),
            ));
        }

        if let Some(bad) = levels.iter().find(|l| !l.is_finite()) {
            return Err(IsothermError::invalid(
                "levels",
                format!("levels must be finite, got {}", bad),
            ));
        }

        if let Some(pair) = levels.windows(2).find(|w| w[1] <= w[0]) {
            return Err(IsothermError::invalid(
                "levels",
                format!("levels must be strictly increasing, got {} then {}", pair[0], pair[1]),
            ));
        }

        Ok(Self(levels))
    }

    /// Levels `start, start + step, ...` below `stop`.
    pub fn range(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(IsothermError::invalid(
                "levels",
                format!("range step must be finite and > 0, got {}", step),
            ));
        }

        let count = ((stop - start) / step).ceil();
        if !count.is_finite() || count < 0.0 {
            return Err(IsothermError::invalid(
                "levels",
                format!("invalid range [{}, {})", start, stop),
            ));
        }

        Self::new((0..count as usize).map(|i| start + i as f64 * step).collect())
    }

    /// Whole degree levels from -50 up to 49, the operational temperature scale.
    pub fn default_temperature() -> Self {
        Self((-50..50).map(f64::from).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn n_bands(&self) -> usize {
        self.0.len() - 1
    }

    /// Band index of `value`, clipped to the first and last bands.
    pub fn classify(&self, value: f64) -> usize {
        let last_band = self.n_bands() - 1;
        if value < self.0[0] {
            return 0;
        }
        // Number of levels <= value, minus one, is the band whose lower bound it reached.
        let reached = self.0.partition_point(|&level| level <= value);
        reached.saturating_sub(1).min(last_band)
    }
}

impl TryFrom<Vec<f64>> for Levels {
    type Error = IsothermError;

    fn try_from(levels: Vec<f64>) -> Result<Self> {
        Levels::new(levels)
    }
}

impl From<Levels> for Vec<f64> {
    fn from(levels: Levels) -> Self {
        levels.0
    }
}

/// Band index per grid node; missing field values stay missing.
pub fn classify_field(field: &FieldSample, levels: &Levels) -> Vec<Option<usize>> {
    field
        .values()
        .iter()
        .map(|v| v.map(|v| levels.classify(v)))
        .collect()
}
