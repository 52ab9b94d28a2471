/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the error taxonomy shared by every stage of the isotherm pipeline.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Error types returned by the isotherm pipeline.
//!
//! Every error is terminal for the current run. Stages never retry: an error
//! reflects either bad input or a configuration that cannot be solved, and is
//! handed straight back to the caller.
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IsothermError>;

/// Identifies the pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Clean,
    Project,
    Grid,
    Interpolate,
    Write,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Load => "load",
            PipelineStage::Clean => "clean",
            PipelineStage::Project => "project",
            PipelineStage::Grid => "grid",
            PipelineStage::Interpolate => "interpolate",
            PipelineStage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Errors raised by the isotherm pipeline.
#[derive(Debug, Error)]
pub enum IsothermError {
    /// No usable observations remain after cleaning.
    #[error("no valid observations remain after cleaning ({dropped} invalid records dropped)")]
    EmptyInput { dropped: usize },

    /// A coordinate lies outside the valid domain of the projection.
    #[error("observation {index} at (lon {lon}, lat {lat}) is outside the {projection} domain: {reason}")]
    Projection {
        index: usize,
        lon: f64,
        lat: f64,
        projection: &'static str,
        reason: String,
    },

    /// A planar coordinate cannot be mapped back through the projection.
    #[error("point (x {x}, y {y}) is outside the inverse {projection} domain: {reason}")]
    InverseProjection {
        x: f64,
        y: f64,
        projection: &'static str,
        reason: String,
    },

    /// The observation bounding box has zero width or height.
    #[error("degenerate extent: bounding box [{xmin}, {ymin}, {xmax}, {ymax}] has zero area")]
    DegenerateExtent {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    /// A configuration value is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The regularised RBF system could not be solved, even in the least squares sense.
    #[error("RBF system with {num_points} points could not be solved: {reason}")]
    SingularSystem { num_points: usize, reason: String },

    /// Malformed input record.
    #[error("{path}: line {line}: {reason}")]
    Input {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Low-level I/O failure.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV reader or writer failure.
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON (de)serialization failure.
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON envelope does not carry the expected format or version.
    #[error("{path}: expected {expected}, found {found}")]
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// Wraps an error with the pipeline stage it came from.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<IsothermError>,
    },
}

impl IsothermError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        IsothermError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn singular(num_points: usize, reason: impl Into<String>) -> Self {
        IsothermError::SingularSystem {
            num_points,
            reason: reason.into(),
        }
    }

    /// Tags the error with the stage it was raised in. Already tagged errors
    /// keep their original stage.
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            tagged @ IsothermError::Stage { .. } => tagged,
            other => IsothermError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the stage the error was raised in, if it has been tagged.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            IsothermError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the untagged root error.
    pub fn root(&self) -> &IsothermError {
        match self {
            IsothermError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for tagging results with their pipeline stage.
pub(crate) trait StageContext<T> {
    fn stage(self, stage: PipelineStage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    #[inline]
    fn stage(self, stage: PipelineStage) -> Result<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn stage_tagging_keeps_first_stage() {
        let err = IsothermError::EmptyInput { dropped: 3 }
            .in_stage(PipelineStage::Clean)
            .in_stage(PipelineStage::Grid);

        assert!(err.stage() == Some(PipelineStage::Clean));
        assert!(matches!(err.root(), IsothermError::EmptyInput { dropped: 3 }));
        assert!(err.to_string().starts_with("clean stage failed"));
    }
}
