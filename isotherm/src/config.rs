/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the map configuration surface and its versioned JSON persistence.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares the map configuration surface and its versioned JSON persistence.
use crate::{
    classify::Levels,
    error::{IsothermError, Result},
    grid::Extent,
    interpolant_config::{get_min_drift, Drift, InterpolantSettings, RBFKernelType},
    observations::{CsvLayout, DuplicatePolicy},
    projection::ProjectionKind,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

const CONFIG_FORMAT_NAME: &str = "isotherm.config.json";
const CONFIG_VERSION: u32 = 1;

/// Borrowing envelope for SAVE (no clone of the payload).
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    payload: &'a T,
}

/// Owning envelope for LOAD.
#[derive(Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    #[serde(flatten)]
    payload: T,
}

/// Writes `payload` to `path` inside a `{ format, version, ... }` envelope.
pub(crate) fn save_json_envelope<T: Serialize + ?Sized, P: AsRef<Path>>(
    path: P,
    format: &'static str,
    version: u32,
    payload: &T,
) -> Result<()> {
    let path_ref = path.as_ref();
    let io_error = |e| IsothermError::Io {
        path: path_ref.to_path_buf(),
        source: e,
    };

    let file = File::create(path_ref).map_err(io_error)?;
    let mut w = BufWriter::new(file);

    let env = JsonEnvelopeRef {
        format,
        version,
        payload,
    };

    serde_json::to_writer_pretty(&mut w, &env).map_err(|e| IsothermError::Json {
        path: path_ref.to_path_buf(),
        source: e,
    })?;
    w.flush().map_err(io_error)?;
    Ok(())
}

/// Reads a payload written by [`save_json_envelope`], validating format and version.
pub(crate) fn load_json_envelope<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
    format: &'static str,
    version: u32,
) -> Result<T> {
    let path_ref = path.as_ref();

    let file = File::open(path_ref).map_err(|e| IsothermError::Io {
        path: path_ref.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let env: JsonEnvelopeOwned<T> =
        serde_json::from_reader(reader).map_err(|e| IsothermError::Json {
            path: path_ref.to_path_buf(),
            source: e,
        })?;

    if env.format != format || env.version != version {
        return Err(IsothermError::FormatMismatch {
            path: path_ref.to_path_buf(),
            found: format!("{} v{}", env.format, env.version),
            expected: format!("{} v{}", format, version),
        });
    }

    Ok(env.payload)
}

/// Parameters of a complete station-to-map run.
///
/// Every field has a default, so a JSON file only needs the values that differ.
///
/// ### Default Values
/// - `hres`: `60000` (metres between grid nodes)
/// - `rbf_kernel`: `linear`
/// - `smoothing`: `60000`
/// - `levels`: `-50, -49, ..., 49`
/// - `epsilon`: mean point spacing
/// - `drift`: the kernel minimum
/// - `duplicate_policy`: `keep_first`
/// - `projection`: Mercator with central meridian `0`
/// - `grid_buffer`: `0`
/// - `fallback_extent`: none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Grid spacing in projected units.
    pub hres: f64,

    /// Radial basis function kernel.
    pub rbf_kernel: RBFKernelType,

    /// Added to the diagonal of the kernel matrix; `0` interpolates exactly.
    pub smoothing: f64,

    /// Threshold levels delimiting the classification bands.
    pub levels: Levels,

    /// Kernel shape parameter for gaussian and multiquadric kernels.
    pub epsilon: Option<f64>,

    /// Polynomial drift; defaults to the kernel minimum.
    pub drift: Option<Drift>,

    /// How observations sharing a position are collapsed.
    pub duplicate_policy: DuplicatePolicy,

    /// Projection applied to the station coordinates.
    pub projection: ProjectionKind,

    /// Distance added around the observation extent before snapping the grid.
    pub grid_buffer: f64,

    /// Projected extent used when the observations span no area.
    pub fallback_extent: Option<Extent>,

    /// Column layout for CSV station files.
    pub csv_layout: CsvLayout,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            hres: 60_000.0,
            rbf_kernel: RBFKernelType::Linear,
            smoothing: 60_000.0,
            levels: Levels::default_temperature(),
            epsilon: None,
            drift: None,
            duplicate_policy: DuplicatePolicy::KeepFirst,
            projection: ProjectionKind::default(),
            grid_buffer: 0.0,
            fallback_extent: None,
            csv_layout: CsvLayout::default(),
        }
    }
}

impl MapConfig {
    /// Returns a new [`MapConfigBuilder`] seeded with the defaults.
    pub fn builder() -> MapConfigBuilder {
        MapConfigBuilder {
            config: MapConfig::default(),
        }
    }

    /// The drift actually used: the configured one or the kernel minimum.
    pub fn effective_drift(&self) -> Drift {
        self.drift.unwrap_or_else(|| get_min_drift(self.rbf_kernel))
    }

    /// Interpolant settings derived from this configuration.
    pub fn interpolant_settings(&self) -> InterpolantSettings {
        let mut builder = InterpolantSettings::builder(self.rbf_kernel)
            .drift(self.effective_drift())
            .smoothing(self.smoothing);
        if let Some(epsilon) = self.epsilon {
            builder = builder.epsilon(epsilon);
        }
        builder.build()
    }

    /// Checks every numeric parameter.
    ///
    /// ### Errors
    /// `InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.hres.is_finite() || self.hres <= 0.0 {
            return Err(IsothermError::invalid(
                "hres",
                format!("must be finite and > 0, got {}", self.hres),
            ));
        }

        if !self.grid_buffer.is_finite() || self.grid_buffer < 0.0 {
            return Err(IsothermError::invalid(
                "grid_buffer",
                format!("must be finite and >= 0, got {}", self.grid_buffer),
            ));
        }

        if let Some(extent) = &self.fallback_extent {
            if !extent.is_finite() || !(extent.width() > 0.0) || !(extent.height() > 0.0) {
                return Err(IsothermError::invalid(
                    "fallback_extent",
                    format!("must have a positive finite area, got {:?}", extent),
                ));
            }
        }

        self.interpolant_settings().validate()
    }

    /// Loads and validates a configuration saved with [`MapConfig::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: MapConfig = load_json_envelope(path, CONFIG_FORMAT_NAME, CONFIG_VERSION)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to a versioned JSON envelope.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json_envelope(path, CONFIG_FORMAT_NAME, CONFIG_VERSION, self)
    }
}

/// A convenience builder for constructing a validated [`MapConfig`].
///
/// The builder should be called via the [`MapConfig::builder`] method.
#[derive(Debug, Clone)]
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    pub fn hres(mut self, hres: f64) -> Self {
        self.config.hres = hres;
        self
    }

    pub fn rbf_kernel(mut self, rbf_kernel: RBFKernelType) -> Self {
        self.config.rbf_kernel = rbf_kernel;
        self
    }

    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    pub fn levels(mut self, levels: Levels) -> Self {
        self.config.levels = levels;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = Some(epsilon);
        self
    }

    pub fn drift(mut self, drift: Drift) -> Self {
        self.config.drift = Some(drift);
        self
    }

    pub fn duplicate_policy(mut self, duplicate_policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = duplicate_policy;
        self
    }

    pub fn projection(mut self, projection: ProjectionKind) -> Self {
        self.config.projection = projection;
        self
    }

    pub fn grid_buffer(mut self, grid_buffer: f64) -> Self {
        self.config.grid_buffer = grid_buffer;
        self
    }

    pub fn fallback_extent(mut self, fallback_extent: Extent) -> Self {
        self.config.fallback_extent = Some(fallback_extent);
        self
    }

    pub fn csv_layout(mut self, csv_layout: CsvLayout) -> Self {
        self.config.csv_layout = csv_layout;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<MapConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn defaults_match_operational_settings() {
        let config = MapConfig::default();
        assert!(config.hres == 60_000.0);
        assert!(config.rbf_kernel == RBFKernelType::Linear);
        assert!(config.smoothing == 60_000.0);
        assert!(config.levels.len() == 100);
        assert!(config.duplicate_policy == DuplicatePolicy::KeepFirst);
        assert!(config.projection == ProjectionKind::Mercator { central_longitude: 0.0 });
        assert!(config.effective_drift() == Drift::Constant);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_validates() {
        let err = MapConfig::builder().hres(0.0).build().unwrap_err();
        assert!(matches!(err, IsothermError::InvalidParameter { name: "hres", .. }));

        let err = MapConfig::builder().smoothing(-1.0).build().unwrap_err();
        assert!(matches!(err, IsothermError::InvalidParameter { name: "smoothing", .. }));

        let err = MapConfig::builder()
            .rbf_kernel(RBFKernelType::ThinPlate)
            .drift(Drift::Constant)
            .build()
            .unwrap_err();
        assert!(matches!(err, IsothermError::InvalidParameter { name: "drift", .. }));

        let err = MapConfig::builder()
            .fallback_extent(Extent::new(0.0, 0.0, 0.0, 10.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, IsothermError::InvalidParameter { name: "fallback_extent", .. }));

        assert!(MapConfig::builder().rbf_kernel(RBFKernelType::Gaussian).epsilon(5.0).build().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: MapConfig =
            serde_json::from_str(r#"{"hres": 25000.0, "rbf_kernel": "thin_plate", "levels": [0.0, 5.0, 10.0]}"#)
                .unwrap();

        assert!(config.hres == 25_000.0);
        assert!(config.rbf_kernel == RBFKernelType::ThinPlate);
        assert!(config.levels.n_bands() == 2);
        assert!(config.smoothing == 60_000.0);
        assert!(config.effective_drift() == Drift::Linear);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = MapConfig::builder()
            .hres(30_000.0)
            .rbf_kernel(RBFKernelType::Multiquadric)
            .epsilon(45_000.0)
            .duplicate_policy(DuplicatePolicy::Average)
            .projection(ProjectionKind::Mercator {
                central_longitude: 24.0,
            })
            .build()
            .unwrap();

        config.save_json(&path).unwrap();
        let loaded = MapConfig::load_json(&path).unwrap();
        assert!(loaded == config);
    }

    #[test]
    fn load_rejects_foreign_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.json");
        std::fs::write(&path, r#"{"format": "something.else", "version": 1, "hres": 1.0}"#).unwrap();

        let err = MapConfig::load_json(&path).unwrap_err();
        assert!(matches!(err, IsothermError::FormatMismatch { .. }));
    }
}
