/////////////////////////////////////////////////////////////////////////////////////////////
//
// Orchestrates cleaning, projection, gridding, interpolation, classification and contouring.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # pipeline
//!
//! Runs the station-to-map stages in order:
//!
//! 1. clean the raw observations ([`clean_observations`]);
//! 2. project them ([`project_points`]);
//! 3. build the covering grid ([`Grid::covering`]);
//! 4. fit and evaluate the RBF interpolant ([`RbfInterpolator`]);
//! 5. classify every node into a band ([`classify_field`]);
//! 6. trace the isolines at every level ([`trace_all_isolines`]).
//!
//! A failure in any stage is returned as [`IsothermError::Stage`] naming that stage.
//! Nothing is written to disk until the whole map has been built.

use crate::{
    classify::{classify_field, Levels},
    config::{load_json_envelope, save_json_envelope, MapConfig},
    contour::{trace_all_isolines, Isoline},
    error::{IsothermError, PipelineStage, Result, StageContext},
    grid::{Extent, FieldSample, Grid},
    observations::{
        clean_observations, points_to_matrices, read_observations_csv, CleanedPoint, Observation,
    },
    palette::{Palette, Rgb},
    progress::{self, ProgressMsg, ProgressSink},
    projection::project_points,
    rbf::RbfInterpolator,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

const MAP_FORMAT_NAME: &str = "isotherm.map.json";
const MAP_VERSION: u32 = 1;

/// Everything a renderer needs to draw the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMap {
    /// Grid the field was evaluated on.
    pub grid: Grid,

    /// Interpolated value per node, in grid order.
    pub field: FieldSample,

    /// Band index per node, in grid order; `None` where the field is missing.
    pub bands: Vec<Option<usize>>,

    /// Isolines for every level, in ascending level order.
    pub isolines: Vec<Isoline>,

    /// The levels delimiting the bands.
    pub levels: Levels,
}

impl ClassifiedMap {
    pub fn n_bands(&self) -> usize {
        self.levels.n_bands()
    }

    /// Display color per node.
    pub fn node_colors(&self, palette: &Palette) -> Result<Vec<Option<Rgb>>> {
        let colors = palette.colors_for_bands(self.n_bands())?;
        Ok(self.bands.iter().map(|b| b.map(|b| colors[b])).collect())
    }

    /// Saves the map to a versioned JSON envelope.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json_envelope(path, MAP_FORMAT_NAME, MAP_VERSION, self)
    }

    /// Loads a map written by [`ClassifiedMap::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_json_envelope(path, MAP_FORMAT_NAME, MAP_VERSION)
    }

    /// Writes one `x,y,value,band` row per node. Missing values and bands are left empty.
    pub fn write_field_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let csv_error = |e| IsothermError::Csv {
            path: path_ref.to_path_buf(),
            source: e,
        };

        let mut writer = csv::Writer::from_path(path_ref).map_err(csv_error)?;
        writer
            .write_record(["x", "y", "value", "band"])
            .map_err(csv_error)?;

        for (k, (value, band)) in self.field.values().iter().zip(self.bands.iter()).enumerate() {
            let (x, y) = self.grid.node(k);
            writer
                .write_record([
                    x.to_string(),
                    y.to_string(),
                    value.map(|v| v.to_string()).unwrap_or_default(),
                    band.map(|b| b.to_string()).unwrap_or_default(),
                ])
                .map_err(csv_error)?;
        }

        writer.flush().map_err(|e| IsothermError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Sibling path an output is staged at before being renamed into place.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.partial", name))
}

/// Best-effort removal of staged or half-published outputs.
fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

/// Writes both artifacts or neither.
///
/// Each output is rendered to a staging file next to its target and only
/// renamed into place once both have been written.
fn write_outputs(map: &ClassifiedMap, map_json: &Path, field_csv: &Path) -> Result<()> {
    let json_staging = staging_path(map_json);
    let csv_staging = staging_path(field_csv);

    let staged = map
        .save_json(&json_staging)
        .and_then(|_| map.write_field_csv(&csv_staging));
    if let Err(e) = staged {
        discard(&[json_staging.as_path(), csv_staging.as_path()]);
        return Err(e);
    }

    if let Err(e) = fs::rename(&json_staging, map_json) {
        discard(&[json_staging.as_path(), csv_staging.as_path()]);
        return Err(IsothermError::Io {
            path: map_json.to_path_buf(),
            source: e,
        });
    }

    if let Err(e) = fs::rename(&csv_staging, field_csv) {
        discard(&[map_json, csv_staging.as_path()]);
        return Err(IsothermError::Io {
            path: field_csv.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// Station observations in, [`ClassifiedMap`] out.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: MapConfig,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl Pipeline {
    /// ### Errors
    /// `InvalidParameter` if the configuration does not validate.
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_callback: None,
        })
    }

    /// Optional callback for reporting stage progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Reads a station file with the configured layout and runs the pipeline on it.
    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<ClassifiedMap> {
        let observations =
            read_observations_csv(path, &self.config.csv_layout).stage(PipelineStage::Load)?;
        self.run(&observations)
    }

    /// Runs the pipeline on a station file, then writes the map JSON and field CSV.
    ///
    /// Outputs are only written once the whole map has been built.
    pub fn run_csv_to_files<P, Q, R>(&self, input: P, map_json: Q, field_csv: R) -> Result<ClassifiedMap>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let map = self.run_csv(input)?;
        write_outputs(&map, map_json.as_ref(), field_csv.as_ref()).stage(PipelineStage::Write)?;
        Ok(map)
    }

    /// Runs every stage on `observations`.
    pub fn run(&self, observations: &[Observation]) -> Result<ClassifiedMap> {
        let start = Instant::now();

        let cleaned = clean_observations(observations, self.config.duplicate_policy)
            .stage(PipelineStage::Clean)?;

        progress::emit(
            &self.progress_callback,
            ProgressMsg::ObservationsCleaned {
                kept: cleaned.observations.len(),
                dropped_invalid: cleaned.dropped_invalid,
                duplicates: cleaned.duplicates,
            },
        );

        let points = project_points(&cleaned.observations, &self.config.projection)
            .stage(PipelineStage::Project)?;

        let grid = self.build_grid(&points).stage(PipelineStage::Grid)?;

        progress::emit(
            &self.progress_callback,
            ProgressMsg::GridBuilt {
                nx: grid.nx,
                ny: grid.ny,
                spacing: grid.spacing,
            },
        );

        let field = self.interpolate(&points, &grid).stage(PipelineStage::Interpolate)?;

        let bands = classify_field(&field, &self.config.levels);

        let isolines = trace_all_isolines(&grid, &field, &self.config.levels);

        progress::emit(
            &self.progress_callback,
            ProgressMsg::IsolinesTraced {
                levels: self.config.levels.len(),
                polylines: isolines.len(),
            },
        );

        log::info!(
            "built {}x{} map from {} stations in {:?}",
            grid.nx,
            grid.ny,
            points.len(),
            start.elapsed()
        );

        Ok(ClassifiedMap {
            grid,
            field,
            bands,
            isolines,
            levels: self.config.levels.clone(),
        })
    }

    /// Covering grid, rebuilt from the fallback extent when the points span no area.
    fn build_grid(&self, points: &[CleanedPoint]) -> Result<Grid> {
        let extent = Extent::from_points(points).ok_or(IsothermError::EmptyInput { dropped: 0 })?;

        match Grid::covering(&extent, self.config.hres, self.config.grid_buffer) {
            Err(err @ IsothermError::DegenerateExtent { .. }) => match &self.config.fallback_extent {
                Some(fallback) if fallback.contains_all(points) => {
                    log::warn!("{}; using fallback extent {:?}", err, fallback);
                    Grid::covering(fallback, self.config.hres, self.config.grid_buffer)
                }
                _ => Err(err),
            },
            other => other,
        }
    }

    fn interpolate(&self, points: &[CleanedPoint], grid: &Grid) -> Result<FieldSample> {
        let (coordinates, values) = points_to_matrices(points);

        let mut builder =
            RbfInterpolator::builder(coordinates, values, self.config.interpolant_settings());
        if let Some(sink) = &self.progress_callback {
            builder = builder.progress_callback(sink.clone());
        }

        let rbfi = builder.build()?;
        Ok(rbfi.evaluate_grid(grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interpolant_config::RBFKernelType, linalg::SolveMethod, progress::RecordingSink,
        projection::ProjectionKind,
    };
    use equator::assert;

    fn square_stations() -> Vec<Observation> {
        vec![
            Observation::new(0.0, 0.0, 10.0),
            Observation::new(1.0, 0.0, 20.0),
            Observation::new(0.0, 1.0, 10.0),
            Observation::new(1.0, 1.0, 20.0),
        ]
    }

    fn planar_config(hres: f64) -> MapConfig {
        MapConfig::builder()
            .hres(hres)
            .rbf_kernel(RBFKernelType::Linear)
            .smoothing(0.0)
            .projection(ProjectionKind::Identity)
            .build()
            .unwrap()
    }

    #[test]
    fn four_stations_on_a_two_by_two_grid() {
        let mut config = planar_config(1.0);
        config.levels = Levels::new(vec![0.0, 5.0, 12.5, 17.5, 25.0]).unwrap();
        let pipeline = Pipeline::new(config).unwrap();
        let map = pipeline.run(&square_stations()).unwrap();

        assert!(map.grid.nx == 2);
        assert!(map.grid.ny == 2);
        assert!(map.grid.origin == (0.0, 0.0));

        let expected = [10.0, 20.0, 10.0, 20.0];
        for (k, v) in expected.iter().enumerate() {
            let value = map.field.get(k).unwrap();
            assert!((value - v).abs() < 1E-9);
        }

        assert!(map.bands == vec![Some(1), Some(3), Some(1), Some(3)]);
    }

    #[test]
    fn midpoint_is_bilinear_average() {
        let pipeline = Pipeline::new(planar_config(0.5)).unwrap();
        let map = pipeline.run(&square_stations()).unwrap();

        assert!(map.grid.nx == 3);
        assert!(map.grid.ny == 3);
        let midpoint = map.field.get(map.grid.index(1, 1)).unwrap();
        assert!((midpoint - 15.0).abs() < 1E-9);

        // Whole-degree isolines between the two columns are vertical lines.
        let fifteen: Vec<&Isoline> = map.isolines.iter().filter(|l| l.level == 15.0).collect();
        assert!(fifteen.len() == 1);
        assert!(!fifteen[0].closed);
        assert!(fifteen[0].points.iter().all(|p| (p.0 - 0.5).abs() < 1E-9));
    }

    #[test]
    fn reports_stage_progress_in_order() {
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(planar_config(1.0))
            .unwrap()
            .progress_callback(sink.clone());

        let mut stations = square_stations();
        stations.push(Observation::new(0.0, 0.0, 99.0));
        stations.push(Observation::new(0.5, f64::NAN, 1.0));
        pipeline.run(&stations).unwrap();

        let messages = sink.messages();
        assert!(messages.len() == 5);
        assert!(
            messages[0]
                == ProgressMsg::ObservationsCleaned {
                    kept: 4,
                    dropped_invalid: 1,
                    duplicates: 1,
                }
        );
        assert!(
            messages[1]
                == ProgressMsg::GridBuilt {
                    nx: 2,
                    ny: 2,
                    spacing: 1.0,
                }
        );
        assert!(
            messages[2]
                == ProgressMsg::SystemSolved {
                    num_points: 4,
                    method: SolveMethod::Cholesky,
                }
        );
        assert!(messages[3] == ProgressMsg::FieldEvaluated { nodes: 4, missing: 0 });
        assert!(matches!(messages[4], ProgressMsg::IsolinesTraced { levels: 100, .. }));
    }

    #[test]
    fn errors_name_the_failing_stage() {
        let pipeline = Pipeline::new(planar_config(1.0)).unwrap();

        let err = pipeline
            .run(&[Observation::new(f64::NAN, 0.0, 1.0)])
            .unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Clean));
        assert!(matches!(err.root(), IsothermError::EmptyInput { dropped: 1 }));

        let mercator = Pipeline::new(MapConfig::default()).unwrap();
        let err = mercator
            .run(&[Observation::new(24.0, 56.9, 1.0), Observation::new(24.0, 89.0, 1.0)])
            .unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Project));
        assert!(matches!(err.root(), IsothermError::Projection { index: 1, .. }));
    }

    #[test]
    fn degenerate_extent_uses_fallback_when_it_covers_the_points() {
        let collinear = vec![
            Observation::new(0.0, 5.0, 1.0),
            Observation::new(4.0, 5.0, 3.0),
        ];

        let pipeline = Pipeline::new(planar_config(1.0)).unwrap();
        let err = pipeline.run(&collinear).unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Grid));
        assert!(matches!(err.root(), IsothermError::DegenerateExtent { .. }));

        let mut config = planar_config(1.0);
        config.fallback_extent = Some(Extent::new(-1.0, 0.0, 5.0, 10.0));
        let map = Pipeline::new(config).unwrap().run(&collinear).unwrap();
        assert!(map.grid.origin == (-1.0, 0.0));
        assert!(map.grid.nx == 7);
        assert!(map.grid.ny == 11);
        assert!(map.field.missing() == 0);

        let mut config = planar_config(1.0);
        config.fallback_extent = Some(Extent::new(1.0, 0.0, 5.0, 10.0));
        let err = Pipeline::new(config).unwrap().run(&collinear).unwrap_err();
        assert!(matches!(err.root(), IsothermError::DegenerateExtent { .. }));
    }

    #[test]
    fn runs_are_deterministic() {
        let stations: Vec<Observation> = (0..40)
            .map(|i| {
                let t = i as f64;
                Observation::new(
                    21.0 + (t * 0.37).sin().abs() * 7.0,
                    55.7 + (t * 0.71).cos().abs() * 2.3,
                    -5.0 + (t * 0.13).sin() * 8.0,
                )
            })
            .collect();

        let config = MapConfig::builder()
            .hres(20_000.0)
            .projection(ProjectionKind::Mercator {
                central_longitude: 24.0,
            })
            .build()
            .unwrap();
        let pipeline = Pipeline::new(config).unwrap();

        let first = pipeline.run(&stations).unwrap();
        let second = pipeline.run(&stations).unwrap();
        assert!(first == second);
        assert!(first.field.missing() == 0);
    }

    #[test]
    fn run_csv_and_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stations.csv");
        std::fs::write(
            &input,
            "id,lat,lon,height,temp\n\
             RIGA,56.95,24.11,3,-4.5\n\
             LIEPAJA,56.51,21.01,5,-1.0\n\
             DAUGAVPILS,55.87,26.54,120,-7.2\n\
             VALMIERA,57.54,25.43,40,-6.1\n\
             VENTSPILS,57.39,21.56,4,\n\
             RIGA2,56.95,24.11,3,-4.0\n",
        )
        .unwrap();

        let config = MapConfig::builder().hres(25_000.0).build().unwrap();
        let json = dir.path().join("map.json");
        let csv_path = dir.path().join("field.csv");
        let map = Pipeline::new(config)
            .unwrap()
            .run_csv_to_files(&input, &json, &csv_path)
            .unwrap();
        assert!(map.field.len() == map.grid.num_nodes());
        assert!(map.bands.len() == map.grid.num_nodes());

        assert!(ClassifiedMap::load_json(&json).unwrap() == map);

        let text = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next() == Some("x,y,value,band"));
        assert!(lines.count() == map.grid.num_nodes());

        let colors = map.node_colors(&Palette::default_temperature()).unwrap();
        assert!(colors.iter().all(|c| c.is_some()));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn map_json_round_trip_is_bit_exact() {
        let grid = Grid {
            origin: (-2_504_688.5427, 7_361_866.1130),
            spacing: 60_000.0,
            nx: 2,
            ny: 2,
        };
        let values = vec![Some(-1.9048152030605001), Some(0.1 + 0.2), None, Some(-7.2e-17)];
        let map = ClassifiedMap {
            grid,
            field: FieldSample::new(values.clone()),
            bands: vec![Some(48), Some(50), None, Some(49)],
            isolines: vec![Isoline {
                level: 0.0,
                points: vec![(1.0 / 3.0, 2.0 / 3.0), (0.7000000000000001, 1e-300)],
                closed: false,
            }],
            levels: Levels::default_temperature(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        map.save_json(&path).unwrap();
        let loaded = ClassifiedMap::load_json(&path).unwrap();

        assert!(loaded == map);
        for (a, b) in loaded.field.values().iter().zip(values.iter()) {
            assert!(a.map(f64::to_bits) == b.map(f64::to_bits));
        }
    }

    #[test]
    fn missing_input_file_fails_in_load_stage() {
        let pipeline = Pipeline::new(MapConfig::default()).unwrap();
        let err = pipeline.run_csv("/nonexistent/stations.csv").unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Load));
        assert!(matches!(err.root(), IsothermError::Io { .. }));
    }

    fn write_three_stations(dir: &Path) -> PathBuf {
        let input = dir.join("stations.csv");
        std::fs::write(
            &input,
            "id,lat,lon,height,temp\nA,56.0,22.0,0,1.0\nB,57.0,25.0,0,3.0\nC,56.5,27.0,0,2.0\n",
        )
        .unwrap();
        input
    }

    #[test]
    fn unwritable_map_json_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_three_stations(dir.path());
        let csv_path = dir.path().join("field.csv");

        let pipeline = Pipeline::new(MapConfig::default()).unwrap();
        let err = pipeline
            .run_csv_to_files(&input, dir.path().join("missing/map.json"), &csv_path)
            .unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Write));
        assert!(!csv_path.exists());
        assert!(!staging_path(&csv_path).exists());
    }

    #[test]
    fn unwritable_field_csv_leaves_no_map_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_three_stations(dir.path());
        let json = dir.path().join("map.json");

        let pipeline = Pipeline::new(MapConfig::default()).unwrap();
        let err = pipeline
            .run_csv_to_files(&input, &json, dir.path().join("missing/field.csv"))
            .unwrap_err();
        assert!(err.stage() == Some(PipelineStage::Write));
        assert!(!json.exists());
        assert!(!staging_path(&json).exists());
    }
}
