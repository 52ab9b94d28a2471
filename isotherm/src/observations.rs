/////////////////////////////////////////////////////////////////////////////////////////////
//
// Loads station observations and applies the explicit invalid/duplicate cleaning policy.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Station observations and the cleaning policy applied before interpolation.
use crate::error::{IsothermError, Result};
use csv::ReaderBuilder;
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// A single raw observation in the source geodetic frame.
///
/// `x` is the longitude and `y` the latitude, both in degrees. `value` may be
/// NaN for a station that did not report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.value.is_finite()
    }

    /// Hashable key of the coordinate pair, with `-0.0` folded onto `0.0`.
    #[inline]
    fn coordinate_key(&self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

/// An observation in planar coordinates, guaranteed finite and unique by position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanedPoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

/// How records sharing the same coordinate pair are collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first record encountered in input order.
    #[default]
    KeepFirst,

    /// Keep a single record carrying the mean value of the group.
    Average,
}

/// Result of cleaning a set of observations.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// Surviving observations, in the order of their first appearance.
    pub observations: Vec<Observation>,

    /// Number of records dropped for a NaN or infinite field.
    pub dropped_invalid: usize,

    /// Number of records merged into an earlier record at the same position.
    pub duplicates: usize,
}

/// Removes invalid records and collapses duplicate coordinate pairs.
///
/// Coordinates are compared for exact equality in source units. The survivor
/// of a duplicate group keeps the position of the group's first record; its
/// value follows `policy`.
///
/// ### Errors
/// `EmptyInput` if no records remain.
pub fn clean_observations(
    records: &[Observation],
    policy: DuplicatePolicy,
) -> Result<CleaningOutcome> {
    let mut observations: Vec<Observation> = Vec::with_capacity(records.len());
    // Per survivor: running sum and count, only used when averaging.
    let mut groups: Vec<(f64, usize)> = Vec::with_capacity(records.len());
    let mut seen: HashMap<(u64, u64), usize> = HashMap::with_capacity(records.len());
    let mut dropped_invalid = 0usize;
    let mut duplicates = 0usize;

    for record in records {
        if !record.is_valid() {
            dropped_invalid += 1;
            continue;
        }

        match seen.entry(record.coordinate_key()) {
            Entry::Occupied(slot) => {
                duplicates += 1;
                let group = &mut groups[*slot.get()];
                group.0 += record.value;
                group.1 += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(observations.len());
                observations.push(*record);
                groups.push((record.value, 1));
            }
        }
    }

    if observations.is_empty() {
        return Err(IsothermError::EmptyInput {
            dropped: dropped_invalid,
        });
    }

    if policy == DuplicatePolicy::Average {
        observations
            .iter_mut()
            .zip(groups.iter())
            .filter(|(_, (_, count))| *count > 1)
            .for_each(|(obs, (sum, count))| obs.value = sum / *count as f64);
    }

    log::debug!(
        "cleaned observations: kept {}, dropped {} invalid, merged {} duplicates",
        observations.len(),
        dropped_invalid,
        duplicates
    );

    Ok(CleaningOutcome {
        observations,
        dropped_invalid,
        duplicates,
    })
}

/// Splits cleaned points into an `(n x 2)` coordinate matrix and an `(n x 1)` value matrix.
pub fn points_to_matrices(points: &[CleanedPoint]) -> (Mat<f64>, Mat<f64>) {
    let coordinates = Mat::from_fn(points.len(), 2, |i, j| match j {
        0 => points[i].x,
        _ => points[i].y,
    });
    let values = Mat::from_fn(points.len(), 1, |i, _| points[i].value);
    (coordinates, values)
}

/// Column layout of a delimited station file.
///
/// The defaults match the station export used operationally: an identifier
/// column, latitude, longitude, an unused column and the air temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvLayout {
    pub lat_column: usize,
    pub lon_column: usize,
    pub value_column: usize,
    pub has_headers: bool,
    pub delimiter: u8,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            lat_column: 1,
            lon_column: 2,
            value_column: 4,
            has_headers: true,
            delimiter: b',',
        }
    }
}

/// Parses a numeric field, treating empty or unparseable text as a missing value.
#[inline]
fn parse_field(field: &str) -> f64 {
    field.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Reads raw station observations from a delimited text file.
///
/// Missing or unparseable numbers become NaN so that [`clean_observations`]
/// drops the record rather than failing the whole file.
///
/// ### Errors
/// - `Io` if the file cannot be opened.
/// - `Csv` on a malformed record.
/// - `Input` if a record has fewer columns than `layout` requires.
pub fn read_observations_csv<P: AsRef<Path>>(
    path: P,
    layout: &CsvLayout,
) -> Result<Vec<Observation>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|e| IsothermError::Io {
        path: path_ref.to_path_buf(),
        source: e,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(layout.has_headers)
        .delimiter(layout.delimiter)
        .flexible(true)
        .from_reader(file);

    let required = layout
        .lat_column
        .max(layout.lon_column)
        .max(layout.value_column)
        + 1;

    let mut observations = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| IsothermError::Csv {
            path: path_ref.to_path_buf(),
            source: e,
        })?;

        if record.len() < required {
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(row + 1 + layout.has_headers as usize);
            return Err(IsothermError::Input {
                path: path_ref.to_path_buf(),
                line,
                reason: format!("expected at least {} columns, found {}", required, record.len()),
            });
        }

        observations.push(Observation::new(
            parse_field(&record[layout.lon_column]),
            parse_field(&record[layout.lat_column]),
            parse_field(&record[layout.value_column]),
        ));
    }

    Ok(observations)
}
