/////////////////////////////////////////////////////////////////////////////////////////////
//
// Projects geodetic station coordinates into the planar frame used for interpolation.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # projection
//!
//! Coordinate projections from longitude/latitude in degrees to planar metres.
//!
//! [`Mercator`] is the ellipsoidal (WGS84) Mercator projection. Its inverse has no
//! closed form for the latitude, so it is recovered with a bracketed Brent search.
//! [`Identity`] passes coordinates through unchanged for data already in a planar frame.

use crate::{
    error::{IsothermError, Result},
    observations::{CleanedPoint, Observation},
};
use rayon::prelude::*;
use roots::{find_root_brent, SimpleConvergency};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};

/// WGS84 semi-major axis in metres.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// A forward and inverse map between geodetic and planar coordinates.
pub trait Projection: Send + Sync {
    /// Short name reported in errors.
    fn name(&self) -> &'static str;

    /// Maps `(lon, lat)` in degrees to planar `(x, y)`.
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;

    /// Maps planar `(x, y)` back to `(lon, lat)` in degrees.
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

fn out_of_domain(projection: &'static str, lon: f64, lat: f64, reason: impl Into<String>) -> IsothermError {
    IsothermError::Projection {
        index: 0,
        lon,
        lat,
        projection,
        reason: reason.into(),
    }
}

fn outside_inverse(projection: &'static str, x: f64, y: f64, reason: impl Into<String>) -> IsothermError {
    IsothermError::InverseProjection {
        x,
        y,
        projection,
        reason: reason.into(),
    }
}

/// Ellipsoidal Mercator projection on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mercator {
    /// Longitude mapped to `x = 0`, in degrees.
    pub central_longitude: f64,

    /// Southern latitude limit in degrees.
    pub min_latitude: f64,

    /// Northern latitude limit in degrees.
    pub max_latitude: f64,
}

impl Default for Mercator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Mercator {
    pub fn new(central_longitude: f64) -> Self {
        Self {
            central_longitude,
            min_latitude: -80.0,
            max_latitude: 84.0,
        }
    }

    #[inline]
    fn eccentricity() -> f64 {
        (WGS84_FLATTENING * (2.0 - WGS84_FLATTENING)).sqrt()
    }

    /// Northing of a latitude given in radians.
    #[inline]
    fn northing(phi: f64) -> f64 {
        let e = Self::eccentricity();
        let esin = e * phi.sin();
        WGS84_SEMI_MAJOR_AXIS
            * ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - esin) / (1.0 + esin)).powf(e / 2.0)).ln()
    }

    /// Longitude offset from the central meridian, in degrees.
    fn delta_longitude(&self, lon: f64) -> Result<f64> {
        let delta = lon - self.central_longitude;
        if !delta.is_finite() || delta.abs() > 180.0 {
            return Err(out_of_domain(
                self.name(),
                lon,
                f64::NAN,
                format!(
                    "longitude is more than 180 degrees from the central meridian {}",
                    self.central_longitude
                ),
            ));
        }
        Ok(delta)
    }
}

impl Projection for Mercator {
    fn name(&self) -> &'static str {
        "mercator"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !lat.is_finite() || lat < self.min_latitude || lat > self.max_latitude {
            return Err(out_of_domain(
                self.name(),
                lon,
                lat,
                format!(
                    "latitude must lie within [{}, {}]",
                    self.min_latitude, self.max_latitude
                ),
            ));
        }

        let delta = self
            .delta_longitude(lon)
            .map_err(|_| out_of_domain(self.name(), lon, lat, "longitude outside projection domain"))?;

        let x = WGS84_SEMI_MAJOR_AXIS * delta.to_radians();
        let y = Self::northing(lat.to_radians());
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let half_width = PI * WGS84_SEMI_MAJOR_AXIS;
        if !x.is_finite() || x.abs() > half_width {
            return Err(outside_inverse(self.name(), x, y, "easting outside projection domain"));
        }

        let lo = self.min_latitude.to_radians();
        let hi = self.max_latitude.to_radians();
        let (y_lo, y_hi) = (Self::northing(lo), Self::northing(hi));

        if !y.is_finite() || y < y_lo || y > y_hi {
            return Err(outside_inverse(self.name(), x, y, "northing outside projection domain"));
        }

        let lon = self.central_longitude + (x / WGS84_SEMI_MAJOR_AXIS).to_degrees();

        if y == y_lo {
            return Ok((lon, self.min_latitude));
        }
        if y == y_hi {
            return Ok((lon, self.max_latitude));
        }

        let mut convergency = SimpleConvergency {
            eps: 1E-13,
            max_iter: 100,
        };
        let phi = find_root_brent(lo, hi, |phi: f64| Self::northing(phi) - y, &mut convergency)
            .map_err(|e| outside_inverse(self.name(), x, y, format!("latitude search failed: {:?}", e)))?;

        Ok((lon, phi.to_degrees()))
    }
}

/// Passthrough projection for data already in planar coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity;

impl Projection for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(out_of_domain(self.name(), lon, lat, "coordinate is not finite"));
        }
        Ok((lon, lat))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(outside_inverse(self.name(), x, y, "coordinate is not finite"));
        }
        Ok((x, y))
    }
}

/// Serializable selection of the projection applied by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionKind {
    Mercator { central_longitude: f64 },
    Identity,
}

impl Default for ProjectionKind {
    fn default() -> Self {
        ProjectionKind::Mercator {
            central_longitude: 0.0,
        }
    }
}

impl Projection for ProjectionKind {
    fn name(&self) -> &'static str {
        match self {
            ProjectionKind::Mercator { .. } => "mercator",
            ProjectionKind::Identity => "identity",
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self {
            ProjectionKind::Mercator { central_longitude } => {
                Mercator::new(*central_longitude).forward(lon, lat)
            }
            ProjectionKind::Identity => Identity.forward(lon, lat),
        }
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            ProjectionKind::Mercator { central_longitude } => {
                Mercator::new(*central_longitude).inverse(x, y)
            }
            ProjectionKind::Identity => Identity.inverse(x, y),
        }
    }
}

/// Projects every observation, preserving input order.
///
/// ### Errors
/// `Projection` naming the first offending observation index.
pub fn project_points<P: Projection + ?Sized>(
    observations: &[Observation],
    projection: &P,
) -> Result<Vec<CleanedPoint>> {
    let projected: Vec<Result<CleanedPoint>> = observations
        .par_iter()
        .enumerate()
        .map(|(index, obs)| {
            projection
                .forward(obs.x, obs.y)
                .map(|(x, y)| CleanedPoint {
                    x,
                    y,
                    value: obs.value,
                })
                .map_err(|e| match e {
                    IsothermError::Projection {
                        projection, reason, ..
                    } => IsothermError::Projection {
                        index,
                        lon: obs.x,
                        lat: obs.y,
                        projection,
                        reason,
                    },
                    other => other,
                })
        })
        .collect();

    projected.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn mercator_forward_reference_values() {
        let merc = Mercator::default();

        let (x, y) = merc.forward(0.0, 0.0).unwrap();
        assert!(close(x, 0.0, 1E-9));
        assert!(close(y, 0.0, 1E-9));

        // One degree of longitude on the equator.
        let (x, _) = merc.forward(1.0, 0.0).unwrap();
        assert!(close(x, 111_319.490_793_273_57, 1E-6));

        // Ellipsoidal northing at 45 degrees north.
        let (_, y) = merc.forward(0.0, 45.0).unwrap();
        assert!(close(y, 5_591_295.918_553, 1E-3));
    }

    #[test]
    fn mercator_round_trip() {
        let merc = Mercator::new(24.0);
        for (lon, lat) in [(21.0, 55.7), (28.2, 58.1), (-150.0, -79.5), (200.0, 83.9), (24.0, 0.0)] {
            let (x, y) = merc.forward(lon, lat).unwrap();
            let (lon2, lat2) = merc.inverse(x, y).unwrap();
            assert!(close(lon, lon2, 1E-9));
            assert!(close(lat, lat2, 1E-9));
        }
    }

    #[test]
    fn mercator_rejects_polar_and_wrapped_coordinates() {
        let merc = Mercator::default();
        assert!(merc.forward(0.0, 85.0).is_err());
        assert!(merc.forward(0.0, -80.5).is_err());
        assert!(merc.forward(181.0, 10.0).is_err());
        let err = merc.inverse(0.0, 1.0E9).unwrap_err();
        assert!(matches!(
            err,
            IsothermError::InverseProjection { x, y, .. } if x == 0.0 && y == 1.0E9
        ));
        let err = merc.inverse(1.0E9, 0.0).unwrap_err();
        assert!(matches!(err, IsothermError::InverseProjection { x, .. } if x == 1.0E9));
        assert!(err.to_string().contains("x 1000000000"));
    }

    #[test]
    fn identity_passes_through() {
        let (x, y) = Identity.forward(512_000.0, 6_300_000.0).unwrap();
        assert!((x, y) == (512_000.0, 6_300_000.0));
        assert!(Identity.forward(f64::NAN, 0.0).is_err());
        assert!(matches!(
            Identity.inverse(0.0, f64::INFINITY),
            Err(IsothermError::InverseProjection { .. })
        ));
    }

    #[test]
    fn project_points_preserves_order() {
        let observations: Vec<Observation> = (0..100)
            .map(|i| Observation::new(20.0 + i as f64 * 0.1, 55.0 + i as f64 * 0.03, i as f64))
            .collect();

        let kind = ProjectionKind::default();
        let projected = project_points(&observations, &kind).unwrap();

        assert!(projected.len() == observations.len());
        for (obs, p) in observations.iter().zip(projected.iter()) {
            let (x, y) = kind.forward(obs.x, obs.y).unwrap();
            assert!(p.x == x);
            assert!(p.y == y);
            assert!(p.value == obs.value);
        }
    }

    #[test]
    fn project_points_reports_first_offending_index() {
        let observations = vec![
            Observation::new(24.0, 56.0, 1.0),
            Observation::new(24.0, 89.0, 1.0),
            Observation::new(24.0, 56.5, 1.0),
            Observation::new(24.0, 89.5, 1.0),
        ];

        let err = project_points(&observations, &Mercator::default()).unwrap_err();
        assert!(matches!(
            err,
            IsothermError::Projection {
                index: 1,
                projection: "mercator",
                ..
            }
        ));
    }

    #[test]
    fn projection_kind_serialises_with_tag() {
        let json = serde_json::to_string(&ProjectionKind::Identity).unwrap();
        assert!(json == r#"{"kind":"identity"}"#);

        let kind: ProjectionKind =
            serde_json::from_str(r#"{"kind":"mercator","central_longitude":24.0}"#).unwrap();
        assert!(kind == ProjectionKind::Mercator { central_longitude: 24.0 });
    }
}
