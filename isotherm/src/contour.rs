/////////////////////////////////////////////////////////////////////////////////////////////
//
// Traces isolines of a gridded field with marching squares and stitches them into polylines.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # contour
//!
//! Marching squares over the cells of a [`Grid`]. A corner is "above" when its value is
//! at or above the level, edge crossings are placed by linear interpolation, and the two
//! ambiguous saddle configurations are resolved with the mean of the four corners.
//!
//! Every crossing is identified by the grid edge it lies on and its position is computed
//! from that edge alone, so the two cells sharing an edge produce bitwise identical
//! points. Segments are then joined through their shared edges: a closed polyline ends on
//! exactly the point it started from, and an open polyline ends on an edge with no
//! neighbouring cell (the grid boundary or the border of a missing region).

use crate::{
    classify::Levels,
    grid::{FieldSample, Grid},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A polyline along which the interpolated field equals `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isoline {
    pub level: f64,
    pub points: Vec<(f64, f64)>,
    pub closed: bool,
}

/// Identity of a grid edge.
///
/// `Horizontal { i, j }` joins nodes `(i, j)` and `(i + 1, j)`;
/// `Vertical { i, j }` joins nodes `(i, j)` and `(i, j + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    Horizontal { i: usize, j: usize },
    Vertical { i: usize, j: usize },
}

type Segment = (EdgeKey, EdgeKey);

/// Cell corner values, counter-clockwise from bottom-left.
struct Cell {
    i: usize,
    j: usize,
    bl: f64,
    br: f64,
    tr: f64,
    tl: f64,
}

impl Cell {
    fn gather(grid: &Grid, field: &FieldSample, i: usize, j: usize) -> Option<Self> {
        Some(Self {
            i,
            j,
            bl: field.get(grid.index(i, j))?,
            br: field.get(grid.index(i + 1, j))?,
            tr: field.get(grid.index(i + 1, j + 1))?,
            tl: field.get(grid.index(i, j + 1))?,
        })
    }

    fn case(&self, level: f64) -> u8 {
        (self.bl >= level) as u8
            | ((self.br >= level) as u8) << 1
            | ((self.tr >= level) as u8) << 2
            | ((self.tl >= level) as u8) << 3
    }

    fn center(&self) -> f64 {
        (self.bl + self.br + self.tr + self.tl) / 4.0
    }

    /// Appends the segments of this cell, at most two.
    fn segments(&self, level: f64, out: &mut Vec<Segment>) {
        let (i, j) = (self.i, self.j);
        let bottom = EdgeKey::Horizontal { i, j };
        let top = EdgeKey::Horizontal { i, j: j + 1 };
        let left = EdgeKey::Vertical { i, j };
        let right = EdgeKey::Vertical { i: i + 1, j };

        match self.case(level) {
            0 | 15 => {}
            1 | 14 => out.push((left, bottom)),
            2 | 13 => out.push((bottom, right)),
            3 | 12 => out.push((left, right)),
            4 | 11 => out.push((right, top)),
            6 | 9 => out.push((bottom, top)),
            7 | 8 => out.push((left, top)),
            5 => {
                // bl and tr above.
                if self.center() >= level {
                    out.push((bottom, right));
                    out.push((top, left));
                } else {
                    out.push((left, bottom));
                    out.push((right, top));
                }
            }
            10 => {
                // br and tl above.
                if self.center() >= level {
                    out.push((left, bottom));
                    out.push((top, right));
                } else {
                    out.push((bottom, right));
                    out.push((top, left));
                }
            }
            _ => unreachable!("marching squares case index is four bits"),
        }
    }
}

/// Position of the level crossing on `edge`.
fn crossing(grid: &Grid, field: &FieldSample, edge: EdgeKey, level: f64) -> (f64, f64) {
    let (a, b) = match edge {
        EdgeKey::Horizontal { i, j } => ((i, j), (i + 1, j)),
        EdgeKey::Vertical { i, j } => ((i, j), (i, j + 1)),
    };
    let pa = grid.node_ij(a.0, a.1);
    let pb = grid.node_ij(b.0, b.1);
    let va = field.get(grid.index(a.0, a.1)).unwrap_or(level);
    let vb = field.get(grid.index(b.0, b.1)).unwrap_or(level);

    let t = if vb != va { (level - va) / (vb - va) } else { 0.5 };
    let t = t.clamp(0.0, 1.0);

    (pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1))
}

fn other_end(segment: &Segment, edge: EdgeKey) -> EdgeKey {
    if segment.0 == edge { segment.1 } else { segment.0 }
}

/// Walks unvisited segments from `start` until no unvisited segment continues the chain.
fn walk(
    start: EdgeKey,
    segments: &[Segment],
    adjacency: &HashMap<EdgeKey, Vec<usize>>,
    visited: &mut [bool],
) -> Vec<EdgeKey> {
    let mut chain = vec![start];
    let mut current = start;

    loop {
        let next = match adjacency
            .get(&current)
            .and_then(|ids| ids.iter().copied().find(|&id| !visited[id]))
        {
            Some(id) => id,
            None => break,
        };
        visited[next] = true;
        current = other_end(&segments[next], current);
        chain.push(current);
    }

    chain
}

/// Traces the isolines of `field` at `level`.
///
/// Cells with a missing corner are skipped. Open polylines are emitted first, in the
/// order their first segment appears scanning cells row by row, followed by closed ones.
pub fn trace_isolines(grid: &Grid, field: &FieldSample, level: f64) -> Vec<Isoline> {
    if grid.nx < 2 || grid.ny < 2 || !level.is_finite() {
        return Vec::new();
    }

    let mut segments: Vec<Segment> = Vec::new();
    for j in 0..grid.ny - 1 {
        for i in 0..grid.nx - 1 {
            if let Some(cell) = Cell::gather(grid, field, i, j) {
                cell.segments(level, &mut segments);
            }
        }
    }

    let mut adjacency: HashMap<EdgeKey, Vec<usize>> = HashMap::with_capacity(2 * segments.len());
    for (id, segment) in segments.iter().enumerate() {
        adjacency.entry(segment.0).or_default().push(id);
        adjacency.entry(segment.1).or_default().push(id);
    }

    let is_chain_end = |edge: &EdgeKey| adjacency.get(edge).map_or(false, |ids| ids.len() == 1);

    let mut visited = vec![false; segments.len()];
    let mut chains: Vec<(Vec<EdgeKey>, bool)> = Vec::new();

    // Open chains start and stop on edges used by a single segment.
    for id in 0..segments.len() {
        if visited[id] {
            continue;
        }
        let (a, b) = segments[id];
        let start = if is_chain_end(&a) {
            a
        } else if is_chain_end(&b) {
            b
        } else {
            continue;
        };
        chains.push((walk(start, &segments, &adjacency, &mut visited), false));
    }

    // Everything left forms closed loops.
    for id in 0..segments.len() {
        if visited[id] {
            continue;
        }
        let start = segments[id].0;
        chains.push((walk(start, &segments, &adjacency, &mut visited), true));
    }

    chains
        .into_iter()
        .map(|(edges, closed)| Isoline {
            level,
            points: edges
                .into_iter()
                .map(|edge| crossing(grid, field, edge, level))
                .collect(),
            closed,
        })
        .collect()
}

/// Traces isolines for every level, in ascending level order.
pub fn trace_all_isolines(grid: &Grid, field: &FieldSample, levels: &Levels) -> Vec<Isoline> {
    levels
        .as_slice()
        .par_iter()
        .map(|&level| trace_isolines(grid, field, level))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    fn unit_grid(nx: usize, ny: usize) -> Grid {
        Grid {
            origin: (0.0, 0.0),
            spacing: 1.0,
            nx,
            ny,
        }
    }

    fn sample(grid: &Grid, f: impl Fn(f64, f64) -> f64) -> FieldSample {
        FieldSample::from_raw((0..grid.num_nodes()).map(|k| {
            let (x, y) = grid.node(k);
            f(x, y)
        }))
    }

    fn on_boundary(grid: &Grid, p: (f64, f64)) -> bool {
        let e = grid.extent();
        p.0 == e.xmin || p.0 == e.xmax || p.1 == e.ymin || p.1 == e.ymax
    }

    #[test]
    fn single_peak_gives_one_closed_loop() {
        let grid = unit_grid(3, 3);
        let field = sample(&grid, |x, y| if x == 1.0 && y == 1.0 { 1.0 } else { 0.0 });

        let lines = trace_isolines(&grid, &field, 0.5);

        assert!(lines.len() == 1);
        let line = &lines[0];
        assert!(line.closed);
        assert!(line.points.len() == 5);
        assert!(line.points.first() == line.points.last());
        for p in &line.points {
            let d = (p.0 - 1.0).abs() + (p.1 - 1.0).abs();
            assert!((d - 0.5).abs() < 1E-12);
        }
    }

    #[test]
    fn ramp_gives_one_open_line_across_the_grid() {
        let grid = unit_grid(3, 3);
        let field = sample(&grid, |x, _| x);

        let lines = trace_isolines(&grid, &field, 0.5);

        assert!(lines.len() == 1);
        let line = &lines[0];
        assert!(!line.closed);
        assert!(line.points.len() == 3);
        assert!(line.points.iter().all(|p| (p.0 - 0.5).abs() < 1E-12));
        assert!(on_boundary(&grid, line.points[0]));
        assert!(on_boundary(&grid, line.points[2]));
    }

    #[test]
    fn saddle_resolved_by_center_value() {
        let grid = unit_grid(2, 2);
        // bl, br, tl, tr in grid order.
        let field = FieldSample::from_raw([1.0, 0.0, 0.0, 1.0]);

        // Center mean 0.5 is above 0.5: bl and tr are joined, br and tl cut off.
        let lines = trace_isolines(&grid, &field, 0.5);
        assert!(lines.len() == 2);
        assert!(lines.iter().all(|l| !l.closed && l.points.len() == 2));
        assert!(lines[0].points.contains(&(0.5, 0.0)));
        assert!(lines[0].points.contains(&(1.0, 0.5)));

        // Center mean 0.5 is below 0.6: bl and tr are cut off.
        let lines = trace_isolines(&grid, &field, 0.6);
        assert!(lines.len() == 2);
        assert!(lines[0].points.contains(&(0.0, 0.4)));
        assert!(lines[0].points.contains(&(0.4, 0.0)));
    }

    #[test]
    fn isolines_close_or_end_on_boundary() {
        let grid = Grid {
            origin: (-3.0, -3.0),
            spacing: 0.2,
            nx: 31,
            ny: 31,
        };
        let field = sample(&grid, |x, y| (1.3 * x).sin() * (0.9 * y).cos() + 0.1 * x);
        let levels = Levels::new(vec![-0.75, -0.3, 0.0, 0.2, 0.6]).unwrap();

        let lines = trace_all_isolines(&grid, &field, &levels);
        assert!(!lines.is_empty());

        for line in &lines {
            assert!(line.points.len() >= 2);
            match line.closed {
                true => assert!(line.points.first() == line.points.last()),
                false => {
                    assert!(on_boundary(&grid, line.points[0]));
                    assert!(on_boundary(&grid, line.points[line.points.len() - 1]));
                }
            }
        }

        let mut previous = f64::NEG_INFINITY;
        for line in &lines {
            assert!(line.level >= previous);
            previous = line.level;
        }
    }

    #[test]
    fn bowl_contours_are_all_closed() {
        let grid = Grid {
            origin: (-5.0, -5.0),
            spacing: 0.25,
            nx: 41,
            ny: 41,
        };
        let field = sample(&grid, |x, y| x * x + 0.5 * y * y);
        let levels = Levels::new(vec![1.0, 2.5, 4.0, 9.0]).unwrap();

        let lines = trace_all_isolines(&grid, &field, &levels);
        assert!(lines.len() == 4);
        assert!(lines.iter().all(|l| l.closed && l.points.first() == l.points.last()));
    }

    #[test]
    fn cells_with_missing_corners_are_skipped() {
        let grid = unit_grid(3, 2);
        let mut values: Vec<Option<f64>> = (0..grid.num_nodes())
            .map(|k| Some(grid.node(k).0))
            .collect();
        // Remove the bottom right node, disabling the right hand cell.
        values[2] = None;
        let field = FieldSample::new(values);

        assert!(trace_isolines(&grid, &field, 1.5).is_empty());

        let lines = trace_isolines(&grid, &field, 0.5);
        assert!(lines.len() == 1);
        assert!(!lines[0].closed);
    }

    #[test]
    fn tracing_is_deterministic() {
        let grid = unit_grid(25, 19);
        let field = sample(&grid, |x, y| (0.4 * x).cos() + (0.55 * y).sin());
        let levels = Levels::new(vec![-1.0, -0.5, 0.0, 0.5, 1.0]).unwrap();

        let first = trace_all_isolines(&grid, &field, &levels);
        let second = trace_all_isolines(&grid, &field, &levels);
        assert!(first == second);
    }
}
