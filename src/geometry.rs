use crate::error::{Result, SeagrassError};
use crate::projection::Projection;
use crate::types::{PlotPolygon, ProjectedPoint, Record};
use geo::{Coord, LineString, Polygon};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

/// Builds the square plot of side `grid_size` meters centered on `record`.
pub fn build_plot(record: &Record, projection: &Projection, grid_size: f64) -> Result<PlotPolygon> {
    let in_cell = |e: SeagrassError| match e {
        SeagrassError::Projection(msg) => {
            SeagrassError::Projection(format!("cell {}: {}", record.cell_id, msg))
        }
        other => other,
    };

    let center = projection
        .forward(record.latitude, record.longitude)
        .map_err(in_cell)?;
    let half = grid_size / 2.0;

    // SW, SE, NE, NW
    let offsets = [(-half, -half), (half, -half), (half, half), (-half, half)];
    let mut ring = Vec::with_capacity(offsets.len());
    for (de, dn) in offsets {
        let corner = ProjectedPoint {
            easting: center.easting + de,
            northing: center.northing + dn,
        };
        let (lat, lon) = projection.inverse(corner).map_err(in_cell)?;
        ring.push(Coord { x: lon, y: lat });
    }

    Ok(PlotPolygon {
        geometry: Polygon::new(LineString::from(ring), vec![]),
        center,
        side_meters: grid_size,
    })
}

/// Builds one plot per record, in input order.
///
/// Records are projected in parallel; the first failing record (in input
/// order) aborts the whole batch.
pub fn build_plots(records: &[Record], projection: &Projection, grid_size: f64) -> Result<Vec<PlotPolygon>> {
    let zone = projection.zone();
    let outside = records
        .iter()
        .filter(|r| !zone.covers(r.latitude, r.longitude))
        .count();
    if outside > 0 {
        tracing::warn!(
            "{} of {} records lie outside {}; plots there may be mislocated or distorted",
            outside,
            records.len(),
            zone
        );
    }

    let results: Vec<Result<PlotPolygon>> = records
        .par_iter()
        .map(|r| build_plot(r, projection, grid_size))
        .collect();
    let plots = results.into_iter().collect::<Result<Vec<_>>>()?;

    tracing::info!("Built {} plots of {} m in {}", plots.len(), grid_size, zone);
    Ok(plots)
}

struct PlotEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for PlotEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

// Shared edges come back from the projection round-trip a few nanometres apart.
const OVERLAP_TOLERANCE_M: f64 = 1e-6;

/// Pairs `(i, j)` with `i < j` whose plots share interior area.
///
/// Plots are compared as the axis-aligned squares they were built from in the
/// projection, so neighbours that only share an edge are not reported.
pub fn find_overlaps(plots: &[PlotPolygon]) -> Vec<(usize, usize)> {
    let envelopes: Vec<PlotEnvelope> = plots
        .iter()
        .enumerate()
        .map(|(index, plot)| {
            let half = plot.side_meters / 2.0;
            let c = plot.center;
            PlotEnvelope {
                index,
                aabb: AABB::from_corners(
                    [c.easting - half, c.northing - half],
                    [c.easting + half, c.northing + half],
                ),
            }
        })
        .collect();

    let tree = RTree::bulk_load(envelopes);
    let mut pairs = Vec::new();

    for candidate in tree.iter() {
        let a = &plots[candidate.index];
        for other in tree.locate_in_envelope_intersecting(&candidate.aabb) {
            if other.index <= candidate.index {
                continue;
            }
            let b = &plots[other.index];
            let reach = (a.side_meters + b.side_meters) / 2.0 - OVERLAP_TOLERANCE_M;
            let de = (a.center.easting - b.center.easting).abs();
            let dn = (a.center.northing - b.center.northing).abs();
            if de < reach && dn < reach {
                pairs.push((candidate.index, other.index));
            }
        }
    }

    pairs.sort_unstable();
    pairs
}
