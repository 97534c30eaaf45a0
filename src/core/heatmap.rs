//! Heatmap GeoJSON generation
//!
//! Renders scored zones as a GeoJSON FeatureCollection. Grid mode emits
//! one polygon per surviving zone, clipped to the parcel boundary; point
//! mode emits one point per scored sample.

use crate::core::geometry::clip_ring_to_bounds;
use crate::core::grid::CellSummary;
use crate::core::severity::round3;
use crate::types::{HealthError, HealthResult, Severity};
use geo::Coord;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Number};

/// Heatmap feature builder
pub struct HeatmapBuilder;

impl HeatmapBuilder {
    /// Build the grid-mode heatmap.
    ///
    /// `cells` and `scores` pair up in order; a zone whose clipped
    /// geometry collapses is skipped together with its score.
    pub fn from_grid(
        ring: &[Coord<f64>],
        cells: &[CellSummary],
        scores: &[f32],
    ) -> HealthResult<FeatureCollection> {
        if cells.len() != scores.len() {
            return Err(HealthError::Processing(format!(
                "{} zones but {} scores",
                cells.len(),
                scores.len()
            )));
        }

        let mut features = Vec::with_capacity(cells.len());

        for (cell, &score) in cells.iter().zip(scores) {
            let clipped = match clip_ring_to_bounds(ring, &cell.bounds) {
                Some(c) => c,
                None => {
                    log::debug!(
                        "Zone ({}, {}) clips to nothing, skipping",
                        cell.row,
                        cell.col
                    );
                    continue;
                }
            };

            let positions: Vec<Vec<f64>> = clipped.iter().map(|c| vec![c.x, c.y]).collect();
            let geometry = Geometry::new(Value::Polygon(vec![positions]));

            let mut properties = zone_properties(score);
            properties.insert(
                "grid_row".to_string(),
                serde_json::Value::Number(Number::from(cell.row as i64)),
            );
            properties.insert(
                "grid_col".to_string(),
                serde_json::Value::Number(Number::from(cell.col as i64)),
            );
            if let Some(number) = Number::from_f64(round3(cell.mean as f64)) {
                properties.insert("mean_index".to_string(), serde_json::Value::Number(number));
            }

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        log::info!("Heatmap carries {} zone features", features.len());

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Build the point-mode heatmap for per-sample scores.
    pub fn from_points(
        points: &[[f64; 2]],
        scores: &[f32],
    ) -> HealthResult<FeatureCollection> {
        if points.len() != scores.len() {
            return Err(HealthError::Processing(format!(
                "{} points but {} scores",
                points.len(),
                scores.len()
            )));
        }

        let features = points
            .iter()
            .zip(scores)
            .map(|(p, &score)| Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![p[0], p[1]]))),
                id: None,
                properties: Some(zone_properties(score)),
                foreign_members: None,
            })
            .collect();

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

/// Shared property set for one scored zone or sample
fn zone_properties(score: f32) -> Map<String, serde_json::Value> {
    let severity = Severity::from_score(score);
    let mut properties = Map::new();

    if let Some(number) = Number::from_f64(round3(1.0 - score as f64)) {
        properties.insert("health_score".to_string(), serde_json::Value::Number(number));
    }
    if let Some(number) = Number::from_f64(round3(score as f64)) {
        properties.insert(
            "anomaly_score".to_string(),
            serde_json::Value::Number(number),
        );
    }
    properties.insert(
        "severity".to_string(),
        serde_json::Value::String(severity.as_str().to_string()),
    );
    properties.insert(
        "color".to_string(),
        serde_json::Value::String(severity.color().to_string()),
    );

    properties
}
