//! Analysis pipeline orchestration
//!
//! Runs the full chain for one parcel: acquire composite imagery, compute
//! spectral indices, grid the parcel, score anomalies, classify severity,
//! render the heatmap, and evaluate alerts.

use crate::core::alerts::AlertEngine;
use crate::core::anomaly::AnomalyDetector;
use crate::core::geometry;
use crate::core::grid::{GridParams, ParcelGrid};
use crate::core::heatmap::HeatmapBuilder;
use crate::core::indices::{IndexProcessor, SpectralIndexKind};
use crate::core::severity::{compute_statistics, HealthStatistics};
use crate::io::imagery::ImageryClient;
use crate::io::synthetic::SyntheticScene;
use crate::types::{Alert, BoundingBox, HealthResult, Parcel, Scene};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::HashMap;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub grid: GridParams,
    /// Primary index driving the health scores
    pub index: SpectralIndexKind,
    /// Acquisition window length ending at the reference date
    pub date_range_days: i64,
    /// Fall back to the synthetic scene source when the catalog fails
    pub fallback_to_synthetic: bool,
    /// Raster size requested from the synthetic source (rows, cols)
    pub raster_size: (usize, usize),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridParams::default(),
            index: SpectralIndexKind::Ndvi,
            date_range_days: 365,
            fallback_to_synthetic: true,
            raster_size: (96, 96),
        }
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub parcel_id: u64,
    pub scene_id: String,
    pub heatmap: FeatureCollection,
    pub stats: HealthStatistics,
    pub alerts: Vec<Alert>,
    pub reference_date: NaiveDate,
    pub computed_at: DateTime<Utc>,
}

/// Crop health analysis pipeline
pub struct HealthPipeline {
    config: PipelineConfig,
    imagery: ImageryClient,
    indices: IndexProcessor,
    detector: AnomalyDetector,
}

impl HealthPipeline {
    /// Create a pipeline with the given configuration and imagery client
    pub fn new(config: PipelineConfig, imagery: ImageryClient) -> Self {
        Self {
            config,
            imagery,
            indices: IndexProcessor::new(),
            detector: AnomalyDetector::new(),
        }
    }

    /// Create a pipeline with default configuration
    pub fn with_defaults() -> HealthResult<Self> {
        Ok(Self::new(PipelineConfig::default(), ImageryClient::new()?))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full analysis for a parcel.
    ///
    /// The acquisition window ends at `reference_date` (today when None).
    /// On success the parcel's `last_computed_at` is stamped.
    pub fn analyze(
        &self,
        parcel: &mut Parcel,
        reference_date: Option<NaiveDate>,
    ) -> HealthResult<HealthReport> {
        let ring = parcel.exterior();
        geometry::validate_ring(&ring)?;
        let bbox = geometry::bounding_box(&ring)?;

        let reference = reference_date.unwrap_or_else(|| Utc::now().date_naive());
        let start = reference - Duration::days(self.config.date_range_days);

        let center = geometry::ring_centroid(&ring);
        log::info!(
            "Analyzing parcel '{}' ({:.2} ha at {:.4}, {:.4}), window {} to {}",
            parcel.name,
            geometry::ring_area_hectares(&ring),
            center.x,
            center.y,
            start,
            reference
        );

        let scene = self.acquire(&bbox, start, reference)?;
        self.analyze_scene(parcel, &scene, reference)
    }

    /// Run the analysis against an already-acquired scene.
    pub fn analyze_scene(
        &self,
        parcel: &mut Parcel,
        scene: &Scene,
        reference_date: NaiveDate,
    ) -> HealthResult<HealthReport> {
        let ring = parcel.exterior();
        geometry::validate_ring(&ring)?;
        let bbox = geometry::bounding_box(&ring)?;

        log::info!(
            "Scoring parcel '{}' against scene {} ({:.1}% cloud)",
            parcel.name,
            scene.id,
            scene.cloud_cover
        );

        // The scene raster is assumed to cover the parcel bounding box
        let lon_tol = bbox.width() * 0.01;
        let lat_tol = bbox.height() * 0.01;
        if (scene.bounds.min_lon - bbox.min_lon).abs() > lon_tol
            || (scene.bounds.max_lon - bbox.max_lon).abs() > lon_tol
            || (scene.bounds.min_lat - bbox.min_lat).abs() > lat_tol
            || (scene.bounds.max_lat - bbox.max_lat).abs() > lat_tol
        {
            log::warn!(
                "Scene {} bounds differ from parcel bounding box, zones may misalign",
                scene.id
            );
        }

        let primary = self.indices.compute(scene, self.config.index)?;

        // NDWI rides along as a moisture feature when the bands allow it
        let secondary = match self.indices.compute(scene, SpectralIndexKind::Ndwi) {
            Ok(raster) => Some(raster),
            Err(e) => {
                log::warn!("Skipping moisture feature: {}", e);
                None
            }
        };

        let grid = ParcelGrid::build(&bbox, &ring, primary.dim(), &self.config.grid)?;
        let cells = grid.aggregate(&primary)?;
        if cells.is_empty() {
            return Err(crate::types::HealthError::Processing(
                "no scorable zones in parcel".to_string(),
            ));
        }

        let secondary_means: HashMap<(usize, usize), f32> = match &secondary {
            Some(raster) => grid
                .aggregate(raster)?
                .into_iter()
                .map(|c| ((c.row, c.col), c.mean))
                .collect(),
            None => HashMap::new(),
        };
        let secondary_fill = if secondary_means.is_empty() {
            0.0
        } else {
            secondary_means.values().sum::<f32>() / secondary_means.len() as f32
        };

        let features: Vec<Vec<f32>> = cells
            .iter()
            .map(|c| {
                let mut f = vec![c.mean, c.std_dev, c.max - c.min];
                if secondary.is_some() {
                    f.push(
                        secondary_means
                            .get(&(c.row, c.col))
                            .copied()
                            .unwrap_or(secondary_fill),
                    );
                }
                f
            })
            .collect();

        let scores = self.detector.score(&features)?;
        let stats = compute_statistics(&scores);

        log::info!(
            "Scored {} zones: {} healthy, {} moderate, {} warning, {} critical (avg health {:.3})",
            stats.total_zones,
            stats.healthy_count,
            stats.moderate_count,
            stats.warning_count,
            stats.critical_count,
            stats.avg_health
        );

        let heatmap = HeatmapBuilder::from_grid(&ring, &cells, &scores)?;
        let alerts = AlertEngine::evaluate(parcel, &stats);

        let computed_at = Utc::now();
        parcel.last_computed_at = Some(computed_at);

        Ok(HealthReport {
            parcel_id: parcel.id,
            scene_id: scene.id.clone(),
            heatmap,
            stats,
            alerts,
            reference_date,
            computed_at,
        })
    }

    /// Acquire composite imagery, falling back to the synthetic source.
    fn acquire(
        &self,
        bbox: &BoundingBox,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HealthResult<Scene> {
        match self.imagery.fetch_composite(bbox, start, end) {
            Ok(scene) => Ok(scene),
            Err(e) if self.config.fallback_to_synthetic => {
                log::warn!("Imagery acquisition failed: {}. Using synthetic scene", e);
                Ok(SyntheticScene::generate(bbox, self.config.raster_size))
            }
            Err(e) => Err(e),
        }
    }
}
