//! Core crop health processing modules

pub mod alerts;
pub mod anomaly;
pub mod geometry;
pub mod grid;
pub mod heatmap;
pub mod indices;
pub mod pipeline;
pub mod severity;

// Re-export main types
pub use alerts::AlertEngine;
pub use anomaly::{AnomalyDetector, AnomalyParams};
pub use grid::{CellSummary, GridCell, GridParams, ParcelGrid};
pub use heatmap::HeatmapBuilder;
pub use indices::{IndexParams, IndexProcessor, SpectralIndexKind};
pub use pipeline::{HealthPipeline, HealthReport, PipelineConfig};
pub use severity::{classify, compute_statistics, HealthStatistics};
