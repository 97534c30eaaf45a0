//! AgriSentinel: A Fast, Modular Crop Health Anomaly Processor
//!
//! This library analyzes registered land parcels from multispectral
//! imagery: it composites scenes from a catalog API (or a deterministic
//! synthetic source), computes vegetation indices, grids each parcel into
//! zones, scores zone anomalies against the parcel's own baseline, and
//! renders the result as a GeoJSON heatmap with summary statistics and
//! alerts for critical zones.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    Alert, AlertLevel, BandImage, BandValue, BoundingBox, HealthError, HealthResult, Parcel,
    Scene, Severity, SpectralBand,
};

pub use core::{
    compute_statistics, AlertEngine, AnomalyDetector, GridParams, HealthPipeline, HealthReport,
    HealthStatistics, HeatmapBuilder, IndexProcessor, ParcelGrid, PipelineConfig,
    SpectralIndexKind,
};

pub use io::{ImageryClient, ImageryParams, ParcelStore, SyntheticScene};
