use chrono::{DateTime, Utc};
use geo::Coord;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Real-valued reflectance or index data
pub type BandValue = f32;

/// 2D single-band raster (rows x cols, north-up)
pub type BandImage = Array2<BandValue>;

/// Spectral bands used by the vegetation and water indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralBand {
    Blue,
    Green,
    Red,
    RedEdge,
    Nir,
    Swir,
}

impl SpectralBand {
    /// All bands the imagery catalog is asked for by default
    pub fn all() -> Vec<SpectralBand> {
        vec![
            SpectralBand::Blue,
            SpectralBand::Green,
            SpectralBand::Red,
            SpectralBand::RedEdge,
            SpectralBand::Nir,
            SpectralBand::Swir,
        ]
    }

    /// Asset key used by the scene catalog for this band
    pub fn asset_key(&self) -> &'static str {
        match self {
            SpectralBand::Blue => "blue",
            SpectralBand::Green => "green",
            SpectralBand::Red => "red",
            SpectralBand::RedEdge => "rededge",
            SpectralBand::Nir => "nir",
            SpectralBand::Swir => "swir",
        }
    }
}

impl std::fmt::Display for SpectralBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.asset_key())
    }
}

/// Geospatial bounding box in lon/lat degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when the box spans a non-empty area
    pub fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Health severity band for a scored zone
///
/// Thresholds on the anomaly score (higher = worse health):
/// healthy <= 0.3 < moderate <= 0.5 < warning <= 0.7 < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Moderate,
    Warning,
    Critical,
}

impl Severity {
    /// Classify an anomaly score in [0, 1]
    pub fn from_score(score: f32) -> Severity {
        if score > 0.7 {
            Severity::Critical
        } else if score > 0.5 {
            Severity::Warning
        } else if score > 0.3 {
            Severity::Moderate
        } else {
            Severity::Healthy
        }
    }

    /// Map color used in heatmap rendering
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Healthy => "#91cf60",
            Severity::Moderate => "#fee090",
            Severity::Warning => "#fc8d59",
            Severity::Critical => "#d73027",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Moderate => "moderate",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity level of an alert record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A registered land parcel
///
/// The exterior ring is stored as closed `[lon, lat]` positions in
/// GeoJSON order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub ring: Vec<[f64; 2]>,
    pub created_at: DateTime<Utc>,
    pub last_computed_at: Option<DateTime<Utc>>,
}

impl Parcel {
    /// Create a parcel from an exterior ring
    pub fn new(id: u64, name: impl Into<String>, ring: Vec<[f64; 2]>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            ring,
            created_at: Utc::now(),
            last_computed_at: None,
        }
    }

    /// Exterior ring as coordinate structs for the geometry kernels
    pub fn exterior(&self) -> Vec<Coord<f64>> {
        self.ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect()
    }
}

/// Alert raised for a parcel after an analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub parcel_id: u64,
    pub severity: AlertLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A composited multispectral acquisition over a bounding box
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub platform: String,
    pub acquired: DateTime<Utc>,
    /// Cloud cover percentage of the least cloudy contributing scene
    pub cloud_cover: f32,
    pub bounds: BoundingBox,
    /// (lon, lat) degrees per pixel
    pub pixel_spacing: (f64, f64),
    pub bands: HashMap<SpectralBand, BandImage>,
}

impl Scene {
    /// Fetch a band raster, failing when the scene does not carry it
    pub fn band(&self, band: SpectralBand) -> HealthResult<&BandImage> {
        self.bands.get(&band).ok_or_else(|| {
            HealthError::Processing(format!("band {} not present in scene {}", band, self.id))
        })
    }

    /// Raster dimensions (rows, cols), checked for cross-band consistency
    pub fn dimensions(&self) -> HealthResult<(usize, usize)> {
        let mut dims: Option<(usize, usize)> = None;
        for (band, image) in &self.bands {
            match dims {
                None => dims = Some(image.dim()),
                Some(d) if d != image.dim() => {
                    return Err(HealthError::Processing(format!(
                        "band {} dimensions {:?} differ from {:?} in scene {}",
                        band,
                        image.dim(),
                        d,
                        self.id
                    )));
                }
                Some(_) => {}
            }
        }
        dims.ok_or_else(|| HealthError::Processing(format!("scene {} carries no bands", self.id)))
    }
}

/// Error types for crop health processing
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Imagery error: {0}")]
    Imagery(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

/// Result type for crop health operations
pub type HealthResult<T> = Result<T, HealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::from_score(0.0), Severity::Healthy);
        assert_eq!(Severity::from_score(0.3), Severity::Healthy);
        assert_eq!(Severity::from_score(0.31), Severity::Moderate);
        assert_eq!(Severity::from_score(0.5), Severity::Moderate);
        assert_eq!(Severity::from_score(0.51), Severity::Warning);
        assert_eq!(Severity::from_score(0.7), Severity::Warning);
        assert_eq!(Severity::from_score(0.71), Severity::Critical);
        assert_eq!(Severity::from_score(1.0), Severity::Critical);
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Healthy.color(), "#91cf60");
        assert_eq!(Severity::Critical.color(), "#d73027");
    }

    #[test]
    fn test_bounding_box_validity() {
        let bbox = BoundingBox {
            min_lon: 10.0,
            max_lon: 10.1,
            min_lat: 45.0,
            max_lat: 45.1,
        };
        assert!(bbox.is_valid());
        assert!(bbox.contains(10.05, 45.05));
        assert!(!bbox.contains(10.2, 45.05));

        let degenerate = BoundingBox {
            min_lon: 10.0,
            max_lon: 10.0,
            min_lat: 45.0,
            max_lat: 45.1,
        };
        assert!(!degenerate.is_valid());
    }

    #[test]
    fn test_scene_dimension_mismatch() {
        let mut bands = HashMap::new();
        bands.insert(SpectralBand::Red, Array2::zeros((4, 4)));
        bands.insert(SpectralBand::Nir, Array2::zeros((4, 5)));
        let scene = Scene {
            id: "test".to_string(),
            platform: "test".to_string(),
            acquired: Utc::now(),
            cloud_cover: 0.0,
            bounds: BoundingBox {
                min_lon: 0.0,
                max_lon: 1.0,
                min_lat: 0.0,
                max_lat: 1.0,
            },
            pixel_spacing: (0.25, 0.25),
            bands,
        };
        assert!(scene.dimensions().is_err());
    }
}
