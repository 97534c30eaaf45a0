//! Spectral vegetation and water indices
//!
//! Per-pixel indices computed from a composited scene. All kernels leave
//! NaN where a denominator degenerates so downstream aggregation can skip
//! the pixel.

use crate::types::{BandImage, HealthResult, Scene, SpectralBand};
use ndarray::Zip;

/// Denominator guard shared by the ratio kernels
const DENOM_EPS: f32 = 1e-8;

/// Supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectralIndexKind {
    /// Normalized Difference Vegetation Index: (NIR - Red) / (NIR + Red)
    Ndvi,
    /// Normalized Difference Water Index (McFeeters): (Green - NIR) / (Green + NIR)
    Ndwi,
    /// Soil Adjusted Vegetation Index (Huete)
    Savi,
    /// Enhanced Vegetation Index
    Evi,
    /// Green NDVI: (NIR - Green) / (NIR + Green)
    Gndvi,
    /// Normalized Difference Red Edge: (NIR - RedEdge) / (NIR + RedEdge)
    Ndre,
}

impl std::fmt::Display for SpectralIndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpectralIndexKind::Ndvi => "NDVI",
            SpectralIndexKind::Ndwi => "NDWI",
            SpectralIndexKind::Savi => "SAVI",
            SpectralIndexKind::Evi => "EVI",
            SpectralIndexKind::Gndvi => "GNDVI",
            SpectralIndexKind::Ndre => "NDRE",
        };
        write!(f, "{}", name)
    }
}

/// Index computation parameters
#[derive(Debug, Clone)]
pub struct IndexParams {
    /// SAVI soil brightness correction factor
    pub savi_l: f32,
    /// EVI gain
    pub evi_gain: f32,
    /// EVI aerosol resistance coefficients (red, blue)
    pub evi_c1: f32,
    pub evi_c2: f32,
    /// EVI canopy background adjustment
    pub evi_l: f32,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            savi_l: 0.5,
            evi_gain: 2.5,
            evi_c1: 6.0,
            evi_c2: 7.5,
            evi_l: 1.0,
        }
    }
}

/// Normalized difference between two bands: (a - b) / (a + b).
///
/// Output is NaN where either input is non-finite or the sum falls
/// below the denominator guard.
pub fn normalized_difference(a: &BandImage, b: &BandImage) -> BandImage {
    let mut out = BandImage::from_elem(a.dim(), f32::NAN);
    Zip::from(&mut out).and(a).and(b).par_for_each(|o, &x, &y| {
        if x.is_finite() && y.is_finite() {
            let sum = x + y;
            if sum.abs() > DENOM_EPS {
                *o = (x - y) / sum;
            }
        }
    });
    out
}

/// Spectral index processor
pub struct IndexProcessor {
    params: IndexParams,
}

impl IndexProcessor {
    /// Create a processor with default parameters
    pub fn new() -> Self {
        Self {
            params: IndexParams::default(),
        }
    }

    /// Create a processor with custom parameters
    pub fn with_params(params: IndexParams) -> Self {
        Self { params }
    }

    /// Compute one index over the scene
    pub fn compute(&self, scene: &Scene, kind: SpectralIndexKind) -> HealthResult<BandImage> {
        log::debug!("Computing {} for scene {}", kind, scene.id);
        scene.dimensions()?;

        let index = match kind {
            SpectralIndexKind::Ndvi => normalized_difference(
                scene.band(SpectralBand::Nir)?,
                scene.band(SpectralBand::Red)?,
            ),
            SpectralIndexKind::Ndwi => normalized_difference(
                scene.band(SpectralBand::Green)?,
                scene.band(SpectralBand::Nir)?,
            ),
            SpectralIndexKind::Gndvi => normalized_difference(
                scene.band(SpectralBand::Nir)?,
                scene.band(SpectralBand::Green)?,
            ),
            SpectralIndexKind::Ndre => normalized_difference(
                scene.band(SpectralBand::Nir)?,
                scene.band(SpectralBand::RedEdge)?,
            ),
            SpectralIndexKind::Savi => self.savi(
                scene.band(SpectralBand::Nir)?,
                scene.band(SpectralBand::Red)?,
            ),
            SpectralIndexKind::Evi => self.evi(
                scene.band(SpectralBand::Nir)?,
                scene.band(SpectralBand::Red)?,
                scene.band(SpectralBand::Blue)?,
            ),
        };

        Ok(index)
    }

    /// SAVI = ((NIR - Red) / (NIR + Red + L)) * (1 + L)
    fn savi(&self, nir: &BandImage, red: &BandImage) -> BandImage {
        let l = self.params.savi_l;
        let mut out = BandImage::from_elem(nir.dim(), f32::NAN);
        Zip::from(&mut out).and(nir).and(red).par_for_each(|o, &n, &r| {
            if n.is_finite() && r.is_finite() {
                let denom = n + r + l;
                if denom.abs() > DENOM_EPS {
                    *o = (n - r) / denom * (1.0 + l);
                }
            }
        });
        out
    }

    /// EVI = G * (NIR - Red) / (NIR + C1*Red - C2*Blue + L)
    fn evi(&self, nir: &BandImage, red: &BandImage, blue: &BandImage) -> BandImage {
        let p = &self.params;
        let (gain, c1, c2, l) = (p.evi_gain, p.evi_c1, p.evi_c2, p.evi_l);
        let mut out = BandImage::from_elem(nir.dim(), f32::NAN);
        Zip::from(&mut out)
            .and(nir)
            .and(red)
            .and(blue)
            .par_for_each(|o, &n, &r, &b| {
                if n.is_finite() && r.is_finite() && b.is_finite() {
                    let denom = n + c1 * r - c2 * b + l;
                    if denom.abs() > DENOM_EPS {
                        *o = gain * (n - r) / denom;
                    }
                }
            });
        out
    }
}

impl Default for IndexProcessor {
    fn default() -> Self {
        Self::new()
    }
}
