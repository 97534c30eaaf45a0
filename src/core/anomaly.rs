//! Statistical anomaly scoring for gridded parcel zones
//!
//! Each zone is scored against the parcel's own spectral baseline: the
//! per-feature mean/std across all zones. Zones far from that baseline
//! score high. Raw scores are min-max normalized to [0, 1] and oriented
//! so that high means unhealthy.

use crate::types::{HealthError, HealthResult};
use num_traits::Float;

/// Anomaly detector parameters
#[derive(Debug, Clone)]
pub struct AnomalyParams {
    /// Weight of the low-vegetation deficit term
    pub bias_weight: f32,
    /// Raw-score spread (combined z-units) that maps to the full [0, 1]
    /// output range; smaller spreads are scaled down proportionally
    pub reference_span: f32,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            bias_weight: 1.0,
            reference_span: 2.0,
        }
    }
}

/// Zone anomaly detector
pub struct AnomalyDetector {
    params: AnomalyParams,
}

impl AnomalyDetector {
    /// Create a detector with default parameters
    pub fn new() -> Self {
        Self {
            params: AnomalyParams::default(),
        }
    }

    /// Create a detector with custom parameters
    pub fn with_params(params: AnomalyParams) -> Self {
        Self { params }
    }

    /// Score zone feature vectors.
    ///
    /// The first feature of each vector must be the primary vegetation
    /// index mean; zones below the parcel median on that feature are
    /// biased toward higher scores. All vectors must share one length.
    pub fn score(&self, features: &[Vec<f32>]) -> HealthResult<Vec<f32>> {
        let n = features.len();
        if n == 0 {
            return Err(HealthError::Processing(
                "no zones to score".to_string(),
            ));
        }
        if n == 1 {
            return Ok(vec![0.0]);
        }

        let dims = features[0].len();
        if dims == 0 {
            return Err(HealthError::Processing(
                "empty feature vectors".to_string(),
            ));
        }
        if features.iter().any(|f| f.len() != dims) {
            return Err(HealthError::Processing(
                "zone feature vectors differ in length".to_string(),
            ));
        }

        log::debug!("Scoring {} zones with {} features each", n, dims);

        // Per-feature baseline across the parcel
        let mut means = vec![0.0f64; dims];
        for f in features {
            for (d, &v) in f.iter().enumerate() {
                means[d] += v as f64;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }

        let mut stds = vec![0.0f64; dims];
        for f in features {
            for (d, &v) in f.iter().enumerate() {
                let diff = v as f64 - means[d];
                stds[d] += diff * diff;
            }
        }
        for s in &mut stds {
            *s = (*s / n as f64).sqrt();
        }

        // Mean absolute z-score per zone; zero-variance features are inert
        let mut raw: Vec<f32> = features
            .iter()
            .map(|f| {
                let mut acc = 0.0f64;
                for d in 0..dims {
                    if stds[d] > 1e-12 {
                        acc += ((f[d] as f64 - means[d]) / stds[d]).abs();
                    }
                }
                (acc / dims as f64) as f32
            })
            .collect();

        self.apply_vegetation_bias(features, &mut raw);

        // Min-max normalize with spread gain, oriented high = unhealthy
        let span = normalize_scores(&mut raw, self.params.reference_span);
        log::debug!("Raw anomaly spread {:.4} across {} zones", span, n);

        Ok(raw)
    }

    /// Push zones with below-median primary index toward higher scores.
    ///
    /// Encodes the vegetation orientation: sparse canopy ranks as less
    /// healthy even when its z-distance matches a lush outlier.
    fn apply_vegetation_bias(&self, features: &[Vec<f32>], raw: &mut [f32]) {
        let mut primary: Vec<f32> = features.iter().map(|f| f[0]).collect();
        primary.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = primary.len();
        let median = if n % 2 == 0 {
            (primary[n / 2 - 1] + primary[n / 2]) / 2.0
        } else {
            primary[n / 2]
        };
        let range = primary[n - 1] - primary[0];
        if range <= 1e-9 {
            return;
        }

        for (score, f) in raw.iter_mut().zip(features) {
            let deficit = (median - f[0]).max(0.0) / range;
            *score += self.params.bias_weight * deficit;
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Min-max normalize scores in place with a spread gain.
///
/// Pure min-max maps some zone to 1.0 on every run; scaling by the raw
/// spread against `reference_span` keeps near-uniform parcels low while
/// strongly anomalous parcels still reach 1.0. Returns the raw spread.
pub fn normalize_scores<T: Float>(scores: &mut [T], reference_span: T) -> T {
    let mut min = T::infinity();
    let mut max = T::neg_infinity();
    for &s in scores.iter() {
        min = min.min(s);
        max = max.max(s);
    }

    let span = max - min;
    if span <= T::epsilon() {
        for s in scores.iter_mut() {
            *s = T::zero();
        }
        return T::zero();
    }

    let gain = (span / reference_span).min(T::one());
    for s in scores.iter_mut() {
        *s = (*s - min) / span * gain;
    }
    span
}
