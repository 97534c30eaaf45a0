//! Severity classification and summary statistics

use crate::types::Severity;
use serde::{Deserialize, Serialize};

/// Round to three decimals for report payloads
pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Classify each anomaly score into a severity band
pub fn classify(scores: &[f32]) -> Vec<Severity> {
    scores.iter().map(|&s| Severity::from_score(s)).collect()
}

/// Summary statistics for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatistics {
    pub total_zones: usize,
    pub healthy_count: usize,
    pub moderate_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    /// Mean health in [0, 1], high = healthy, rounded to 3 decimals
    pub avg_health: f64,
}

impl HealthStatistics {
    /// All-zero record for an empty score set
    pub fn empty() -> Self {
        Self {
            total_zones: 0,
            healthy_count: 0,
            moderate_count: 0,
            warning_count: 0,
            critical_count: 0,
            avg_health: 0.0,
        }
    }

    /// Zones at warning level or above
    pub fn stressed_count(&self) -> usize {
        self.warning_count + self.critical_count
    }
}

/// Compute summary statistics from anomaly scores.
///
/// `avg_health` inverts the mean anomaly score so that 1.0 reads as a
/// fully healthy parcel.
pub fn compute_statistics(scores: &[f32]) -> HealthStatistics {
    if scores.is_empty() {
        return HealthStatistics::empty();
    }

    let mut stats = HealthStatistics::empty();
    stats.total_zones = scores.len();

    for &score in scores {
        match Severity::from_score(score) {
            Severity::Healthy => stats.healthy_count += 1,
            Severity::Moderate => stats.moderate_count += 1,
            Severity::Warning => stats.warning_count += 1,
            Severity::Critical => stats.critical_count += 1,
        }
    }

    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
    stats.avg_health = round3(1.0 - mean);

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_scores() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats, HealthStatistics::empty());
    }

    #[test]
    fn test_counts_per_band() {
        let scores = [0.1, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.95];
        let stats = compute_statistics(&scores);
        assert_eq!(stats.total_zones, 8);
        assert_eq!(stats.healthy_count, 2); // 0.1, 0.3
        assert_eq!(stats.moderate_count, 2); // 0.4, 0.5
        assert_eq!(stats.warning_count, 2); // 0.6, 0.7
        assert_eq!(stats.critical_count, 2); // 0.8, 0.95
        assert_eq!(
            stats.healthy_count + stats.moderate_count + stats.warning_count
                + stats.critical_count,
            stats.total_zones
        );
    }

    #[test]
    fn test_avg_health_inversion() {
        let stats = compute_statistics(&[0.2, 0.4]);
        assert_relative_eq!(stats.avg_health, 0.7);
    }

    #[test]
    fn test_avg_health_rounding() {
        let stats = compute_statistics(&[0.1234, 0.1234, 0.1234]);
        assert_relative_eq!(stats.avg_health, 0.877);
    }

    #[test]
    fn test_classify_matches_counts() {
        let scores = [0.0, 0.45, 0.65, 0.9];
        let severities = classify(&scores);
        assert_eq!(
            severities,
            vec![
                Severity::Healthy,
                Severity::Moderate,
                Severity::Warning,
                Severity::Critical
            ]
        );
    }
}
