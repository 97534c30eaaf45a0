//! Alert evaluation for completed analysis runs

use crate::core::severity::HealthStatistics;
use crate::types::{Alert, AlertLevel, Parcel};
use chrono::Utc;

/// Alert rule evaluator
pub struct AlertEngine;

impl AlertEngine {
    /// Evaluate alert rules against a parcel's run statistics.
    ///
    /// A critical alert is raised whenever any zone is critical. When no
    /// zone is critical but a majority of zones sit at warning level or
    /// above, a single warning alert is raised instead.
    pub fn evaluate(parcel: &Parcel, stats: &HealthStatistics) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if stats.total_zones == 0 {
            return alerts;
        }

        if stats.critical_count > 0 {
            log::warn!(
                "{} critical zones detected in parcel '{}'",
                stats.critical_count,
                parcel.name
            );
            alerts.push(Alert {
                parcel_id: parcel.id,
                severity: AlertLevel::Critical,
                message: format!(
                    "Detected {} critical health zones in {}",
                    stats.critical_count, parcel.name
                ),
                created_at: Utc::now(),
            });
        } else if stats.stressed_count() * 2 > stats.total_zones {
            alerts.push(Alert {
                parcel_id: parcel.id,
                severity: AlertLevel::Warning,
                message: format!(
                    "Elevated stress in {} of {} zones in {}",
                    stats.stressed_count(),
                    stats.total_zones,
                    parcel.name
                ),
                created_at: Utc::now(),
            });
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::severity::compute_statistics;

    fn parcel() -> Parcel {
        Parcel::new(
            7,
            "North Field",
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
        )
    }

    #[test]
    fn test_critical_alert_message() {
        let stats = compute_statistics(&[0.1, 0.8, 0.9]);
        let alerts = AlertEngine::evaluate(&parcel(), &stats);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertLevel::Critical);
        assert_eq!(alerts[0].parcel_id, 7);
        assert_eq!(
            alerts[0].message,
            "Detected 2 critical health zones in North Field"
        );
    }

    #[test]
    fn test_healthy_parcel_raises_nothing() {
        let stats = compute_statistics(&[0.1, 0.2, 0.25]);
        assert!(AlertEngine::evaluate(&parcel(), &stats).is_empty());
    }

    #[test]
    fn test_widespread_warning_without_critical() {
        // Three of four zones at warning level, none critical
        let stats = compute_statistics(&[0.6, 0.65, 0.7, 0.2]);
        let alerts = AlertEngine::evaluate(&parcel(), &stats);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertLevel::Warning);
        assert!(alerts[0].message.contains("3 of 4 zones"));
    }

    #[test]
    fn test_empty_stats_raise_nothing() {
        let stats = compute_statistics(&[]);
        assert!(AlertEngine::evaluate(&parcel(), &stats).is_empty());
    }
}
