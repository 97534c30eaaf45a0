use agrisentinel::io::synthetic::SyntheticScene;
use agrisentinel::types::{BoundingBox, Parcel, Severity};
use agrisentinel::{HealthPipeline, PipelineConfig};
use chrono::NaiveDate;
use geojson::{GeoJson, Value};

fn run_report() -> agrisentinel::HealthReport {
    let mut parcel = Parcel::new(
        11,
        "Heatmap Field",
        vec![
            [-0.5, 51.0],
            [-0.4, 51.0],
            [-0.4, 51.08],
            [-0.5, 51.08],
            [-0.5, 51.0],
        ],
    );
    let bbox = BoundingBox {
        min_lon: -0.5,
        max_lon: -0.4,
        min_lat: 51.0,
        max_lat: 51.08,
    };
    let scene = SyntheticScene::generate(&bbox, (96, 96));
    let pipeline = HealthPipeline::new(
        PipelineConfig::default(),
        agrisentinel::ImageryClient::new().unwrap(),
    );
    let reference = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    pipeline.analyze_scene(&mut parcel, &scene, reference).unwrap()
}

#[test]
fn test_heatmap_serializes_as_valid_geojson() {
    let report = run_report();
    let serialized = serde_json::to_string(&report.heatmap).unwrap();

    let parsed: GeoJson = serialized.parse().expect("heatmap is not valid GeoJSON");
    match parsed {
        GeoJson::FeatureCollection(fc) => {
            assert_eq!(fc.features.len(), report.stats.total_zones);
        }
        _ => panic!("expected a FeatureCollection"),
    }
}

#[test]
fn test_heatmap_features_carry_full_property_set() {
    let report = run_report();

    for feature in &report.heatmap.features {
        let props = feature.properties.as_ref().expect("feature without properties");
        for key in ["health_score", "anomaly_score", "severity", "color", "grid_row", "grid_col"] {
            assert!(props.contains_key(key), "missing property {}", key);
        }

        let anomaly = props["anomaly_score"].as_f64().unwrap();
        let health = props["health_score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&anomaly));
        // Both rounded to 3 decimals independently
        assert!((anomaly + health - 1.0).abs() < 2e-3);

        // Severity label and color agree with the score
        let severity = Severity::from_score(anomaly as f32);
        assert_eq!(props["severity"], severity.as_str());
        assert_eq!(props["color"], severity.color());
    }
}

#[test]
fn test_heatmap_rings_are_closed_polygons() {
    let report = run_report();

    for feature in &report.heatmap.features {
        match &feature.geometry {
            Some(geometry) => match &geometry.value {
                Value::Polygon(rings) => {
                    let ring = &rings[0];
                    assert!(ring.len() >= 4);
                    assert_eq!(ring.first(), ring.last());
                }
                other => panic!("expected polygon, got {:?}", other),
            },
            None => panic!("feature without geometry"),
        }
    }
}

#[test]
fn test_severity_counts_match_features() {
    let report = run_report();

    let mut critical = 0usize;
    let mut warning = 0usize;
    let mut moderate = 0usize;
    let mut healthy = 0usize;
    for feature in &report.heatmap.features {
        let props = feature.properties.as_ref().unwrap();
        match props["severity"].as_str().unwrap() {
            "critical" => critical += 1,
            "warning" => warning += 1,
            "moderate" => moderate += 1,
            "healthy" => healthy += 1,
            other => panic!("unexpected severity {}", other),
        }
    }

    assert_eq!(critical, report.stats.critical_count);
    assert_eq!(warning, report.stats.warning_count);
    assert_eq!(moderate, report.stats.moderate_count);
    assert_eq!(healthy, report.stats.healthy_count);
}

#[test]
fn test_report_serializes_with_api_field_names() {
    let report = run_report();
    let payload = serde_json::to_value(&report).unwrap();

    assert!(payload["heatmap"]["features"].is_array());
    let stats = &payload["stats"];
    for key in [
        "total_zones",
        "healthy_count",
        "moderate_count",
        "warning_count",
        "critical_count",
        "avg_health",
    ] {
        assert!(stats[key].is_number(), "missing stats field {}", key);
    }
    assert!(payload["computed_at"].is_string());
}
