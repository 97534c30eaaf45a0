use agrisentinel::core::indices::{IndexProcessor, SpectralIndexKind};
use agrisentinel::io::synthetic::SyntheticScene;
use agrisentinel::types::BoundingBox;

fn bbox() -> BoundingBox {
    BoundingBox {
        min_lon: 23.5,
        max_lon: 23.6,
        min_lat: -5.1,
        max_lat: -5.0,
    }
}

#[test]
fn test_same_bbox_same_composite() {
    let a = SyntheticScene::generate(&bbox(), (64, 64));
    let b = SyntheticScene::generate(&bbox(), (64, 64));

    assert_eq!(a.id, b.id);
    assert_eq!(a.bands.len(), b.bands.len());
    for (band, image) in &a.bands {
        assert_eq!(image, &b.bands[band], "band {} differs between runs", band);
    }
}

#[test]
fn test_ndvi_over_synthetic_is_plausible() {
    let scene = SyntheticScene::generate(&bbox(), (64, 64));
    let ndvi = IndexProcessor::new()
        .compute(&scene, SpectralIndexKind::Ndvi)
        .unwrap();

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    for &v in ndvi.iter() {
        assert!(v.is_finite());
        assert!((-1.0..=1.0).contains(&v));
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
    }
    let mean = sum / ndvi.len() as f64;

    // Mostly vegetated field with localized stress pockets
    assert!(mean > 0.1, "mean NDVI {} too low", mean);
    assert!(max - min > 0.05, "field has no spatial variation");
}

#[test]
fn test_all_indices_computable() {
    let scene = SyntheticScene::generate(&bbox(), (32, 32));
    let processor = IndexProcessor::new();

    for kind in [
        SpectralIndexKind::Ndvi,
        SpectralIndexKind::Ndwi,
        SpectralIndexKind::Savi,
        SpectralIndexKind::Evi,
        SpectralIndexKind::Gndvi,
        SpectralIndexKind::Ndre,
    ] {
        let index = processor.compute(&scene, kind).unwrap();
        assert_eq!(index.dim(), (32, 32));
    }
}

#[test]
fn test_scene_metadata() {
    let scene = SyntheticScene::generate(&bbox(), (48, 24));
    assert_eq!(scene.dimensions().unwrap(), (48, 24));
    assert_eq!(scene.cloud_cover, 0.0);
    assert_eq!(scene.bounds, bbox());
    assert!((scene.pixel_spacing.0 - 0.1 / 24.0).abs() < 1e-12);
    assert!((scene.pixel_spacing.1 - 0.1 / 48.0).abs() < 1e-12);
}
