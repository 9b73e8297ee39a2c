//! Configuration Tests
//!
//! Tests for:
//! - Parsing a full viewer document and falling back to defaults
//! - Range validation of HDRI and lighting parameters
//! - Model lookup and per-model quality overrides

use valevision::config::{DiscoveryConventions, PipelineSettings, ViewerConfig};
use valevision::effects::QualityTier;
use valevision::errors::VisionError;

const DOCUMENT: &str = r#"{
    "transport_root": "https://cdn.example.com/models/",
    "quality": "high",
    "models": [
        {
            "id": "villa",
            "base": "Villa",
            "textures": ["Villa_diffuse.png"],
            "lighting": {
                "hdri": { "url": "studio.env", "brightness": 1.5, "rotation_degrees": 180 },
                "directional_intensity": 2.0
            },
            "effects": { "hdri": true, "ssao": true },
            "quality": "low",
            "ground_meshes": ["Lawn"]
        },
        { "id": "shed" }
    ]
}"#;

fn expect_config_error(json: &str) -> String {
    match ViewerConfig::from_json_str(json) {
        Err(VisionError::Config(message)) => message,
        other => panic!("expected a config error, got {other:?}"),
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn full_document_parses() {
    let config = ViewerConfig::from_json_str(DOCUMENT).unwrap();

    assert_eq!(config.quality, QualityTier::High);
    assert_eq!(config.models.len(), 2);

    let villa = config.model("villa").unwrap();
    assert_eq!(villa.base_name(), "Villa");
    assert_eq!(villa.textures.as_deref(), Some(&["Villa_diffuse.png".to_string()][..]));
    assert!(villa.overlays.is_none());
    assert!(villa.effects.hdri && villa.effects.ssao && !villa.effects.shadows);
    assert_eq!(villa.ground_meshes, vec!["Lawn".to_string()]);

    let hdri = villa.lighting.hdri.as_ref().unwrap();
    assert_eq!(hdri.url, "studio.env");
    assert!((hdri.rotation_radians() - std::f32::consts::PI).abs() < 1e-6);
    assert!((villa.lighting.directional_intensity - 2.0).abs() < f32::EPSILON);
    // Unspecified lighting fields keep their defaults.
    assert!((villa.lighting.ambient_intensity - 0.6).abs() < f32::EPSILON);
}

#[test]
fn omitted_fields_take_defaults() {
    let config = ViewerConfig::from_json_str(DOCUMENT).unwrap();
    let shed = config.model("shed").unwrap();

    assert_eq!(shed.base_name(), "shed");
    assert!(shed.lighting.hdri.is_none());
    assert_eq!(config.pipeline.overlay_failure_budget, PipelineSettings::default().overlay_failure_budget);
    assert_eq!(
        config.conventions.overlay_suffixes,
        DiscoveryConventions::default().overlay_suffixes
    );
}

#[test]
fn model_quality_overrides_global_tier() {
    let config = ViewerConfig::from_json_str(DOCUMENT).unwrap();
    assert_eq!(config.quality_for(config.model("villa").unwrap()), QualityTier::Low);
    assert_eq!(config.quality_for(config.model("shed").unwrap()), QualityTier::High);
}

#[test]
fn unknown_model_is_a_config_error() {
    let config = ViewerConfig::from_json_str(DOCUMENT).unwrap();
    assert!(matches!(config.model("castle"), Err(VisionError::Config(_))));
}

#[test]
fn conventions_build_candidate_names() {
    let conventions = DiscoveryConventions::default();
    assert_eq!(conventions.primary_name("Villa"), "Villa.glb");
    assert_eq!(conventions.metadata_name("Villa"), "Villa.json");
    let overlays: Vec<_> = conventions.overlay_candidates("Villa").collect();
    assert_eq!(
        overlays,
        ["Villa_Furniture.glb", "Villa_Landscape.glb", "Villa_Glazing.glb"]
    );
    let textures: Vec<_> = conventions.texture_candidates("Villa").collect();
    assert_eq!(textures[0], "Villa_diffuse.png");
}

#[test]
fn quality_tier_parses_case_insensitively() {
    assert_eq!("HIGH".parse::<QualityTier>().unwrap(), QualityTier::High);
    assert!("ultra".parse::<QualityTier>().is_err());
    assert_eq!(QualityTier::Medium.to_string(), "medium");
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn hdri_brightness_out_of_range_is_rejected() {
    let message = expect_config_error(
        r#"{ "models": [{ "id": "a", "lighting": { "hdri": { "url": "x.env", "brightness": 25 } } }] }"#,
    );
    assert!(message.contains("brightness"), "{message}");
}

#[test]
fn hdri_rotation_out_of_range_is_rejected() {
    let message = expect_config_error(
        r#"{ "models": [{ "id": "a", "lighting": { "hdri": { "url": "x.env", "rotation_degrees": 400 } } }] }"#,
    );
    assert!(message.contains("rotation"), "{message}");
}

#[test]
fn duplicate_model_ids_are_rejected() {
    let message = expect_config_error(r#"{ "models": [{ "id": "a" }, { "id": "a" }] }"#);
    assert!(message.contains("duplicate"), "{message}");
}

#[test]
fn invalid_pipeline_settings_are_rejected() {
    expect_config_error(r#"{ "pipeline": { "chunk_size": 0 } }"#);
    expect_config_error(r#"{ "pipeline": { "stage_weights": [0, 0, 0, 0] } }"#);
}

#[test]
fn malformed_json_is_a_json_error() {
    assert!(matches!(
        ViewerConfig::from_json_str("{ models: }"),
        Err(VisionError::Json(_))
    ));
}
