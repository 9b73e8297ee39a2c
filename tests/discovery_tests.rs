//! Resource Discovery Tests
//!
//! Tests for:
//! - Naming-convention probing of overlays, textures and metadata
//! - Fail-fast behaviour when the primary mesh is absent
//! - Explicit resource lists bypassing probing
//! - Caller-supplied descriptor verification

mod common;

use pollster::block_on;

use valevision::assets::descriptor::{ResourceDescriptor, ResourceRole};
use valevision::assets::discovery::{discover, verify_required};
use valevision::assets::io::MemoryTransport;
use valevision::config::{DiscoveryConventions, ModelConfig};
use valevision::errors::{ErrorClass, VisionError};

fn uris(descriptors: &[ResourceDescriptor]) -> Vec<&str> {
    descriptors.iter().map(|d| d.uri.as_str()).collect()
}

// ============================================================================
// Convention probing
// ============================================================================

#[test]
fn discovery_finds_present_candidates_in_priority_order() {
    let transport = common::villa_transport();
    let descriptors = block_on(discover(
        &transport,
        &ModelConfig::new("Villa"),
        &DiscoveryConventions::default(),
    ))
    .unwrap();

    assert_eq!(
        uris(&descriptors),
        ["Villa.glb", "Villa_Furniture.glb", "Villa_diffuse.png"]
    );
    assert_eq!(descriptors[0].role, ResourceRole::PrimaryMesh);
    assert!(descriptors[0].required);
    assert!(descriptors[1..].iter().all(|d| !d.required && !d.loaded));
}

#[test]
fn discovery_probes_every_candidate_once() {
    let transport = common::villa_transport();
    let conventions = DiscoveryConventions::default();
    block_on(discover(&transport, &ModelConfig::new("Villa"), &conventions)).unwrap();

    for uri in [
        "Villa.glb",
        "Villa.json",
        "Villa_Furniture.glb",
        "Villa_Landscape.glb",
        "Villa_Glazing.glb",
        "Villa_diffuse.png",
        "Villa_normal.png",
        "Villa_roughness.png",
    ] {
        assert_eq!(transport.probe_count(uri), 1, "{uri}");
    }
    assert_eq!(transport.total_fetches(), 0, "discovery must not download");
}

#[test]
fn metadata_is_discovered_when_present() {
    let transport = common::villa_transport();
    transport.insert("Villa.json", br#"{"title":"Villa"}"#.to_vec());

    let descriptors = block_on(discover(
        &transport,
        &ModelConfig::new("Villa"),
        &DiscoveryConventions::default(),
    ))
    .unwrap();

    assert_eq!(descriptors[1].uri, "Villa.json");
    assert_eq!(descriptors[1].role, ResourceRole::Metadata);
}

#[test]
fn metadata_probe_can_be_disabled() {
    let transport = common::villa_transport();
    let conventions = DiscoveryConventions {
        probe_metadata: false,
        ..Default::default()
    };
    block_on(discover(&transport, &ModelConfig::new("Villa"), &conventions)).unwrap();
    assert_eq!(transport.probe_count("Villa.json"), 0);
}

#[test]
fn base_name_overrides_id() {
    let transport = common::villa_transport();
    let mut model = ModelConfig::new("villa-aurora");
    model.base = "Villa".into();

    let descriptors =
        block_on(discover(&transport, &model, &DiscoveryConventions::default())).unwrap();
    assert_eq!(descriptors[0].uri, "Villa.glb");
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn missing_primary_fails_fast() {
    let transport = common::villa_transport();
    transport.remove("Villa.glb");

    let err = block_on(discover(
        &transport,
        &ModelConfig::new("Villa"),
        &DiscoveryConventions::default(),
    ))
    .unwrap_err();

    assert!(matches!(&err, VisionError::RequiredResourceMissing { uri } if uri == "Villa.glb"));
    assert_eq!(err.class(), ErrorClass::FatalRequired);
    assert_eq!(err.failed_resource(), Some("Villa.glb"));
    assert_eq!(transport.probe_count("Villa_Furniture.glb"), 0);
}

#[test]
fn no_optional_resources_yields_primary_only() {
    let transport = MemoryTransport::new();
    transport.insert("Shed.glb", common::simple_model("Shed"));

    let descriptors = block_on(discover(
        &transport,
        &ModelConfig::new("Shed"),
        &DiscoveryConventions::default(),
    ))
    .unwrap();
    assert_eq!(uris(&descriptors), ["Shed.glb"]);
}

// ============================================================================
// Explicit lists
// ============================================================================

#[test]
fn explicit_lists_are_taken_without_probing() {
    let transport = common::villa_transport();
    let mut model = ModelConfig::new("Villa");
    model.overlays = Some(vec!["Villa_Pool.glb".into()]);
    model.textures = Some(vec!["tiles/pool_diffuse.png".into()]);

    let descriptors =
        block_on(discover(&transport, &model, &DiscoveryConventions::default())).unwrap();

    assert_eq!(
        uris(&descriptors),
        ["Villa.glb", "Villa_Pool.glb", "tiles/pool_diffuse.png"]
    );
    assert_eq!(transport.probe_count("Villa_Pool.glb"), 0);
    assert_eq!(transport.probe_count("Villa_Furniture.glb"), 0);
    assert_eq!(transport.probe_count("Villa_diffuse.png"), 0);
}

#[test]
fn empty_explicit_list_disables_probing() {
    let transport = common::villa_transport();
    let mut model = ModelConfig::new("Villa");
    model.overlays = Some(Vec::new());

    let descriptors =
        block_on(discover(&transport, &model, &DiscoveryConventions::default())).unwrap();
    assert!(descriptors.iter().all(|d| d.role != ResourceRole::OverlayMesh));
}

// ============================================================================
// Caller-supplied descriptors
// ============================================================================

#[test]
fn verify_requires_a_primary_mesh() {
    let transport = common::villa_transport();
    let err = block_on(verify_required(
        &transport,
        &[ResourceDescriptor::overlay("Villa_Furniture.glb")],
    ))
    .unwrap_err();
    assert!(matches!(err, VisionError::NoPrimaryMesh));
}

#[test]
fn verify_probes_required_entries_only() {
    let transport = common::villa_transport();
    let descriptors = [
        ResourceDescriptor::primary("Villa.glb"),
        ResourceDescriptor::overlay("Missing.glb"),
        ResourceDescriptor::texture("Villa_diffuse.png").with_required(true),
    ];
    block_on(verify_required(&transport, &descriptors)).unwrap();

    assert_eq!(transport.probe_count("Missing.glb"), 0);
    assert_eq!(transport.probe_count("Villa_diffuse.png"), 1);
}
