//! Integration tests for the scene tree -> glTF -> scene tree pipeline.
//!
//! Tests the complete flow:
//! 1. Build a scene tree programmatically
//! 2. Flatten and write it as GLB / .gltf
//! 3. Cross-validate the output with the reference `gltf` crate
//! 4. Read it back and compare scene trees

mod common;

use tempfile::tempdir;

use gltf_codec::model::semantic;
use gltf_codec::scene::TrackSample;
use gltf_codec::{DocumentReader, DocumentWriter, SceneBuilder, SceneFlattener, SceneTree};

fn flatten_and_write() -> (SceneTree, Vec<u8>) {
    let document = SceneFlattener::new()
        .flatten(&common::skinned_tree())
        .expect("Failed to flatten scene");
    let built = SceneBuilder::new()
        .build(&document)
        .expect("Failed to build scene");
    let glb = DocumentWriter::new()
        .to_glb(&document)
        .expect("Failed to write GLB");
    (built, glb)
}

#[test]
fn test_glb_header_valid() {
    let (_, glb) = flatten_and_write();

    assert!(glb.len() > 12, "GLB too small");
    assert_eq!(&glb[0..4], b"glTF", "Invalid GLB magic");
    assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
    assert_eq!(
        u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize,
        glb.len(),
        "Header length must match file size"
    );
    assert_eq!(glb.len() % 4, 0);
}

#[test]
fn test_reference_reader_accepts_glb() {
    let (_, glb) = flatten_and_write();

    let gltf = gltf::Gltf::from_slice(&glb).expect("gltf crate rejected GLB");
    let blob = gltf.blob.as_deref().expect("Missing BIN chunk");

    assert_eq!(gltf.meshes().count(), 1, "Expected 1 mesh");
    assert_eq!(gltf.skins().count(), 1, "Expected 1 skin");
    assert_eq!(gltf.animations().count(), 1, "Expected 1 animation");
    assert_eq!(gltf.cameras().count(), 1, "Expected 1 camera");

    let names: Vec<_> = gltf.nodes().filter_map(|n| n.name()).collect();
    assert_eq!(
        names,
        vec!["Character", "Root", "Spine", "Head", "Body", "Camera", "Lamp"]
    );

    let skin = gltf.skins().next().unwrap();
    assert_eq!(skin.joints().count(), common::BONE_COUNT);
    assert!(skin.inverse_bind_matrices().is_some());

    let primitive = gltf.meshes().next().unwrap().primitives().next().unwrap();
    for semantic in [
        gltf::Semantic::Positions,
        gltf::Semantic::Normals,
        gltf::Semantic::TexCoords(0),
        gltf::Semantic::Joints(0),
        gltf::Semantic::Weights(0),
    ] {
        assert!(primitive.get(&semantic).is_some(), "Missing {:?}", semantic);
    }

    let reader = primitive.reader(|buffer| match buffer.source() {
        gltf::buffer::Source::Bin => Some(blob),
        _ => None,
    });
    let positions: Vec<[f32; 3]> = reader.read_positions().unwrap().collect();
    let expected = &common::skinned_tree().meshes[0].primitives[0].positions;
    assert_eq!(&positions, expected);

    let indices: Vec<u32> = reader.read_indices().unwrap().into_u32().collect();
    assert_eq!(indices.len(), common::BONE_COUNT * 6);

    let bounds = primitive.bounding_box();
    assert_eq!(bounds.min, [-0.5, 0.0, 0.0]);
    assert_eq!(bounds.max, [0.5, 3.0, 0.0]);

    let animation = gltf.animations().next().unwrap();
    let channel = animation.channels().next().unwrap();
    let times: Vec<f32> = channel
        .reader(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => Some(blob),
            _ => None,
        })
        .read_inputs()
        .unwrap()
        .collect();
    assert_eq!(times.len(), common::FRAME_COUNT);
}

#[test]
fn test_glb_reads_back_to_equal_tree() {
    let (built, glb) = flatten_and_write();

    let document = DocumentReader::new()
        .read_slice(&glb, None)
        .expect("Failed to read GLB");
    let rebuilt = SceneBuilder::new()
        .build(&document)
        .expect("Failed to build scene");

    assert_eq!(rebuilt, built);
}

#[test]
fn test_gltf_with_sidecar_reads_back_to_equal_tree() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("character.gltf");

    let document = SceneFlattener::new()
        .flatten(&common::skinned_tree())
        .unwrap();
    DocumentWriter::new().write_path(&document, &path).unwrap();
    assert!(dir.path().join("character.bin").is_file());

    let read = DocumentReader::new().read_path(&path).unwrap();
    assert_eq!(
        SceneBuilder::new().build(&read).unwrap(),
        SceneBuilder::new().build(&document).unwrap()
    );
}

#[test]
fn test_source_data_survives() {
    let source = common::skinned_tree();
    let (built, _) = flatten_and_write();

    let names: Vec<&str> = built.nodes.iter().map(|n| n.name.as_str()).collect();
    let source_names: Vec<&str> = source.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, source_names);

    assert_eq!(built.meshes, source.meshes);
    assert_eq!(built.skins[0].inverse_binds, source.skins[0].inverse_binds);
    assert_eq!(built.images, source.images);
    assert_eq!(built.materials, source.materials);
    assert_eq!(built.cameras, source.cameras);
    assert_eq!(built.lights, source.lights);
    assert_eq!(built.animations, source.animations);
    assert_eq!(built.nodes[4].extras, source.nodes[4].extras);
}

#[test]
fn test_skeleton_determined() {
    let (built, _) = flatten_and_write();
    let spine = built.find_node("Spine").unwrap();
    let character = built.find_node("Character").unwrap();

    assert_eq!(built.skeletons.len(), 1);
    assert_eq!(built.skeletons[0].joints.len(), common::BONE_COUNT);
    assert_eq!(built.skeletons[0].roots, vec![built.find_node("Root").unwrap()]);
    assert!(built.nodes[spine].is_joint());
    assert!(!built.nodes[character].is_joint());

    let body = built.find_node("Body").unwrap();
    let instance = built.nodes[body].mesh.unwrap();
    assert_eq!(instance.skin, Some(0));
    assert_eq!(instance.skeleton, Some(0));
}

#[test]
fn test_animation_samples_after_round_trip() {
    let (built, _) = flatten_and_write();
    let clip = &built.animations[0];
    assert_eq!(clip.name.as_deref(), Some("Wave"));
    assert_eq!(clip.duration(), (common::FRAME_COUNT - 1) as f32 * 0.25);

    let body = built.find_node("Body").unwrap();
    let weights = clip.tracks_for(body).next().unwrap();
    assert_eq!(weights.sample(0.3), Some(TrackSample::Weights(vec![1.0])));
}

#[test]
fn test_document_attributes_use_compact_types() {
    let document = SceneFlattener::new()
        .flatten(&common::skinned_tree())
        .unwrap();
    let primitive = &document.meshes[0].primitives[0];

    let joints = document.accessor(primitive.attributes[&semantic::joints(0)]).unwrap();
    assert_eq!(joints.component_type, gltf_codec::model::ComponentType::U8);
    let indices = document.accessor(primitive.indices.unwrap()).unwrap();
    assert_eq!(indices.component_type, gltf_codec::model::ComponentType::U16);
    assert!(document
        .extensions_used
        .iter()
        .any(|e| e == gltf_codec::json::KHR_LIGHTS_PUNCTUAL));
}
