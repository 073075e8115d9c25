//! Programmatic scene generation for integration tests.
//!
//! Builds a scene tree with:
//! - Skinned mesh (positions, normals, UVs, joints, weights, indices, one morph target)
//! - 3-bone skeleton (Root → Spine → Head) with inverse bind matrices
//! - Wave animation rotating the spine plus a morph weight track
//! - Camera, point light, material with an embedded texture

#![allow(dead_code)]

use glam::{Mat4, Quat, Vec3};
use gltf_codec::model::{
    Camera, Interpolation, Light, LightKind, Material, Projection, TextureRef, Transform,
};
use gltf_codec::scene::{
    AnimationClip, AnimationTrack, ImageData, MeshData, MeshInstance, MorphTarget, PrimitiveData,
    SceneNode, SceneTree, SkinData, TextureData, TrackValues,
};

/// Bone count for the test skeleton
pub const BONE_COUNT: usize = 3;
/// Keyframe count for the test animation
pub const FRAME_COUNT: usize = 8;
/// Segment height between bones
const SEGMENT_HEIGHT: f32 = 1.0;

/// Not a real PNG; pixels are never decoded
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

/// Two quads per bone segment, stacked along +Y
fn create_primitive() -> PrimitiveData {
    let mut primitive = PrimitiveData {
        material: Some(0),
        ..Default::default()
    };

    for bone in 0..BONE_COUNT {
        let y0 = bone as f32 * SEGMENT_HEIGHT;
        let y1 = y0 + SEGMENT_HEIGHT;
        let base = primitive.positions.len() as u32;
        for [x, y] in [[-0.5, y0], [0.5, y0], [0.5, y1], [-0.5, y1]] {
            primitive.positions.push([x, y, 0.0]);
            primitive.normals.push([0.0, 0.0, 1.0]);
        }
        primitive.indices.get_or_insert_with(Vec::new).extend_from_slice(&[
            base,
            base + 1,
            base + 2,
            base,
            base + 2,
            base + 3,
        ]);
    }

    let count = primitive.positions.len();
    primitive.tex_coords = vec![
        primitive
            .positions
            .iter()
            .map(|p| [p[0] + 0.5, p[1] / (BONE_COUNT as f32 * SEGMENT_HEIGHT)])
            .collect(),
    ];
    primitive.joints = vec![
        (0..count)
            .map(|v| [(v / 4) as u16, 0, 0, 0])
            .collect(),
    ];
    primitive.weights = vec![vec![[1.0, 0.0, 0.0, 0.0]; count]];
    primitive.targets = vec![MorphTarget {
        positions: vec![[0.0, 0.0, 0.25]; count],
        ..Default::default()
    }];
    primitive
}

fn create_animation(bones: [usize; BONE_COUNT], body: usize) -> AnimationClip {
    let times: Vec<f32> = (0..FRAME_COUNT).map(|f| f as f32 * 0.25).collect();
    let rotations = (0..FRAME_COUNT)
        .map(|f| Quat::from_rotation_z((f as f32 * 0.5).sin() * 0.5))
        .collect();
    let weights = (0..FRAME_COUNT).map(|f| (f % 2) as f32).collect();

    AnimationClip {
        name: Some("Wave".to_string()),
        tracks: vec![
            AnimationTrack {
                node: bones[1],
                interpolation: Interpolation::Linear,
                times: times.clone(),
                values: TrackValues::Rotation(rotations),
            },
            AnimationTrack {
                node: body,
                interpolation: Interpolation::Step,
                times,
                values: TrackValues::Weights(weights),
            },
        ],
    }
}

/// Complete scene tree used across tests
pub fn skinned_tree() -> SceneTree {
    let mut tree = SceneTree::new();
    tree.name = Some("TestScene".to_string());

    let root = tree.add_node(SceneNode::new("Character"), None);

    let mut bones = [0; BONE_COUNT];
    let mut parent = root;
    for (i, name) in ["Root", "Spine", "Head"].iter().enumerate() {
        let mut bone = SceneNode::new(name);
        if i > 0 {
            bone.transform = Transform::from_translation(Vec3::new(0.0, SEGMENT_HEIGHT, 0.0));
        }
        bones[i] = tree.add_node(bone, Some(parent));
        parent = bones[i];
    }

    let mut body = SceneNode::new("Body");
    body.mesh = Some(MeshInstance {
        mesh: 0,
        skin: Some(0),
        skeleton: None,
    });
    body.weights = vec![0.0];
    body.extras = Some(serde_json::json!({ "tag": "hero" }));
    let body = tree.add_node(body, Some(root));

    let mut camera = SceneNode::new("Camera");
    camera.camera = Some(0);
    camera.transform = Transform::from_translation(Vec3::new(0.0, 1.5, 4.0));
    tree.add_node(camera, None);

    let mut lamp = SceneNode::new("Lamp");
    lamp.light = Some(0);
    lamp.transform = Transform::from_translation(Vec3::new(2.0, 3.0, 1.0));
    tree.add_node(lamp, None);

    tree.meshes.push(MeshData {
        name: Some("Body".to_string()),
        primitives: vec![create_primitive()],
        weights: vec![0.0],
    });

    let inverse_binds = (0..BONE_COUNT)
        .map(|i| Mat4::from_translation(Vec3::new(0.0, -(i as f32) * SEGMENT_HEIGHT, 0.0)))
        .collect();
    tree.skins.push(SkinData {
        name: Some("Armature".to_string()),
        joints: bones.to_vec(),
        inverse_binds,
        root: None,
        skeleton: None,
    });

    tree.materials.push(Material {
        name: Some("Skin".to_string()),
        base_color_factor: [0.75, 0.5, 0.25, 1.0],
        base_color_texture: Some(TextureRef::new(0)),
        metallic_factor: 0.0,
        roughness_factor: 0.5,
        ..Default::default()
    });
    tree.textures.push(TextureData {
        name: Some("Albedo".to_string()),
        image: Some(0),
        sampler: Default::default(),
    });
    tree.images.push(ImageData {
        name: Some("albedo".to_string()),
        mime_type: Some("image/png".to_string()),
        data: FAKE_PNG.to_vec(),
        uri: None,
    });

    tree.cameras.push(Camera {
        name: Some("Main".to_string()),
        projection: Projection::Perspective {
            yfov: 0.75,
            aspect_ratio: Some(1.5),
            znear: 0.125,
            zfar: Some(100.0),
        },
    });
    let mut light = Light::new(LightKind::Point);
    light.intensity = 2.0;
    light.range = Some(10.0);
    tree.lights.push(light);

    tree.animations.push(create_animation(bones, body));
    tree
}
