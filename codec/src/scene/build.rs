//! Document -> scene tree

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashSet;

use crate::error::{CodecError, Result};
use crate::extension::ExtensionRegistry;
use crate::model::{
    Animation, Document, ImageSource, Interpolation, Mesh, Node, Primitive, TargetPath, semantic,
};
use crate::model::buffer::view_bytes;
use crate::scene::{
    AnimationClip, AnimationTrack, ImageData, MeshData, MeshInstance, MorphTarget, PrimitiveData,
    SceneNode, SceneTree, SkeletonData, SkinData, TextureData, TrackValues,
};

/// Characters that cannot appear in node names
const RESERVED_NAME_CHARS: &[char] = &['.', ':', '@', '/', '"', '%'];

#[derive(Debug, Clone)]
pub struct SceneBuilder {
    extensions: ExtensionRegistry,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::with_extensions(ExtensionRegistry::with_builtins())
    }

    pub fn with_extensions(extensions: ExtensionRegistry) -> Self {
        Self { extensions }
    }

    pub fn build(&self, document: &Document) -> Result<SceneTree> {
        document.validate()?;

        let mut tree = SceneTree {
            name: document.scene_name.clone(),
            roots: document.root_nodes.clone(),
            ..Default::default()
        };

        let mut names = UniqueNames::default();
        for (index, node) in document.nodes.iter().enumerate() {
            let mut scene_node = SceneNode {
                name: names.assign(&base_name(node)),
                parent: node.parent,
                children: node.children.clone(),
                transform: node.transform,
                mesh: node.mesh.map(|mesh| MeshInstance {
                    mesh,
                    skin: node.skin,
                    skeleton: node.skin.and_then(|skin| document.skins[skin].skeleton),
                }),
                camera: node.camera,
                light: node.light,
                skeleton: node.skeleton,
                weights: node.weights.clone(),
                extensions: node.extensions.clone(),
                extras: node.extras.clone(),
            };
            if node.skin.is_some() && node.mesh.is_none() {
                tracing::warn!("Node {} has a skin but no mesh; skin ignored", index);
            }
            self.extensions
                .post_node_build(document, index, &mut scene_node)?;
            tree.nodes.push(scene_node);
        }

        tree.meshes = document
            .meshes
            .iter()
            .map(|mesh| build_mesh(document, mesh))
            .collect::<Result<_>>()?;
        tree.materials = document.materials.clone();
        tree.textures = document
            .textures
            .iter()
            .map(|texture| TextureData {
                name: texture.name.clone(),
                image: texture.source,
                sampler: texture
                    .sampler
                    .map(|sampler| document.samplers[sampler])
                    .unwrap_or_default(),
            })
            .collect();
        tree.images = build_images(document)?;
        tree.skins = build_skins(document)?;
        tree.skeletons = document
            .skeletons
            .iter()
            .map(|skeleton| SkeletonData {
                name: skeleton.name.clone(),
                joints: skeleton.joints.clone(),
                roots: skeleton.roots.clone(),
                skins: skeleton.skins.clone(),
            })
            .collect();
        tree.animations = document
            .animations
            .iter()
            .enumerate()
            .map(|(index, animation)| build_animation(document, index, animation))
            .collect::<Result<_>>()?;
        tree.cameras = document.cameras.clone();
        tree.lights = document.lights.clone();

        self.extensions.post_build(document, &mut tree)?;

        tracing::debug!(
            "Built scene tree: {} nodes, {} meshes, {} clips",
            tree.nodes.len(),
            tree.meshes.len(),
            tree.animations.len()
        );
        Ok(tree)
    }
}

/// Node name before uniqueness is applied
fn base_name(node: &Node) -> String {
    let name: String = node
        .name
        .as_deref()
        .unwrap_or("")
        .trim()
        .chars()
        .map(|c| if RESERVED_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if !name.is_empty() {
        return name;
    }
    if node.mesh.is_some() {
        "Mesh".to_string()
    } else if node.camera.is_some() {
        "Camera".to_string()
    } else if node.light.is_some() {
        "Light".to_string()
    } else {
        "Node".to_string()
    }
}

/// Hands out names, numbering repeats as `Name2`, `Name3`, ...
#[derive(Default)]
struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    fn assign(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        // "Cube2" continues as "Cube3", not "Cube22"
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        let stem = if stem.is_empty() { base } else { stem };
        let mut index = 2;
        loop {
            let candidate = format!("{}{}", stem, index);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            index += 1;
        }
    }
}

fn build_mesh(document: &Document, mesh: &Mesh) -> Result<MeshData> {
    Ok(MeshData {
        name: mesh.name.clone(),
        primitives: mesh
            .primitives
            .iter()
            .map(|primitive| build_primitive(document, primitive))
            .collect::<Result<_>>()?,
        weights: mesh.weights.clone(),
    })
}

/// Read numbered attribute sets (`TEXCOORD_0`, `TEXCOORD_1`, ...) until one is missing
fn read_sets<T, F>(primitive: &Primitive, name: fn(usize) -> String, mut read: F) -> Result<Vec<Vec<T>>>
where
    F: FnMut(usize) -> Result<Vec<T>>,
{
    let mut sets = Vec::new();
    while let Some(&accessor) = primitive.attributes.get(&name(sets.len())) {
        sets.push(read(accessor)?);
    }
    Ok(sets)
}

fn build_primitive(document: &Document, primitive: &Primitive) -> Result<PrimitiveData> {
    let attribute = |name: &str| primitive.attributes.get(name).copied();

    let positions = match attribute(semantic::POSITION) {
        Some(accessor) => document.read_vec3(accessor)?,
        None => Vec::new(),
    };
    let vertex_count = positions.len();

    let mut data = PrimitiveData {
        mode: primitive.mode,
        positions,
        normals: attribute(semantic::NORMAL)
            .map(|a| document.read_vec3(a))
            .transpose()?
            .unwrap_or_default(),
        tangents: attribute(semantic::TANGENT)
            .map(|a| document.read_vec4(a))
            .transpose()?
            .unwrap_or_default(),
        tex_coords: read_sets(primitive, semantic::tex_coord, |a| document.read_vec2(a))?,
        colors: attribute(semantic::COLOR_0)
            .map(|a| document.read_colors(a))
            .transpose()?
            .unwrap_or_default(),
        joints: read_sets(primitive, semantic::joints, |a| document.read_joints(a))?,
        weights: read_sets(primitive, semantic::weights, |a| document.read_vec4(a))?,
        indices: primitive
            .indices
            .map(|a| document.read_u32(a))
            .transpose()?,
        material: primitive.material,
        targets: Vec::with_capacity(primitive.targets.len()),
    };

    for target in &primitive.targets {
        let read = |name: &str| -> Result<Vec<[f32; 3]>> {
            match target.get(name) {
                Some(&accessor) => document.read_vec3(accessor),
                None => Ok(Vec::new()),
            }
        };
        data.targets.push(MorphTarget {
            positions: read(semantic::POSITION)?,
            normals: read(semantic::NORMAL)?,
            tangents: read(semantic::TANGENT)?,
        });
    }

    if let Some(indices) = &data.indices {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(CodecError::Custom(format!(
                "Index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }
    }
    Ok(data)
}

fn build_images(document: &Document) -> Result<Vec<ImageData>> {
    document
        .images
        .iter()
        .map(|image| {
            let (data, uri) = match &image.source {
                ImageSource::BufferView(view) => (
                    view_bytes(*view, &document.buffer_views, &document.buffers)?.to_vec(),
                    None,
                ),
                ImageSource::Uri { uri, data: Some(data) } if uri.starts_with("data:") => {
                    (data.clone(), None)
                }
                ImageSource::Uri { uri, data } => {
                    (data.clone().unwrap_or_default(), Some(uri.clone()))
                }
            };
            Ok(ImageData {
                name: image.name.clone(),
                mime_type: image.mime_type.clone(),
                data,
                uri,
            })
        })
        .collect()
}

fn build_skins(document: &Document) -> Result<Vec<SkinData>> {
    document
        .skins
        .iter()
        .map(|skin| {
            let inverse_binds = match skin.inverse_bind_matrices {
                Some(accessor) => {
                    let mut matrices = document.read_mat4(accessor)?;
                    matrices.truncate(skin.joints.len());
                    matrices
                }
                None => vec![Mat4::IDENTITY; skin.joints.len()],
            };
            Ok(SkinData {
                name: skin.name.clone(),
                joints: skin.joints.clone(),
                inverse_binds,
                root: skin.skeleton_root,
                skeleton: skin.skeleton,
            })
        })
        .collect()
}

fn build_animation(document: &Document, index: usize, animation: &Animation) -> Result<AnimationClip> {
    let invalid = |reason: String| CodecError::InvalidAnimation {
        animation: index,
        reason,
    };

    let mut tracks = Vec::with_capacity(animation.channels.len());
    for channel in &animation.channels {
        let Some(node) = channel.node else {
            tracing::debug!("Animation {} channel without target node skipped", index);
            continue;
        };
        let sampler = &animation.samplers[channel.sampler];
        let times = document.read_scalars(sampler.input)?;
        let values = match channel.path {
            TargetPath::Translation => TrackValues::Translation(
                document
                    .read_vec3(sampler.output)?
                    .into_iter()
                    .map(Vec3::from_array)
                    .collect(),
            ),
            TargetPath::Scale => TrackValues::Scale(
                document
                    .read_vec3(sampler.output)?
                    .into_iter()
                    .map(Vec3::from_array)
                    .collect(),
            ),
            TargetPath::Rotation => TrackValues::Rotation(
                document
                    .read_vec4(sampler.output)?
                    .into_iter()
                    .map(Quat::from_array)
                    .collect(),
            ),
            TargetPath::Weights => TrackValues::Weights(document.read_scalars(sampler.output)?),
        };

        let track = AnimationTrack {
            node,
            interpolation: sampler.interpolation,
            times,
            values,
        };
        if !track.is_consistent() {
            return Err(invalid(format!(
                "{} track on node {} has {} keys but mismatched output",
                channel.path.as_str(),
                node,
                track.times.len()
            )));
        }
        if !track.has_valid_times() {
            return Err(invalid("keyframe times are not finite and ascending".to_string()));
        }
        if track.interpolation == Interpolation::CubicSpline && track.times.len() < 2 {
            tracing::warn!("Animation {} has a cubic spline track with a single key", index);
        }
        tracks.push(track);
    }

    Ok(AnimationClip {
        name: animation.name.clone(),
        tracks,
    })
}
