//! Scene tree -> document

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::error::{CodecError, Result};
use crate::extension::ExtensionRegistry;
use crate::json::{KHR_LIGHTS_PUNCTUAL, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS};
use crate::model::{
    Animation, AnimationChannel, AnimationSampler, Document, Image, ImageSource, Mesh, Node,
    Primitive, Skin, Texture, semantic,
};
use crate::pack::BufferBuilder;
use crate::scene::{AnimationClip, PrimitiveData, SceneTree, TrackValues};
use crate::skeleton;

#[derive(Debug, Clone)]
pub struct SceneFlattener {
    extensions: ExtensionRegistry,
}

impl Default for SceneFlattener {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneFlattener {
    pub fn new() -> Self {
        Self::with_extensions(ExtensionRegistry::with_builtins())
    }

    pub fn with_extensions(extensions: ExtensionRegistry) -> Self {
        Self { extensions }
    }

    pub fn flatten(&self, tree: &SceneTree) -> Result<Document> {
        let mut tree = tree.clone();
        self.extensions.pre_flatten(&mut tree)?;
        check_tree(&tree)?;

        let mut packer = BufferBuilder::new();
        let mut document = Document::new();
        document.scene_name = tree.name.clone();
        document.root_nodes = tree.roots.clone();

        document.nodes = tree
            .nodes
            .iter()
            .map(|node| Node {
                name: Some(node.name.clone()),
                parent: None,
                children: node.children.clone(),
                transform: node.transform,
                mesh: node.mesh.map(|instance| instance.mesh),
                skin: node.mesh.and_then(|instance| instance.skin),
                camera: node.camera,
                light: node.light,
                skeleton: None,
                joint: false,
                weights: node.weights.clone(),
                extensions: node.extensions.clone(),
                extras: node.extras.clone(),
            })
            .collect();

        document.meshes = tree
            .meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| {
                let primitives = mesh
                    .primitives
                    .iter()
                    .map(|primitive| pack_primitive(&mut packer, index, primitive))
                    .collect::<Result<_>>()?;
                Ok(Mesh {
                    name: mesh.name.clone(),
                    primitives,
                    weights: mesh.weights.clone(),
                    ..Default::default()
                })
            })
            .collect::<Result<_>>()?;

        document.skins = tree
            .skins
            .iter()
            .enumerate()
            .map(|(index, skin)| {
                if skin.inverse_binds.len() != skin.joints.len() {
                    return Err(CodecError::InvalidSkin {
                        skin: index,
                        reason: format!(
                            "{} inverse bind matrices for {} joints",
                            skin.inverse_binds.len(),
                            skin.joints.len()
                        ),
                    });
                }
                let inverse_bind_matrices = (!skin.joints.is_empty())
                    .then(|| packer.pack_mat4(&skin.inverse_binds));
                Ok(Skin {
                    name: skin.name.clone(),
                    joints: skin.joints.clone(),
                    inverse_bind_matrices,
                    skeleton_root: skin.root,
                    skeleton: None,
                })
            })
            .collect::<Result<_>>()?;

        document.animations = tree
            .animations
            .iter()
            .enumerate()
            .map(|(index, clip)| pack_animation(&mut packer, index, clip))
            .collect::<Result<_>>()?;

        document.images = tree
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let source = match &image.uri {
                    Some(uri) if image.data.is_empty() => ImageSource::Uri {
                        uri: uri.clone(),
                        data: None,
                    },
                    _ if !image.data.is_empty() => {
                        ImageSource::BufferView(packer.pack_bytes(&image.data))
                    }
                    _ => {
                        return Err(CodecError::InvalidScene(format!(
                            "Image {} has neither data nor a URI",
                            index
                        )));
                    }
                };
                Ok(Image {
                    name: image.name.clone(),
                    mime_type: image.mime_type.clone(),
                    source,
                })
            })
            .collect::<Result<_>>()?;

        // One sampler per texture keeps texture indices stable
        document.samplers = tree.textures.iter().map(|texture| texture.sampler).collect();
        document.textures = tree
            .textures
            .iter()
            .enumerate()
            .map(|(index, texture)| Texture {
                name: texture.name.clone(),
                source: texture.image,
                sampler: Some(index),
            })
            .collect();

        document.materials = tree.materials.clone();
        document.cameras = tree.cameras.clone();
        document.lights = tree.lights.clone();
        if document.materials.iter().any(|m| m.spec_gloss.is_some()) {
            document.mark_extension_used(KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS);
        }
        if !document.lights.is_empty() {
            document.mark_extension_used(KHR_LIGHTS_PUNCTUAL);
        }

        let (buffer, views, accessors) = packer.finish();
        if !buffer.is_empty() {
            document.buffers = vec![buffer];
        }
        document.buffer_views = views;
        document.accessors = accessors;

        document.link_parents()?;
        document.validate()?;
        skeleton::determine_skeletons(&mut document)?;

        tracing::debug!(
            "Flattened scene tree: {} nodes, {} accessors, {} buffer bytes",
            document.nodes.len(),
            document.accessors.len(),
            document.buffers.first().map_or(0, Vec::len)
        );
        Ok(document)
    }
}

/// Parent and child links must agree before anything is packed
fn check_tree(tree: &SceneTree) -> Result<()> {
    let count = tree.nodes.len();
    for (index, node) in tree.nodes.iter().enumerate() {
        if node.name.is_empty() {
            return Err(CodecError::InvalidScene(format!("Node {} has no name", index)));
        }
        for &child in &node.children {
            let parent = tree.nodes.get(child).and_then(|c| c.parent);
            if parent != Some(index) {
                return Err(CodecError::InvalidScene(format!(
                    "Node {} lists child {} whose parent is {:?}",
                    index, child, parent
                )));
            }
        }
        if let Some(parent) = node.parent {
            let listed = parent < count && tree.nodes[parent].children.contains(&index);
            if !listed {
                return Err(CodecError::InvalidScene(format!(
                    "Node {} names parent {} which does not list it",
                    index, parent
                )));
            }
        }
        if let Some(instance) = node.mesh {
            if instance.mesh >= tree.meshes.len() {
                return Err(CodecError::out_of_range("mesh", instance.mesh, tree.meshes.len()));
            }
        }
    }
    Ok(())
}

fn pack_primitive(
    packer: &mut BufferBuilder,
    mesh: usize,
    primitive: &PrimitiveData,
) -> Result<Primitive> {
    let vertex_count = primitive.vertex_count();
    let invalid = |reason: String| CodecError::InvalidMesh { mesh, reason };
    if vertex_count == 0 {
        return Err(invalid("primitive has no positions".to_string()));
    }
    let check_len = |name: &str, len: usize| -> Result<()> {
        if len != vertex_count {
            return Err(invalid(format!(
                "{} has {} entries for {} vertices",
                name, len, vertex_count
            )));
        }
        Ok(())
    };

    let mut attributes = BTreeMap::new();
    attributes.insert(
        semantic::POSITION.to_string(),
        packer.pack_positions(&primitive.positions),
    );
    if !primitive.normals.is_empty() {
        check_len(semantic::NORMAL, primitive.normals.len())?;
        attributes.insert(semantic::NORMAL.to_string(), packer.pack_vec3(&primitive.normals));
    }
    if !primitive.tangents.is_empty() {
        check_len(semantic::TANGENT, primitive.tangents.len())?;
        attributes.insert(semantic::TANGENT.to_string(), packer.pack_vec4(&primitive.tangents));
    }
    for (set, uvs) in primitive.tex_coords.iter().enumerate() {
        check_len("TEXCOORD", uvs.len())?;
        attributes.insert(semantic::tex_coord(set), packer.pack_vec2(uvs));
    }
    if !primitive.colors.is_empty() {
        check_len(semantic::COLOR_0, primitive.colors.len())?;
        attributes.insert(semantic::COLOR_0.to_string(), packer.pack_vec4(&primitive.colors));
    }
    if primitive.joints.len() != primitive.weights.len() {
        return Err(invalid("joint and weight set counts differ".to_string()));
    }
    for (set, (joints, weights)) in primitive.joints.iter().zip(&primitive.weights).enumerate() {
        check_len("JOINTS", joints.len())?;
        check_len("WEIGHTS", weights.len())?;
        attributes.insert(semantic::joints(set), packer.pack_joints(joints));
        attributes.insert(semantic::weights(set), packer.pack_vec4(weights));
    }

    let indices = match &primitive.indices {
        Some(indices) if !indices.is_empty() => {
            if indices.iter().any(|&i| i as usize >= vertex_count) {
                return Err(invalid("index past the last vertex".to_string()));
            }
            Some(packer.pack_indices(indices))
        }
        _ => None,
    };

    let mut targets = Vec::with_capacity(primitive.targets.len());
    for target in &primitive.targets {
        let mut packed = BTreeMap::new();
        for (name, data) in [
            (semantic::POSITION, &target.positions),
            (semantic::NORMAL, &target.normals),
            (semantic::TANGENT, &target.tangents),
        ] {
            if !data.is_empty() {
                check_len(name, data.len())?;
                let accessor = if name == semantic::POSITION {
                    packer.pack_positions(data)
                } else {
                    packer.pack_vec3(data)
                };
                packed.insert(name.to_string(), accessor);
            }
        }
        targets.push(packed);
    }

    Ok(Primitive {
        attributes,
        indices,
        material: primitive.material,
        mode: primitive.mode,
        targets,
        extensions: Default::default(),
    })
}

fn pack_animation(
    packer: &mut BufferBuilder,
    index: usize,
    clip: &AnimationClip,
) -> Result<Animation> {
    let mut animation = Animation {
        name: clip.name.clone(),
        ..Default::default()
    };

    for track in &clip.tracks {
        if track.times.is_empty() || !track.is_consistent() {
            return Err(CodecError::InvalidAnimation {
                animation: index,
                reason: format!(
                    "{} track on node {} has mismatched keys and values",
                    track.path().as_str(),
                    track.node
                ),
            });
        }
        if !track.has_valid_times() {
            return Err(CodecError::InvalidAnimation {
                animation: index,
                reason: format!(
                    "{} track on node {} has keyframe times that are not finite and ascending",
                    track.path().as_str(),
                    track.node
                ),
            });
        }

        let input = packer.pack_scalars_with_bounds(&track.times);
        let output = match &track.values {
            TrackValues::Translation(values) | TrackValues::Scale(values) => {
                let values: Vec<[f32; 3]> = values.iter().map(Vec3::to_array).collect();
                packer.pack_keyframes_vec3(&values)
            }
            TrackValues::Rotation(values) => {
                let values: Vec<[f32; 4]> = values.iter().map(Quat::to_array).collect();
                packer.pack_keyframes_vec4(&values)
            }
            TrackValues::Weights(values) => packer.pack_scalars(values),
        };

        animation.samplers.push(AnimationSampler {
            input,
            output,
            interpolation: track.interpolation,
        });
        animation.channels.push(AnimationChannel {
            sampler: animation.samplers.len() - 1,
            node: Some(track.node),
            path: track.path(),
        });
    }

    Ok(animation)
}
