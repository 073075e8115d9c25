//! glTF / GLB reader
//!
//! Bytes -> [`json::Root`] -> [`Document`]. Buffers are resolved from the GLB
//! BIN chunk, `data:` URIs or files next to the document. The finished
//! document has linked parents, has passed [`Document::validate`] and has
//! its skeletons determined before `post_parse` hooks see it.

use glam::{Quat, Vec3};
use std::path::Path;

use crate::error::{CodecError, Result};
use crate::extension::ExtensionRegistry;
use crate::glb;
use crate::json::{self, KHR_LIGHTS_PUNCTUAL, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS};
use crate::model::{
    Accessor, AccessorType, AlphaMode, Animation, AnimationChannel, AnimationSampler, AssetInfo,
    BufferTarget, BufferView, Camera, ComponentType, Document, Image, ImageSource, Interpolation,
    Light, LightKind, Material, Mesh, Node, Primitive, PrimitiveMode, Projection, Skin, SpecGloss,
    SparseAccessor, TargetPath, Texture, TextureRef, TextureSampler, Transform,
};
use crate::skeleton;
use crate::uri::Uri;

/// glTF extensions the reader decodes itself
pub const BUILTIN_EXTENSIONS: &[&str] = &[KHR_LIGHTS_PUNCTUAL, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS];

#[derive(Debug, Clone)]
pub struct DocumentReader {
    extensions: ExtensionRegistry,
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReader {
    /// Reader with the built-in extensions registered
    pub fn new() -> Self {
        Self::with_extensions(ExtensionRegistry::with_builtins())
    }

    pub fn with_extensions(extensions: ExtensionRegistry) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    /// Read a `.glb` or `.gltf` file, resolving external URIs next to it
    pub fn read_path(&self, path: &Path) -> Result<Document> {
        tracing::info!("Reading glTF: {}", path.display());
        let data = std::fs::read(path)?;
        self.read_slice(&data, path.parent())
    }

    /// Read GLB or JSON bytes; `base` is the directory for relative URIs
    pub fn read_slice(&self, data: &[u8], base: Option<&Path>) -> Result<Document> {
        let (json_bytes, bin) = if glb::is_glb(data) {
            let chunks = glb::split(data)?;
            (chunks.json, chunks.bin)
        } else {
            (data, None)
        };

        let mut root = json::Root::from_slice(json_bytes)?;
        self.extensions.pre_parse(&mut root)?;

        check_version(&root.asset)?;
        for required in &root.extensions_required {
            if !BUILTIN_EXTENSIONS.contains(&required.as_str())
                && !self.extensions.supports(required)
            {
                return Err(CodecError::UnsupportedExtension(required.clone()));
            }
        }

        let buffers = resolve_buffers(&root.buffers, bin, base)?;
        let mut document = convert_root(root, buffers, base)?;

        document.link_parents()?;
        if document.root_nodes.is_empty() {
            document.root_nodes = document.orphan_nodes();
        }
        document.validate()?;
        skeleton::determine_skeletons(&mut document)?;

        self.extensions.post_parse(&mut document)?;

        tracing::info!(
            "Read glTF document: {} nodes, {} meshes, {} skins, {} animations",
            document.nodes.len(),
            document.meshes.len(),
            document.skins.len(),
            document.animations.len()
        );
        Ok(document)
    }
}

fn check_version(asset: &json::Asset) -> Result<()> {
    let major = |version: &str| -> Option<(u32, u32)> {
        let (major, minor) = version.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    };

    match major(&asset.version) {
        Some((2, _)) => {}
        _ => return Err(CodecError::UnsupportedVersion(asset.version.clone())),
    }
    if let Some(min_version) = &asset.min_version {
        if major(min_version) != Some((2, 0)) {
            return Err(CodecError::UnsupportedVersion(min_version.clone()));
        }
    }
    Ok(())
}

fn resolve_buffers(
    buffers: &[json::Buffer],
    bin: Option<&[u8]>,
    base: Option<&Path>,
) -> Result<Vec<Vec<u8>>> {
    let mut resolved = Vec::with_capacity(buffers.len());
    for (index, buffer) in buffers.iter().enumerate() {
        let mut data = match (&buffer.uri, bin) {
            (Some(uri), _) => Uri::parse(uri)?.load(base)?,
            (None, Some(bin)) if index == 0 => bin.to_vec(),
            (None, _) => {
                return Err(CodecError::InvalidGlb(format!(
                    "Buffer {} has no URI and no BIN chunk backs it",
                    index
                )));
            }
        };

        if data.len() < buffer.byte_length {
            return Err(CodecError::Custom(format!(
                "Buffer {} holds {} bytes but declares byteLength {}",
                index,
                data.len(),
                buffer.byte_length
            )));
        }
        // BIN chunks carry up to 3 bytes of padding
        data.truncate(buffer.byte_length);
        resolved.push(data);
    }
    Ok(resolved)
}

fn convert_root(
    mut root: json::Root,
    buffers: Vec<Vec<u8>>,
    base: Option<&Path>,
) -> Result<Document> {
    let mut document = Document::new();

    document.asset = AssetInfo {
        version: root.asset.version,
        generator: root.asset.generator,
        copyright: root.asset.copyright,
        min_version: root.asset.min_version,
    };

    let scene_index = root.scene.or((!root.scenes.is_empty()).then_some(0));
    if let Some(index) = scene_index {
        let scene = root
            .scenes
            .get(index)
            .ok_or_else(|| CodecError::out_of_range("scene", index, root.scenes.len()))?;
        document.scene_name = scene.name.clone();
        document.root_nodes = scene.nodes.clone();
        if root.scenes.len() > 1 {
            tracing::warn!(
                "Document has {} scenes; only scene {} is imported",
                root.scenes.len(),
                index
            );
        }
    }

    if let Some(value) = root.extensions.remove(KHR_LIGHTS_PUNCTUAL) {
        let lights: json::LightsPunctual = serde_json::from_value(value)?;
        document.lights = lights
            .lights
            .into_iter()
            .map(convert_light)
            .collect::<Result<_>>()?;
    }

    document.nodes = root
        .nodes
        .into_iter()
        .map(convert_node)
        .collect::<Result<_>>()?;
    document.meshes = root
        .meshes
        .into_iter()
        .enumerate()
        .map(|(index, mesh)| convert_mesh(index, mesh))
        .collect::<Result<_>>()?;
    document.accessors = root
        .accessors
        .into_iter()
        .enumerate()
        .map(|(index, accessor)| convert_accessor(index, accessor))
        .collect::<Result<_>>()?;
    document.buffer_views = root.buffer_views.into_iter().map(convert_view).collect();
    document.buffers = buffers;
    document.skins = root.skins.into_iter().map(convert_skin).collect();
    document.animations = root
        .animations
        .into_iter()
        .enumerate()
        .map(|(index, animation)| convert_animation(index, animation))
        .collect::<Result<_>>()?;
    document.cameras = root
        .cameras
        .into_iter()
        .map(convert_camera)
        .collect::<Result<_>>()?;
    document.materials = root
        .materials
        .into_iter()
        .map(convert_material)
        .collect::<Result<_>>()?;
    document.textures = root
        .textures
        .into_iter()
        .map(|texture| Texture {
            name: texture.name,
            source: texture.source,
            sampler: texture.sampler,
        })
        .collect();
    document.images = root
        .images
        .into_iter()
        .enumerate()
        .map(|(index, image)| convert_image(index, image, base))
        .collect::<Result<_>>()?;
    document.samplers = root
        .samplers
        .into_iter()
        .map(|sampler| TextureSampler {
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            wrap_s: sampler.wrap_s.unwrap_or(TextureSampler::REPEAT),
            wrap_t: sampler.wrap_t.unwrap_or(TextureSampler::REPEAT),
        })
        .collect();

    document.extensions_used = root.extensions_used;
    document.extensions_required = root.extensions_required;
    document.extensions = root.extensions;
    document.extras = root.extras;
    Ok(document)
}

fn convert_node(node: json::Node) -> Result<Node> {
    let transform = match node.matrix {
        Some(matrix) => Transform::from_matrix(&matrix),
        None => {
            let rotation = node.rotation.map_or(Quat::IDENTITY, Quat::from_array);
            Transform {
                translation: node.translation.map_or(Vec3::ZERO, Vec3::from_array),
                rotation: if rotation.is_normalized() {
                    rotation
                } else {
                    rotation.normalize()
                },
                scale: node.scale.map_or(Vec3::ONE, Vec3::from_array),
            }
        }
    };

    let mut extensions = node.extensions;
    let light = match extensions.remove(KHR_LIGHTS_PUNCTUAL) {
        Some(value) => Some(serde_json::from_value::<json::NodeLight>(value)?.light),
        None => None,
    };

    Ok(Node {
        name: node.name,
        parent: None,
        children: node.children,
        transform,
        mesh: node.mesh,
        skin: node.skin,
        camera: node.camera,
        light,
        skeleton: None,
        joint: false,
        weights: node.weights,
        extensions,
        extras: node.extras,
    })
}

fn convert_light(light: json::Light) -> Result<Light> {
    let kind = match light.type_.as_str() {
        "directional" => LightKind::Directional,
        "point" => LightKind::Point,
        "spot" => {
            let spot = light.spot.unwrap_or_default();
            LightKind::Spot {
                inner_cone_angle: spot.inner_cone_angle.unwrap_or(0.0),
                outer_cone_angle: spot
                    .outer_cone_angle
                    .unwrap_or(Light::DEFAULT_OUTER_CONE_ANGLE),
            }
        }
        other => return Err(CodecError::Custom(format!("Unknown light type '{}'", other))),
    };

    Ok(Light {
        name: light.name,
        kind,
        color: light.color.unwrap_or([1.0; 3]),
        intensity: light.intensity.unwrap_or(1.0),
        range: light.range,
    })
}

fn convert_mesh(index: usize, mesh: json::Mesh) -> Result<Mesh> {
    let primitives = mesh
        .primitives
        .into_iter()
        .map(|primitive| {
            let mode = match primitive.mode {
                Some(mode) => PrimitiveMode::from_gl(mode).ok_or_else(|| CodecError::InvalidMesh {
                    mesh: index,
                    reason: format!("unknown primitive mode {}", mode),
                })?,
                None => PrimitiveMode::Triangles,
            };
            Ok(Primitive {
                attributes: primitive.attributes,
                indices: primitive.indices,
                material: primitive.material,
                mode,
                targets: primitive.targets,
                extensions: primitive.extensions,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Mesh {
        name: mesh.name,
        primitives,
        weights: mesh.weights,
        extensions: mesh.extensions,
        extras: mesh.extras,
    })
}

fn component_type(accessor: usize, value: u32) -> Result<ComponentType> {
    ComponentType::from_gl(value).ok_or_else(|| CodecError::InvalidAccessor {
        accessor,
        reason: format!("unknown component type {}", value),
    })
}

fn convert_accessor(index: usize, accessor: json::Accessor) -> Result<Accessor> {
    let accessor_type =
        AccessorType::parse(&accessor.type_).ok_or_else(|| CodecError::InvalidAccessor {
            accessor: index,
            reason: format!("unknown accessor type '{}'", accessor.type_),
        })?;

    let sparse = match accessor.sparse {
        Some(sparse) => Some(SparseAccessor {
            count: sparse.count,
            indices_buffer_view: sparse.indices.buffer_view,
            indices_byte_offset: sparse.indices.byte_offset,
            indices_component_type: component_type(index, sparse.indices.component_type)?,
            values_buffer_view: sparse.values.buffer_view,
            values_byte_offset: sparse.values.byte_offset,
        }),
        None => None,
    };

    Ok(Accessor {
        name: accessor.name,
        buffer_view: accessor.buffer_view,
        byte_offset: accessor.byte_offset.unwrap_or(0),
        component_type: component_type(index, accessor.component_type)?,
        accessor_type,
        normalized: accessor.normalized,
        count: accessor.count,
        min: accessor.min,
        max: accessor.max,
        sparse,
    })
}

fn convert_view(view: json::BufferView) -> BufferView {
    BufferView {
        name: view.name,
        buffer: view.buffer,
        byte_offset: view.byte_offset.unwrap_or(0),
        byte_length: view.byte_length,
        byte_stride: view.byte_stride,
        target: view.target.and_then(BufferTarget::from_gl),
    }
}

fn convert_skin(skin: json::Skin) -> Skin {
    Skin {
        name: skin.name,
        joints: skin.joints,
        inverse_bind_matrices: skin.inverse_bind_matrices,
        skeleton_root: skin.skeleton,
        skeleton: None,
    }
}

fn convert_animation(index: usize, animation: json::Animation) -> Result<Animation> {
    let samplers = animation
        .samplers
        .into_iter()
        .map(|sampler| {
            let interpolation = match sampler.interpolation.as_deref() {
                Some(value) => {
                    Interpolation::parse(value).ok_or_else(|| CodecError::InvalidAnimation {
                        animation: index,
                        reason: format!("unknown interpolation '{}'", value),
                    })?
                }
                None => Interpolation::Linear,
            };
            Ok(AnimationSampler {
                input: sampler.input,
                output: sampler.output,
                interpolation,
            })
        })
        .collect::<Result<_>>()?;

    let mut channels = Vec::with_capacity(animation.channels.len());
    for channel in animation.channels {
        match TargetPath::parse(&channel.target.path) {
            Some(path) => channels.push(AnimationChannel {
                sampler: channel.sampler,
                node: channel.target.node,
                path,
            }),
            None => tracing::warn!(
                "Animation {} channel targets unsupported path '{}', skipping",
                index,
                channel.target.path
            ),
        }
    }

    Ok(Animation {
        name: animation.name,
        channels,
        samplers,
    })
}

fn convert_camera(camera: json::Camera) -> Result<Camera> {
    let projection = match (camera.type_.as_str(), camera.perspective, camera.orthographic) {
        ("perspective", Some(p), _) => Projection::Perspective {
            yfov: p.yfov,
            aspect_ratio: p.aspect_ratio,
            znear: p.znear,
            zfar: p.zfar,
        },
        ("orthographic", _, Some(o)) => Projection::Orthographic {
            xmag: o.xmag,
            ymag: o.ymag,
            znear: o.znear,
            zfar: o.zfar,
        },
        (other, _, _) => {
            return Err(CodecError::Custom(format!(
                "Camera of type '{}' is missing its projection",
                other
            )));
        }
    };
    Ok(Camera {
        name: camera.name,
        projection,
    })
}

fn texture_ref(info: json::TextureInfo) -> TextureRef {
    TextureRef {
        texture: info.index,
        tex_coord: info.tex_coord,
    }
}

fn convert_material(material: json::Material) -> Result<Material> {
    let mut result = Material {
        name: material.name,
        ..Default::default()
    };

    if let Some(pbr) = material.pbr_metallic_roughness {
        result.base_color_factor = pbr.base_color_factor.unwrap_or([1.0; 4]);
        result.base_color_texture = pbr.base_color_texture.map(texture_ref);
        result.metallic_factor = pbr.metallic_factor.unwrap_or(1.0);
        result.roughness_factor = pbr.roughness_factor.unwrap_or(1.0);
        result.metallic_roughness_texture = pbr.metallic_roughness_texture.map(texture_ref);
    }
    if let Some(normal) = material.normal_texture {
        result.normal_scale = normal.scale.unwrap_or(1.0);
        result.normal_texture = Some(TextureRef {
            texture: normal.index,
            tex_coord: normal.tex_coord,
        });
    }
    if let Some(occlusion) = material.occlusion_texture {
        result.occlusion_strength = occlusion.strength.unwrap_or(1.0);
        result.occlusion_texture = Some(TextureRef {
            texture: occlusion.index,
            tex_coord: occlusion.tex_coord,
        });
    }
    result.emissive_texture = material.emissive_texture.map(texture_ref);
    result.emissive_factor = material.emissive_factor.unwrap_or([0.0; 3]);
    if let Some(mode) = material.alpha_mode {
        result.alpha_mode = AlphaMode::parse(&mode)
            .ok_or_else(|| CodecError::Custom(format!("Unknown alpha mode '{}'", mode)))?;
    }
    result.alpha_cutoff = material.alpha_cutoff.unwrap_or(0.5);
    result.double_sided = material.double_sided;

    let mut extensions = material.extensions;
    if let Some(value) = extensions.remove(KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS) {
        let sg: json::SpecularGlossiness = serde_json::from_value(value)?;
        let defaults = SpecGloss::default();
        result.spec_gloss = Some(SpecGloss {
            diffuse_factor: sg.diffuse_factor.unwrap_or(defaults.diffuse_factor),
            diffuse_texture: sg.diffuse_texture.map(texture_ref),
            specular_factor: sg.specular_factor.unwrap_or(defaults.specular_factor),
            glossiness_factor: sg.glossiness_factor.unwrap_or(defaults.glossiness_factor),
            specular_glossiness_texture: sg.specular_glossiness_texture.map(texture_ref),
        });
    }
    result.extensions = extensions;
    Ok(result)
}

fn convert_image(index: usize, image: json::Image, base: Option<&Path>) -> Result<Image> {
    let source = match (image.buffer_view, image.uri) {
        (Some(view), _) => ImageSource::BufferView(view),
        (None, Some(uri)) => {
            let data = match Uri::parse(&uri).and_then(|parsed| parsed.load(base)) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::warn!("Image {} could not be loaded from '{}': {}", index, uri, e);
                    None
                }
            };
            ImageSource::Uri { uri, data }
        }
        (None, None) => {
            return Err(CodecError::Custom(format!(
                "Image {} has neither a URI nor a buffer view",
                index
            )));
        }
    };

    Ok(Image {
        name: image.name,
        mime_type: image.mime_type,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(json: &str) -> Result<Document> {
        DocumentReader::new().read_slice(json.as_bytes(), None)
    }

    #[test]
    fn test_minimal_document() {
        let document = read(r#"{"asset":{"version":"2.0"}}"#).unwrap();
        assert!(document.nodes.is_empty());
        assert_eq!(document.asset.version, "2.0");
    }

    #[test]
    fn test_rejects_version_1() {
        assert!(matches!(
            read(r#"{"asset":{"version":"1.0"}}"#),
            Err(CodecError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_required_extension() {
        let json = r#"{"asset":{"version":"2.0"},"extensionsRequired":["EXT_unknown"]}"#;
        assert!(matches!(
            read(json),
            Err(CodecError::UnsupportedExtension(name)) if name == "EXT_unknown"
        ));
    }

    #[test]
    fn test_accepts_builtin_required_extension() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "extensionsUsed": ["KHR_lights_punctual"],
            "extensionsRequired": ["KHR_lights_punctual"],
            "extensions": {"KHR_lights_punctual": {"lights": [
                {"type": "spot", "intensity": 3.0, "spot": {"outerConeAngle": 0.5}}
            ]}},
            "nodes": [{"name": "lamp", "extensions": {"KHR_lights_punctual": {"light": 0}}}],
            "scenes": [{"nodes": [0]}]
        }"#;
        let document = read(json).unwrap();
        assert_eq!(document.lights.len(), 1);
        assert_eq!(
            document.lights[0].kind,
            LightKind::Spot {
                inner_cone_angle: 0.0,
                outer_cone_angle: 0.5
            }
        );
        assert_eq!(document.nodes[0].light, Some(0));
        assert!(document.nodes[0].extensions.is_empty());
        assert!(document.extensions.is_empty());
    }

    #[test]
    fn test_scene_roots_default_to_orphans() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "nodes": [{"children": [1]}, {}, {}]
        }"#;
        let document = read(json).unwrap();
        assert_eq!(document.root_nodes, vec![0, 2]);
        assert_eq!(document.nodes[1].parent, Some(0));
    }

    #[test]
    fn test_rejects_multiple_parents() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "nodes": [{"children": [2]}, {"children": [2]}, {}]
        }"#;
        assert!(matches!(
            read(json),
            Err(CodecError::MultipleParents { node: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_mesh() {
        let json = r#"{"asset":{"version":"2.0"},"nodes":[{"mesh":3}]}"#;
        assert!(matches!(
            read(json),
            Err(CodecError::IndexOutOfRange { kind: "mesh", index: 3, .. })
        ));
    }

    #[test]
    fn test_data_uri_buffer_and_matrix_node() {
        // Two floats, 1.0 and 2.0, little endian
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "data:application/octet-stream;base64,AACAPwAAAEA=", "byteLength": 8}],
            "bufferViews": [{"buffer": 0, "byteLength": 8}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"}],
            "nodes": [{"matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 5,6,7,1]}]
        }"#;
        let document = read(json).unwrap();
        assert_eq!(document.read_scalars(0).unwrap(), vec![1.0, 2.0]);
        assert_eq!(document.nodes[0].transform.translation, Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_buffer_shorter_than_declared() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "data:application/octet-stream;base64,AAAA", "byteLength": 8}]
        }"#;
        assert!(read(json).is_err());
    }

    #[test]
    fn test_spec_gloss_is_decoded() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "materials": [{"extensions": {"KHR_materials_pbrSpecularGlossiness": {
                "diffuseFactor": [0.5, 0.5, 0.5, 1.0], "glossinessFactor": 0.25
            }}}]
        }"#;
        let document = DocumentReader::with_extensions(ExtensionRegistry::new())
            .read_slice(json.as_bytes(), None)
            .unwrap();
        let spec_gloss = document.materials[0].spec_gloss.as_ref().unwrap();
        assert_eq!(spec_gloss.diffuse_factor, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(spec_gloss.glossiness_factor, 0.25);
        assert!(document.materials[0].extensions.is_empty());
    }

    #[test]
    fn test_unknown_animation_path_skipped() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "data:application/octet-stream;base64,AAAAAAAAgD8=", "byteLength": 8}],
            "bufferViews": [{"buffer": 0, "byteLength": 8}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"}],
            "nodes": [{}],
            "animations": [{
                "samplers": [{"input": 0, "output": 0}],
                "channels": [
                    {"sampler": 0, "target": {"node": 0, "path": "pointer"}},
                    {"sampler": 0, "target": {"node": 0, "path": "weights"}}
                ]
            }]
        }"#;
        let document = read(json).unwrap();
        assert_eq!(document.animations[0].channels.len(), 1);
        assert_eq!(document.animations[0].channels[0].path, TargetPath::Weights);
    }
}
