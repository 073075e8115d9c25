//! glTF / GLB writer
//!
//! [`Document`] -> [`json::Root`] -> bytes. In GLB output buffer 0 becomes
//! the BIN chunk; every other buffer, and every buffer of an embedded
//! `.gltf`, is written as a base64 `data:` URI.

use glam::{Quat, Vec3};
use std::path::Path;

use crate::error::{CodecError, Result};
use crate::extension::ExtensionRegistry;
use crate::glb;
use crate::json::{self, KHR_LIGHTS_PUNCTUAL, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS};
use crate::model::{
    Accessor, BufferView, Camera, Document, Image, ImageSource, Interpolation, Light, LightKind,
    Material, Mesh, Node, PrimitiveMode, Projection, TextureRef, TextureSampler,
};
use crate::uri::encode_data_uri;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct DocumentWriter {
    extensions: ExtensionRegistry,
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter {
    /// Writer with the built-in extensions registered
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

    /// Encode as a binary `.glb`
    pub fn to_glb(&self, document: &Document) -> Result<Vec<u8>> {
        let document = self.prepare(document)?;
        let uris = (0..document.buffers.len())
            .map(|i| (i > 0).then(|| encode_data_uri(OCTET_STREAM, &document.buffers[i])))
            .collect();
        let root = to_root(&document, uris)?;
        let json = root.to_vec()?;
        glb::assemble(&json, document.buffers.first().map(Vec::as_slice))
    }

    /// Encode as a self-contained `.gltf` with `data:` URI buffers
    pub fn to_gltf_embedded(&self, document: &Document) -> Result<Vec<u8>> {
        let document = self.prepare(document)?;
        let uris = document
            .buffers
            .iter()
            .map(|buffer| Some(encode_data_uri(OCTET_STREAM, buffer)))
            .collect();
        Ok(serde_json::to_vec_pretty(&to_root(&document, uris)?)?)
    }

    /// Write to `path`: `.glb` as binary, anything else as `.gltf` with sidecar `.bin` files
    pub fn write_path(&self, document: &Document, path: &Path) -> Result<()> {
        let is_glb = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"));
        if is_glb {
            std::fs::write(path, self.to_glb(document)?)?;
        } else {
            let document = self.prepare(document)?;
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| CodecError::Custom(format!("Invalid output path {:?}", path)))?;
            let dir = path.parent().unwrap_or_else(|| Path::new(""));

            let mut uris = Vec::with_capacity(document.buffers.len());
            for (index, buffer) in document.buffers.iter().enumerate() {
                let name = if index == 0 {
                    format!("{}.bin", stem)
                } else {
                    format!("{}_{}.bin", stem, index)
                };
                std::fs::write(dir.join(&name), buffer)?;
                uris.push(Some(name));
            }
            let root = to_root(&document, uris)?;
            std::fs::write(path, serde_json::to_vec_pretty(&root)?)?;
        }
        tracing::info!("Wrote glTF: {}", path.display());
        Ok(())
    }

    fn prepare(&self, document: &Document) -> Result<Document> {
        let mut document = document.clone();
        self.extensions.pre_serialize(&mut document)?;
        document.validate()?;
        Ok(document)
    }
}

/// Convert a validated document; `buffer_uris[i]` is the URI of buffer `i` (`None` for the GLB chunk)
fn to_root(document: &Document, buffer_uris: Vec<Option<String>>) -> Result<json::Root> {
    let mut extensions_used: Vec<String> = document
        .extensions_used
        .iter()
        .filter(|name| {
            name.as_str() != KHR_LIGHTS_PUNCTUAL
                && name.as_str() != KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS
        })
        .cloned()
        .collect();
    let mut extensions = document.extensions.clone();

    if !document.lights.is_empty() {
        let lights = json::LightsPunctual {
            lights: document.lights.iter().map(light_to_json).collect(),
        };
        extensions.insert(KHR_LIGHTS_PUNCTUAL.to_string(), serde_json::to_value(lights)?);
        extensions_used.push(KHR_LIGHTS_PUNCTUAL.to_string());
    }
    if document.materials.iter().any(|m| m.spec_gloss.is_some()) {
        extensions_used.push(KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS.to_string());
    }

    Ok(json::Root {
        asset: json::Asset {
            version: document.asset.version.clone(),
            generator: document.asset.generator.clone(),
            copyright: document.asset.copyright.clone(),
            min_version: document.asset.min_version.clone(),
        },
        scene: Some(0),
        scenes: vec![json::Scene {
            name: document.scene_name.clone(),
            nodes: document.root_nodes.clone(),
            ..Default::default()
        }],
        nodes: document
            .nodes
            .iter()
            .map(node_to_json)
            .collect::<Result<_>>()?,
        meshes: document.meshes.iter().map(mesh_to_json).collect(),
        accessors: document.accessors.iter().map(accessor_to_json).collect(),
        buffer_views: document.buffer_views.iter().map(view_to_json).collect(),
        buffers: document
            .buffers
            .iter()
            .zip(buffer_uris)
            .map(|(buffer, uri)| json::Buffer {
                uri,
                byte_length: buffer.len(),
                ..Default::default()
            })
            .collect(),
        skins: document
            .skins
            .iter()
            .map(|skin| json::Skin {
                name: skin.name.clone(),
                inverse_bind_matrices: skin.inverse_bind_matrices,
                skeleton: skin.skeleton_root,
                joints: skin.joints.clone(),
                ..Default::default()
            })
            .collect(),
        animations: document
            .animations
            .iter()
            .map(|animation| json::Animation {
                name: animation.name.clone(),
                channels: animation
                    .channels
                    .iter()
                    .map(|channel| json::Channel {
                        sampler: channel.sampler,
                        target: json::ChannelTarget {
                            node: channel.node,
                            path: channel.path.as_str().to_string(),
                        },
                    })
                    .collect(),
                samplers: animation
                    .samplers
                    .iter()
                    .map(|sampler| json::AnimationSampler {
                        input: sampler.input,
                        output: sampler.output,
                        interpolation: (sampler.interpolation != Interpolation::Linear)
                            .then(|| sampler.interpolation.as_str().to_string()),
                    })
                    .collect(),
                ..Default::default()
            })
            .collect(),
        cameras: document.cameras.iter().map(camera_to_json).collect(),
        materials: document
            .materials
            .iter()
            .map(material_to_json)
            .collect::<Result<_>>()?,
        textures: document
            .textures
            .iter()
            .map(|texture| json::Texture {
                name: texture.name.clone(),
                sampler: texture.sampler,
                source: texture.source,
                ..Default::default()
            })
            .collect(),
        images: document.images.iter().map(image_to_json).collect(),
        samplers: document.samplers.iter().map(sampler_to_json).collect(),
        extensions_used,
        extensions_required: document.extensions_required.clone(),
        extensions,
        extras: document.extras.clone(),
    })
}

fn node_to_json(node: &Node) -> Result<json::Node> {
    let transform = &node.transform;
    let mut extensions = node.extensions.clone();
    if let Some(light) = node.light {
        extensions.insert(
            KHR_LIGHTS_PUNCTUAL.to_string(),
            serde_json::to_value(json::NodeLight { light })?,
        );
    }

    Ok(json::Node {
        name: node.name.clone(),
        children: node.children.clone(),
        matrix: None,
        translation: (transform.translation != Vec3::ZERO)
            .then(|| transform.translation.to_array()),
        rotation: (transform.rotation != Quat::IDENTITY).then(|| transform.rotation.to_array()),
        scale: (transform.scale != Vec3::ONE).then(|| transform.scale.to_array()),
        mesh: node.mesh,
        skin: node.skin,
        camera: node.camera,
        weights: node.weights.clone(),
        extensions,
        extras: node.extras.clone(),
    })
}

fn mesh_to_json(mesh: &Mesh) -> json::Mesh {
    json::Mesh {
        name: mesh.name.clone(),
        primitives: mesh
            .primitives
            .iter()
            .map(|primitive| json::Primitive {
                attributes: primitive.attributes.clone(),
                indices: primitive.indices,
                material: primitive.material,
                mode: (primitive.mode != PrimitiveMode::Triangles).then(|| primitive.mode.to_gl()),
                targets: primitive.targets.clone(),
                extensions: primitive.extensions.clone(),
                extras: None,
            })
            .collect(),
        weights: mesh.weights.clone(),
        extensions: mesh.extensions.clone(),
        extras: mesh.extras.clone(),
    }
}

fn accessor_to_json(accessor: &Accessor) -> json::Accessor {
    json::Accessor {
        name: accessor.name.clone(),
        buffer_view: accessor.buffer_view,
        byte_offset: (accessor.byte_offset != 0).then_some(accessor.byte_offset),
        component_type: accessor.component_type.to_gl(),
        normalized: accessor.normalized,
        count: accessor.count,
        type_: accessor.accessor_type.as_str().to_string(),
        min: accessor.min.clone(),
        max: accessor.max.clone(),
        sparse: accessor.sparse.as_ref().map(|sparse| json::Sparse {
            count: sparse.count,
            indices: json::SparseIndices {
                buffer_view: sparse.indices_buffer_view,
                byte_offset: sparse.indices_byte_offset,
                component_type: sparse.indices_component_type.to_gl(),
            },
            values: json::SparseValues {
                buffer_view: sparse.values_buffer_view,
                byte_offset: sparse.values_byte_offset,
            },
        }),
        ..Default::default()
    }
}

fn view_to_json(view: &BufferView) -> json::BufferView {
    json::BufferView {
        name: view.name.clone(),
        buffer: view.buffer,
        byte_offset: (view.byte_offset != 0).then_some(view.byte_offset),
        byte_length: view.byte_length,
        byte_stride: view.byte_stride,
        target: view.target.map(|target| target.to_gl()),
        ..Default::default()
    }
}

fn light_to_json(light: &Light) -> json::Light {
    let spot = match light.kind {
        LightKind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => Some(json::Spot {
            inner_cone_angle: Some(inner_cone_angle),
            outer_cone_angle: Some(outer_cone_angle),
        }),
        _ => None,
    };
    json::Light {
        name: light.name.clone(),
        type_: light.kind.as_str().to_string(),
        color: (light.color != [1.0; 3]).then_some(light.color),
        intensity: (light.intensity != 1.0).then_some(light.intensity),
        range: light.range,
        spot,
    }
}

fn camera_to_json(camera: &Camera) -> json::Camera {
    let mut result = json::Camera {
        name: camera.name.clone(),
        ..Default::default()
    };
    match camera.projection {
        Projection::Perspective {
            yfov,
            aspect_ratio,
            znear,
            zfar,
        } => {
            result.type_ = "perspective".to_string();
            result.perspective = Some(json::Perspective {
                aspect_ratio,
                yfov,
                zfar,
                znear,
            });
        }
        Projection::Orthographic {
            xmag,
            ymag,
            znear,
            zfar,
        } => {
            result.type_ = "orthographic".to_string();
            result.orthographic = Some(json::Orthographic {
                xmag,
                ymag,
                zfar,
                znear,
            });
        }
    }
    result
}

fn texture_info(texture: TextureRef) -> json::TextureInfo {
    json::TextureInfo {
        index: texture.texture,
        tex_coord: texture.tex_coord,
    }
}

fn material_to_json(material: &Material) -> Result<json::Material> {
    let defaults = Material::default();
    let mut extensions = material.extensions.clone();
    if let Some(sg) = &material.spec_gloss {
        let value = json::SpecularGlossiness {
            diffuse_factor: Some(sg.diffuse_factor),
            diffuse_texture: sg.diffuse_texture.map(texture_info),
            specular_factor: Some(sg.specular_factor),
            glossiness_factor: Some(sg.glossiness_factor),
            specular_glossiness_texture: sg.specular_glossiness_texture.map(texture_info),
        };
        extensions.insert(
            KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS.to_string(),
            serde_json::to_value(value)?,
        );
    }

    Ok(json::Material {
        name: material.name.clone(),
        pbr_metallic_roughness: Some(json::PbrMetallicRoughness {
            base_color_factor: (material.base_color_factor != defaults.base_color_factor)
                .then_some(material.base_color_factor),
            base_color_texture: material.base_color_texture.map(texture_info),
            metallic_factor: (material.metallic_factor != defaults.metallic_factor)
                .then_some(material.metallic_factor),
            roughness_factor: (material.roughness_factor != defaults.roughness_factor)
                .then_some(material.roughness_factor),
            metallic_roughness_texture: material.metallic_roughness_texture.map(texture_info),
        }),
        normal_texture: material.normal_texture.map(|t| json::NormalTextureInfo {
            index: t.texture,
            tex_coord: t.tex_coord,
            scale: (material.normal_scale != 1.0).then_some(material.normal_scale),
        }),
        occlusion_texture: material.occlusion_texture.map(|t| json::OcclusionTextureInfo {
            index: t.texture,
            tex_coord: t.tex_coord,
            strength: (material.occlusion_strength != 1.0).then_some(material.occlusion_strength),
        }),
        emissive_texture: material.emissive_texture.map(texture_info),
        emissive_factor: (material.emissive_factor != defaults.emissive_factor)
            .then_some(material.emissive_factor),
        alpha_mode: (material.alpha_mode != defaults.alpha_mode)
            .then(|| material.alpha_mode.as_str().to_string()),
        alpha_cutoff: (material.alpha_cutoff != defaults.alpha_cutoff)
            .then_some(material.alpha_cutoff),
        double_sided: material.double_sided,
        extensions,
        extras: None,
    })
}

fn image_to_json(image: &Image) -> json::Image {
    let (uri, buffer_view) = match &image.source {
        ImageSource::BufferView(view) => (None, Some(*view)),
        ImageSource::Uri { uri, .. } => (Some(uri.clone()), None),
    };
    json::Image {
        name: image.name.clone(),
        uri,
        mime_type: image.mime_type.clone(),
        buffer_view,
        ..Default::default()
    }
}

fn sampler_to_json(sampler: &TextureSampler) -> json::Sampler {
    json::Sampler {
        name: None,
        mag_filter: sampler.mag_filter,
        min_filter: sampler.min_filter,
        wrap_s: (sampler.wrap_s != TextureSampler::REPEAT).then_some(sampler.wrap_s),
        wrap_t: (sampler.wrap_t != TextureSampler::REPEAT).then_some(sampler.wrap_t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessorType, ComponentType, Transform};
    use crate::reader::DocumentReader;

    fn sample_document() -> Document {
        let mut document = Document::new();
        document.buffers = vec![bytemuck::cast_slice::<f32, u8>(&[0.0, 1.0, 2.0]).to_vec()];
        document.buffer_views = vec![BufferView {
            name: None,
            buffer: 0,
            byte_offset: 0,
            byte_length: 12,
            byte_stride: None,
            target: None,
        }];
        document.accessors = vec![Accessor::new(
            Some(0),
            ComponentType::F32,
            AccessorType::Scalar,
            3,
        )];
        let mut node = Node::named("lamp");
        node.transform = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        node.light = Some(0);
        document.nodes = vec![node];
        document.lights = vec![Light::new(LightKind::Point)];
        document.root_nodes = vec![0];
        document.scene_name = Some("Scene".to_string());
        document
    }

    #[test]
    fn test_glb_round_trip() {
        let document = sample_document();
        let glb = DocumentWriter::new().to_glb(&document).unwrap();
        assert!(glb::is_glb(&glb));
        assert_eq!(glb.len() % 4, 0);

        let read = DocumentReader::new().read_slice(&glb, None).unwrap();
        assert_eq!(read.read_scalars(0).unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(read.nodes[0].light, Some(0));
        assert_eq!(read.nodes[0].transform.translation, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(read.scene_name.as_deref(), Some("Scene"));
        assert_eq!(read.extensions_used, vec![KHR_LIGHTS_PUNCTUAL.to_string()]);
    }

    #[test]
    fn test_embedded_gltf_round_trip() {
        let document = sample_document();
        let bytes = DocumentWriter::new().to_gltf_embedded(&document).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("data:application/octet-stream;base64,"));

        let read = DocumentReader::new().read_slice(&bytes, None).unwrap();
        assert_eq!(read.buffers, document.buffers);
    }

    #[test]
    fn test_sidecar_bin_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        DocumentWriter::new()
            .write_path(&sample_document(), &path)
            .unwrap();

        assert!(dir.path().join("scene.bin").is_file());
        let read = DocumentReader::new().read_path(&path).unwrap();
        assert_eq!(read.read_scalars(0).unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_invalid_document_not_written() {
        let mut document = sample_document();
        document.nodes[0].mesh = Some(7);
        assert!(DocumentWriter::new().to_glb(&document).is_err());
    }

    #[test]
    fn test_defaults_omitted_from_json() {
        let mut document = Document::new();
        document.nodes = vec![Node::named("empty")];
        document.root_nodes = vec![0];
        let bytes = DocumentWriter::new().to_gltf_embedded(&document).unwrap();
        let root = json::Root::from_slice(&bytes).unwrap();
        assert_eq!(root.nodes[0].translation, None);
        assert_eq!(root.nodes[0].rotation, None);
        assert!(root.buffers.is_empty());
    }
}
