//! In-memory glTF document (`GLTFState`)
//!
//! The document keeps glTF's index-based structure: nodes, meshes, skins and
//! animations refer to each other and to accessors by position in the owning
//! arrays. Every index is range-checked by [`Document::validate`] before the
//! writer or the scene builder dereferences it.

pub mod accessor;
pub mod animation;
pub mod buffer;
pub mod camera;
pub mod material;
pub mod mesh;
pub mod node;
pub mod skin;

use glam::Mat4;

use crate::error::{CodecError, Result};
use crate::json::Extensions;

pub use accessor::{Accessor, AccessorType, ComponentType, SparseAccessor};
pub use animation::{Animation, AnimationChannel, AnimationSampler, Interpolation, TargetPath};
pub use buffer::{BufferTarget, BufferView};
pub use camera::{Camera, Light, LightKind, Projection};
pub use material::{
    AlphaMode, Image, ImageSource, Material, SpecGloss, Texture, TextureRef, TextureSampler,
};
pub use mesh::{Mesh, Primitive, PrimitiveMode, semantic};
pub use node::{Node, Transform};
pub use skin::{Skeleton, Skin};

/// `asset` block of a glTF file
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    pub version: String,
    pub generator: Option<String>,
    pub copyright: Option<String>,
    pub min_version: Option<String>,
}

impl Default for AssetInfo {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: Some(concat!("gltf-codec ", env!("CARGO_PKG_VERSION")).to_string()),
            copyright: None,
            min_version: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub asset: AssetInfo,
    pub scene_name: Option<String>,
    /// Root nodes of the default scene
    pub root_nodes: Vec<usize>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    /// Resolved buffer contents
    pub buffers: Vec<Vec<u8>>,
    pub skins: Vec<Skin>,
    pub skeletons: Vec<Skeleton>,
    pub animations: Vec<Animation>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub samplers: Vec<TextureSampler>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    /// Unhandled root extension objects
    pub extensions: Extensions,
    pub extras: Option<serde_json::Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an extension in `extensionsUsed` (once)
    pub fn mark_extension_used(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|e| e == name) {
            self.extensions_used.push(name.to_string());
        }
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor> {
        self.accessors
            .get(index)
            .ok_or_else(|| CodecError::out_of_range("accessor", index, self.accessors.len()))
    }

    /// Decode an accessor into flat float components
    pub fn read_f32(&self, index: usize) -> Result<Vec<f32>> {
        self.accessor(index)?
            .read_f32(index, &self.buffer_views, &self.buffers)
    }

    /// Decode an unsigned integer accessor
    pub fn read_u32(&self, index: usize) -> Result<Vec<u32>> {
        self.accessor(index)?
            .read_u32(index, &self.buffer_views, &self.buffers)
    }

    /// Decode a SCALAR float accessor
    pub fn read_scalars(&self, index: usize) -> Result<Vec<f32>> {
        self.expect_type(index, AccessorType::Scalar)?;
        self.read_f32(index)
    }

    pub fn read_vec2(&self, index: usize) -> Result<Vec<[f32; 2]>> {
        self.read_arrays(index, AccessorType::Vec2)
    }

    pub fn read_vec3(&self, index: usize) -> Result<Vec<[f32; 3]>> {
        self.read_arrays(index, AccessorType::Vec3)
    }

    pub fn read_vec4(&self, index: usize) -> Result<Vec<[f32; 4]>> {
        self.read_arrays(index, AccessorType::Vec4)
    }

    /// Decode a VEC3 or VEC4 color accessor as RGBA
    pub fn read_colors(&self, index: usize) -> Result<Vec<[f32; 4]>> {
        match self.accessor(index)?.accessor_type {
            AccessorType::Vec3 => Ok(self
                .read_vec3(index)?
                .into_iter()
                .map(|[r, g, b]| [r, g, b, 1.0])
                .collect()),
            _ => self.read_vec4(index),
        }
    }

    /// Decode a VEC4 unsigned accessor (joint indices)
    pub fn read_joints(&self, index: usize) -> Result<Vec<[u16; 4]>> {
        self.expect_type(index, AccessorType::Vec4)?;
        let values = self.read_u32(index)?;
        let mut joints = Vec::with_capacity(values.len() / 4);
        for chunk in values.chunks_exact(4) {
            let mut joint = [0u16; 4];
            for (slot, value) in joint.iter_mut().zip(chunk) {
                *slot = u16::try_from(*value).map_err(|_| CodecError::InvalidAccessor {
                    accessor: index,
                    reason: format!("joint index {} does not fit in 16 bits", value),
                })?;
            }
            joints.push(joint);
        }
        Ok(joints)
    }

    pub fn read_mat4(&self, index: usize) -> Result<Vec<Mat4>> {
        Ok(self
            .read_arrays::<16>(index, AccessorType::Mat4)?
            .iter()
            .map(Mat4::from_cols_array)
            .collect())
    }

    fn expect_type(&self, index: usize, expected: AccessorType) -> Result<()> {
        let actual = self.accessor(index)?.accessor_type;
        if actual != expected {
            return Err(CodecError::InvalidAccessor {
                accessor: index,
                reason: format!("expected {}, got {}", expected.as_str(), actual.as_str()),
            });
        }
        Ok(())
    }

    fn read_arrays<const N: usize>(
        &self,
        index: usize,
        expected: AccessorType,
    ) -> Result<Vec<[f32; N]>> {
        self.expect_type(index, expected)?;
        let values = self.read_f32(index)?;
        Ok(values
            .chunks_exact(N)
            .map(|chunk| {
                let mut array = [0.0; N];
                array.copy_from_slice(chunk);
                array
            })
            .collect())
    }

    /// Rebuild every node's `parent` from the `children` lists
    pub fn link_parents(&mut self) -> Result<()> {
        let parents = self.parent_table()?;
        for (node, parent) in self.nodes.iter_mut().zip(parents) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Parent of each node derived from `children`, rejecting shared children
    fn parent_table(&self) -> Result<Vec<Option<usize>>> {
        let count = self.nodes.len();
        let mut parents: Vec<Option<usize>> = vec![None; count];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= count {
                    return Err(CodecError::out_of_range("node", child, count));
                }
                if child == index {
                    return Err(CodecError::CyclicNodeGraph(index));
                }
                if let Some(first) = parents[child] {
                    return Err(CodecError::MultipleParents {
                        node: child,
                        first,
                        second: index,
                    });
                }
                parents[child] = Some(index);
            }
        }
        Ok(parents)
    }

    /// Nodes without a parent, in index order
    pub fn orphan_nodes(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].parent.is_none())
            .collect()
    }

    /// Check every cross-reference and structural invariant
    pub fn validate(&self) -> Result<()> {
        self.validate_buffers()?;
        self.validate_accessors()?;
        self.validate_nodes()?;
        self.validate_meshes()?;
        self.validate_skins()?;
        self.validate_animations()?;
        self.validate_materials()?;
        Ok(())
    }

    fn validate_buffers(&self) -> Result<()> {
        for (index, view) in self.buffer_views.iter().enumerate() {
            let buffer = self.buffers.get(view.buffer).ok_or_else(|| {
                CodecError::out_of_range("buffer", view.buffer, self.buffers.len())
            })?;
            if view.end() > buffer.len() {
                return Err(CodecError::BufferViewOutOfBounds {
                    view: index,
                    buffer: view.buffer,
                    start: view.byte_offset,
                    end: view.end(),
                    len: buffer.len(),
                });
            }
            if let Some(stride) = view.byte_stride {
                if !(4..=252).contains(&stride) || stride % 4 != 0 {
                    return Err(CodecError::Custom(format!(
                        "Buffer view {} has invalid byte stride {}",
                        index, stride
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_accessors(&self) -> Result<()> {
        let views = self.buffer_views.len();
        for (index, accessor) in self.accessors.iter().enumerate() {
            if let Some(view) = accessor.buffer_view {
                check_index("buffer view", view, views)?;
            }
            if let Some(sparse) = &accessor.sparse {
                check_index("buffer view", sparse.indices_buffer_view, views)?;
                check_index("buffer view", sparse.values_buffer_view, views)?;
            }
            if accessor.normalized
                && matches!(
                    accessor.component_type,
                    ComponentType::F32 | ComponentType::U32
                )
            {
                return Err(CodecError::InvalidAccessor {
                    accessor: index,
                    reason: "float and u32 accessors cannot be normalized".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_nodes(&self) -> Result<()> {
        let count = self.nodes.len();
        let parents = self.parent_table()?;

        for (index, node) in self.nodes.iter().enumerate() {
            if node.parent != parents[index] {
                return Err(CodecError::Custom(format!(
                    "Node {} parent {:?} disagrees with children lists ({:?})",
                    index, node.parent, parents[index]
                )));
            }
            if let Some(mesh) = node.mesh {
                check_index("mesh", mesh, self.meshes.len())?;
            }
            if let Some(skin) = node.skin {
                check_index("skin", skin, self.skins.len())?;
            }
            if let Some(camera) = node.camera {
                check_index("camera", camera, self.cameras.len())?;
            }
            if let Some(light) = node.light {
                check_index("light", light, self.lights.len())?;
            }
            if let Some(skeleton) = node.skeleton {
                check_index("skeleton", skeleton, self.skeletons.len())?;
            }
        }

        // Parent chains must terminate: 0 = unvisited, 1 = on current path, 2 = done
        let mut state = vec![0u8; count];
        for start in 0..count {
            let mut path = Vec::new();
            let mut current = Some(start);
            while let Some(node) = current {
                match state[node] {
                    2 => break,
                    1 => return Err(CodecError::CyclicNodeGraph(node)),
                    _ => {
                        state[node] = 1;
                        path.push(node);
                        current = parents[node];
                    }
                }
            }
            for node in path {
                state[node] = 2;
            }
        }

        for &root in &self.root_nodes {
            check_index("node", root, count)?;
            if parents[root].is_some() {
                return Err(CodecError::Custom(format!(
                    "Scene root node {} has a parent",
                    root
                )));
            }
        }

        Ok(())
    }

    fn validate_meshes(&self) -> Result<()> {
        let accessors = self.accessors.len();
        for (index, mesh) in self.meshes.iter().enumerate() {
            if mesh.primitives.is_empty() {
                return Err(CodecError::InvalidMesh {
                    mesh: index,
                    reason: "mesh has no primitives".to_string(),
                });
            }
            for primitive in &mesh.primitives {
                for &accessor in primitive.attributes.values() {
                    check_index("accessor", accessor, accessors)?;
                }
                for target in &primitive.targets {
                    for &accessor in target.values() {
                        check_index("accessor", accessor, accessors)?;
                    }
                }
                if let Some(indices) = primitive.indices {
                    let accessor = self.accessor(indices)?;
                    if accessor.accessor_type != AccessorType::Scalar
                        || !accessor.component_type.is_unsigned_int()
                    {
                        return Err(CodecError::InvalidMesh {
                            mesh: index,
                            reason: format!(
                                "index accessor {} must be an unsigned SCALAR",
                                indices
                            ),
                        });
                    }
                }
                if let Some(material) = primitive.material {
                    check_index("material", material, self.materials.len())?;
                }
            }
        }
        Ok(())
    }

    fn validate_skins(&self) -> Result<()> {
        for (index, skin) in self.skins.iter().enumerate() {
            if skin.joints.is_empty() {
                return Err(CodecError::InvalidSkin {
                    skin: index,
                    reason: "skin has no joints".to_string(),
                });
            }
            for &joint in &skin.joints {
                check_index("node", joint, self.nodes.len())?;
            }
            if let Some(root) = skin.skeleton_root {
                check_index("node", root, self.nodes.len())?;
            }
            if let Some(skeleton) = skin.skeleton {
                check_index("skeleton", skeleton, self.skeletons.len())?;
            }
            if let Some(ibm) = skin.inverse_bind_matrices {
                let accessor = self.accessor(ibm)?;
                if accessor.accessor_type != AccessorType::Mat4 {
                    return Err(CodecError::InvalidSkin {
                        skin: index,
                        reason: "inverse bind matrices must be MAT4".to_string(),
                    });
                }
                if accessor.count < skin.joints.len() {
                    return Err(CodecError::InvalidSkin {
                        skin: index,
                        reason: format!(
                            "{} inverse bind matrices for {} joints",
                            accessor.count,
                            skin.joints.len()
                        ),
                    });
                }
            }
        }
        for skeleton in &self.skeletons {
            for &joint in &skeleton.joints {
                check_index("node", joint, self.nodes.len())?;
            }
        }
        Ok(())
    }

    fn validate_animations(&self) -> Result<()> {
        for (index, animation) in self.animations.iter().enumerate() {
            for sampler in &animation.samplers {
                let input = self.accessor(sampler.input)?;
                if input.accessor_type != AccessorType::Scalar
                    || input.component_type != ComponentType::F32
                {
                    return Err(CodecError::InvalidAnimation {
                        animation: index,
                        reason: format!(
                            "sampler input {} must be a float SCALAR",
                            sampler.input
                        ),
                    });
                }
                check_index("accessor", sampler.output, self.accessors.len())?;
            }
            for channel in &animation.channels {
                check_index("animation sampler", channel.sampler, animation.samplers.len())?;
                if let Some(node) = channel.node {
                    check_index("node", node, self.nodes.len())?;
                }
            }
        }
        Ok(())
    }

    fn validate_materials(&self) -> Result<()> {
        for material in &self.materials {
            for texture in material.texture_refs() {
                check_index("texture", texture.texture, self.textures.len())?;
            }
        }
        for texture in &self.textures {
            if let Some(source) = texture.source {
                check_index("image", source, self.images.len())?;
            }
            if let Some(sampler) = texture.sampler {
                check_index("sampler", sampler, self.samplers.len())?;
            }
        }
        for image in &self.images {
            if let ImageSource::BufferView(view) = image.source {
                check_index("buffer view", view, self.buffer_views.len())?;
            }
        }
        Ok(())
    }
}

fn check_index(kind: &'static str, index: usize, count: usize) -> Result<()> {
    if index >= count {
        return Err(CodecError::out_of_range(kind, index, count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(count: usize) -> Document {
        let mut document = Document::new();
        for i in 0..count {
            let mut node = Node::named(&format!("n{}", i));
            if i + 1 < count {
                node.children.push(i + 1);
            }
            document.nodes.push(node);
        }
        document.root_nodes = vec![0];
        document
    }

    #[test]
    fn test_link_parents() {
        let mut document = chain(3);
        document.link_parents().unwrap();
        assert_eq!(document.nodes[0].parent, None);
        assert_eq!(document.nodes[1].parent, Some(0));
        assert_eq!(document.nodes[2].parent, Some(1));
        assert_eq!(document.orphan_nodes(), vec![0]);
        document.validate().unwrap();
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut document = chain(3);
        document.nodes[2].children.push(0);
        document.root_nodes.clear();
        // Every node now has exactly one parent, so only the cycle walk catches it
        document.link_parents().unwrap();
        assert!(matches!(
            document.validate(),
            Err(CodecError::CyclicNodeGraph(_))
        ));
    }

    #[test]
    fn test_multiple_parents_rejected() {
        let mut document = chain(2);
        document.nodes.push(Node {
            children: vec![1],
            ..Default::default()
        });
        assert!(matches!(
            document.link_parents(),
            Err(CodecError::MultipleParents { node: 1, .. })
        ));
    }

    #[test]
    fn test_out_of_range_mesh() {
        let mut document = chain(1);
        document.nodes[0].mesh = Some(4);
        assert!(matches!(
            document.validate(),
            Err(CodecError::IndexOutOfRange { kind: "mesh", index: 4, count: 0 })
        ));
    }

    #[test]
    fn test_stale_parent_rejected() {
        let mut document = chain(2);
        // parent field was never linked
        assert!(document.validate().is_err());
        document.link_parents().unwrap();
        assert!(document.validate().is_ok());
    }

    #[test]
    fn test_mark_extension_used_once() {
        let mut document = Document::new();
        document.mark_extension_used("KHR_lights_punctual");
        document.mark_extension_used("KHR_lights_punctual");
        assert_eq!(document.extensions_used.len(), 1);
    }
}
