//! Engine-agnostic scene tree
//!
//! [`SceneBuilder`] turns a [`Document`](crate::model::Document) into a
//! [`SceneTree`] with decoded vertex data, and [`SceneFlattener`] packs a tree
//! back into a document. Tree node indices match document node indices in
//! both directions.

pub mod animation;
pub mod build;
pub mod flatten;

use glam::Mat4;

use crate::json::Extensions;
use crate::model::{Camera, Light, Material, PrimitiveMode, TextureSampler, Transform};

pub use animation::{AnimationClip, AnimationTrack, TrackSample, TrackValues};
pub use build::SceneBuilder;
pub use flatten::SceneFlattener;

/// Mesh attached to a node, with its skin binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh: usize,
    pub skin: Option<usize>,
    pub skeleton: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    /// Unique within the tree, never empty
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub transform: Transform,
    pub mesh: Option<MeshInstance>,
    pub camera: Option<usize>,
    pub light: Option<usize>,
    /// Skeleton this node is a joint of
    pub skeleton: Option<usize>,
    pub weights: Vec<f32>,
    pub extensions: Extensions,
    pub extras: Option<serde_json::Value>,
}

impl SceneNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_joint(&self) -> bool {
        self.skeleton.is_some()
    }
}

/// Morph target deltas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimitiveData {
    pub mode: PrimitiveMode,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    /// One entry per TEXCOORD_n set
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    pub colors: Vec<[f32; 4]>,
    /// One entry per JOINTS_n set
    pub joints: Vec<Vec<[u16; 4]>>,
    /// One entry per WEIGHTS_n set
    pub weights: Vec<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<usize>,
    pub targets: Vec<MorphTarget>,
}

impl PrimitiveData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveData>,
    pub weights: Vec<f32>,
}

/// Encoded image bytes; pixels are never decoded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageData {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    /// Encoded bytes, empty when only an unresolved URI is known
    pub data: Vec<u8>,
    /// External URI to keep when there are no bytes
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureData {
    pub name: Option<String>,
    pub image: Option<usize>,
    pub sampler: TextureSampler,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinData {
    pub name: Option<String>,
    /// Joint node indices
    pub joints: Vec<usize>,
    /// One per joint; identity when the file had none
    pub inverse_binds: Vec<Mat4>,
    pub root: Option<usize>,
    pub skeleton: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonData {
    pub name: Option<String>,
    pub joints: Vec<usize>,
    pub roots: Vec<usize>,
    pub skins: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTree {
    pub name: Option<String>,
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureData>,
    pub images: Vec<ImageData>,
    pub skins: Vec<SkinData>,
    pub skeletons: Vec<SkeletonData>,
    pub animations: Vec<AnimationClip>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a root) and return its index
    pub fn add_node(&mut self, mut node: SceneNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        node.parent = parent;
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    /// Path of node names from a root down to `index`
    pub fn path(&self, index: usize) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(node) = current {
            path.push(self.nodes[node].name.as_str());
            current = self.nodes[node].parent;
        }
        path.reverse();
        path
    }

    /// Depth-first node order starting at the roots
    pub fn depth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        order
    }

    /// Global transform of a node
    pub fn global_transform(&self, index: usize) -> Mat4 {
        let mut matrix = self.nodes[index].transform.to_matrix();
        let mut current = self.nodes[index].parent;
        while let Some(parent) = current {
            matrix = self.nodes[parent].transform.to_matrix() * matrix;
            current = self.nodes[parent].parent;
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_add_node_links_parent() {
        let mut tree = SceneTree::new();
        let root = tree.add_node(SceneNode::new("root"), None);
        let child = tree.add_node(SceneNode::new("child"), Some(root));
        let leaf = tree.add_node(SceneNode::new("leaf"), Some(child));

        assert_eq!(tree.roots, vec![root]);
        assert_eq!(tree.nodes[root].children, vec![child]);
        assert_eq!(tree.path(leaf), vec!["root", "child", "leaf"]);
        assert_eq!(tree.find_node("leaf"), Some(leaf));
        assert_eq!(tree.depth_first(), vec![root, child, leaf]);
    }

    #[test]
    fn test_global_transform_composes() {
        let mut tree = SceneTree::new();
        let mut parent = SceneNode::new("parent");
        parent.transform = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let mut child = SceneNode::new("child");
        child.transform = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));

        let parent = tree.add_node(parent, None);
        let child = tree.add_node(child, Some(parent));
        let origin = tree.global_transform(child).transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(1.0, 2.0, 0.0));
    }
}
