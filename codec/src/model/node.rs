//! Scene nodes and local transforms

use glam::{Mat4, Quat, Vec3};

use crate::json::Extensions;

/// Local transform in translation / rotation / scale form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Decompose a column-major glTF matrix
    pub fn from_matrix(columns: &[f32; 16]) -> Self {
        let (scale, rotation, translation) =
            Mat4::from_cols_array(columns).to_scale_rotation_translation();
        Self {
            translation,
            rotation: rotation.normalize(),
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// A node of the document's scene graph (`GLTFNode`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub transform: Transform,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    pub light: Option<usize>,
    /// Skeleton this node is a joint of
    pub skeleton: Option<usize>,
    pub joint: bool,
    /// Morph target weights
    pub weights: Vec<f32>,
    /// Unhandled extension objects
    pub extensions: Extensions,
    pub extras: Option<serde_json::Value>,
}

impl Node {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}
