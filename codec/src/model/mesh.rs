//! Meshes and primitives (`GLTFMesh`)

use std::collections::BTreeMap;

use crate::json::Extensions;

/// Attribute semantic names
pub mod semantic {
    pub const POSITION: &str = "POSITION";
    pub const NORMAL: &str = "NORMAL";
    pub const TANGENT: &str = "TANGENT";
    pub const COLOR_0: &str = "COLOR_0";

    pub fn tex_coord(set: usize) -> String {
        format!("TEXCOORD_{}", set)
    }

    pub fn joints(set: usize) -> String {
        format!("JOINTS_{}", set)
    }

    pub fn weights(set: usize) -> String {
        format!("WEIGHTS_{}", set)
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }

    pub fn to_gl(self) -> u32 {
        match self {
            Self::Points => 0,
            Self::Lines => 1,
            Self::LineLoop => 2,
            Self::LineStrip => 3,
            Self::Triangles => 4,
            Self::TriangleStrip => 5,
            Self::TriangleFan => 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    /// Semantic name -> accessor index
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: PrimitiveMode,
    /// Morph targets: semantic name -> accessor index
    pub targets: Vec<BTreeMap<String, usize>>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Default morph target weights
    pub weights: Vec<f32>,
    pub extensions: Extensions,
    pub extras: Option<serde_json::Value>,
}
