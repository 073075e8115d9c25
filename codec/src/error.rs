//! Codec error type

use thiserror::Error;

/// Errors produced while reading, building, flattening or writing glTF documents
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid GLB: {0}")]
    InvalidGlb(String),

    #[error("Unsupported glTF asset version {0} (expected 2.x)")]
    UnsupportedVersion(String),

    #[error("Required extension {0} is not supported")]
    UnsupportedExtension(String),

    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Buffer view {view} covers bytes {start}..{end} but buffer {buffer} is {len} bytes")]
    BufferViewOutOfBounds {
        view: usize,
        buffer: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Accessor {accessor} reads bytes {start}..{end} past the end of its {len}-byte view")]
    AccessorOutOfBounds {
        accessor: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Invalid accessor {accessor}: {reason}")]
    InvalidAccessor { accessor: usize, reason: String },

    #[error("Node graph contains a cycle through node {0}")]
    CyclicNodeGraph(usize),

    #[error("Node {node} has more than one parent ({first} and {second})")]
    MultipleParents {
        node: usize,
        first: usize,
        second: usize,
    },

    #[error("Invalid mesh {mesh}: {reason}")]
    InvalidMesh { mesh: usize, reason: String },

    #[error("Invalid skin {skin}: {reason}")]
    InvalidSkin { skin: usize, reason: String },

    #[error("Invalid animation {animation}: {reason}")]
    InvalidAnimation { animation: usize, reason: String },

    #[error("Invalid scene tree: {0}")]
    InvalidScene(String),

    #[error("Bad URI '{uri}': {reason}")]
    BadUri { uri: String, reason: String },

    #[error("Extension '{name}' failed: {source}")]
    Extension {
        name: String,
        #[source]
        source: Box<CodecError>,
    },

    #[error("{0}")]
    Custom(String),
}

impl CodecError {
    /// Shorthand for index range failures
    pub(crate) fn out_of_range(kind: &'static str, index: usize, count: usize) -> Self {
        Self::IndexOutOfRange { kind, index, count }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
