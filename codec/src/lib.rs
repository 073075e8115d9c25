//! glTF 2.0 document codec
//!
//! Reads and writes `.gltf` / `.glb` files and converts between the
//! index-based glTF document and an engine-agnostic scene tree:
//! - DocumentReader: GLB/JSON bytes -> validated [`Document`]
//! - DocumentWriter: [`Document`] -> GLB, embedded `.gltf` or `.gltf` + `.bin`
//! - SceneBuilder: [`Document`] -> [`SceneTree`] with decoded vertex data
//! - SceneFlattener: [`SceneTree`] -> [`Document`] with one packed buffer
//! - ExtensionRegistry: ordered [`DocumentExtension`] hooks across all stages
//!
//! # Example
//!
//! ```no_run
//! use gltf_codec::*;
//! use std::path::Path;
//!
//! let document = DocumentReader::new().read_path(Path::new("character.glb"))?;
//! let tree = SceneBuilder::new().build(&document)?;
//!
//! let flattened = SceneFlattener::new().flatten(&tree)?;
//! DocumentWriter::new().write_path(&flattened, Path::new("character_out.glb"))?;
//! # Ok::<(), gltf_codec::CodecError>(())
//! ```

pub mod error;
pub mod extension;
pub mod glb;
pub mod json;
pub mod model;
pub mod pack;
pub mod reader;
pub mod scene;
pub mod skeleton;
pub mod spec_gloss;
pub mod uri;
pub mod writer;

pub use error::{CodecError, Result};
pub use extension::{DocumentExtension, ExtensionRegistry};
pub use model::Document;
pub use pack::BufferBuilder;
pub use reader::DocumentReader;
pub use scene::{SceneBuilder, SceneFlattener, SceneNode, SceneTree};
pub use spec_gloss::SpecGlossConversion;
pub use writer::DocumentWriter;
