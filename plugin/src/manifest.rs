//! Plugin manifest: the fixed list of glTF types the plugin exposes
//!
//! Runtime types are always available. Editor types only exist when the host
//! runs with tools enabled.

use hashbrown::HashMap;

/// Which API surface a type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiLevel {
    Runtime,
    Editor,
}

/// One registered type and the codec item backing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeEntry {
    pub name: &'static str,
    pub api: ApiLevel,
    pub backed_by: &'static str,
}

const fn runtime(name: &'static str, backed_by: &'static str) -> TypeEntry {
    TypeEntry {
        name,
        api: ApiLevel::Runtime,
        backed_by,
    }
}

const fn editor(name: &'static str, backed_by: &'static str) -> TypeEntry {
    TypeEntry {
        name,
        api: ApiLevel::Editor,
        backed_by,
    }
}

pub const RUNTIME_TYPES: &[TypeEntry] = &[
    runtime("GLTFAccessor", "gltf_codec::model::Accessor"),
    runtime("GLTFAnimation", "gltf_codec::model::Animation"),
    runtime("GLTFBufferView", "gltf_codec::model::BufferView"),
    runtime("GLTFCamera", "gltf_codec::model::Camera"),
    runtime("GLTFDocument", "gltf_codec::DocumentReader"),
    runtime("GLTFDocumentExtension", "gltf_codec::DocumentExtension"),
    runtime(
        "GLTFDocumentExtensionConvertImporterMesh",
        "gltf_codec::SceneBuilder",
    ),
    runtime("GLTFLight", "gltf_codec::model::Light"),
    runtime("GLTFNode", "gltf_codec::model::Node"),
    runtime("GLTFSkeleton", "gltf_codec::model::Skeleton"),
    runtime("GLTFSkin", "gltf_codec::model::Skin"),
    runtime("GLTFSpecGloss", "gltf_codec::model::SpecGloss"),
    runtime("GLTFState", "gltf_codec::Document"),
    runtime("GLTFTexture", "gltf_codec::model::Texture"),
];

pub const EDITOR_TYPES: &[TypeEntry] = &[
    editor("GLTFMesh", "gltf_codec::model::Mesh"),
    editor(
        "EditorSceneFormatImporterGLTF",
        "gltf_plugin::importer::GltfSceneImporter",
    ),
    editor(
        "EditorSceneFormatImporterBlend",
        "gltf_plugin::importer::BlendSceneImporter",
    ),
];

/// Types to register, in registration order
pub fn type_entries(tools_enabled: bool) -> impl Iterator<Item = &'static TypeEntry> {
    let editor_types: &[TypeEntry] = if tools_enabled { EDITOR_TYPES } else { &[] };
    RUNTIME_TYPES.iter().chain(editor_types)
}

/// Host-side type database
pub trait TypeRegistry {
    /// Register a type; returns false if the name was already present
    fn register_type(&mut self, entry: TypeEntry) -> bool;

    fn contains(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryTypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<&'static str, usize>,
}

impl InMemoryTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, api: ApiLevel) -> usize {
        self.entries.iter().filter(|e| e.api == api).count()
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn register_type(&mut self, entry: TypeEntry) -> bool {
        if self.by_name.contains_key(entry.name) {
            tracing::debug!("Type {} already registered", entry.name);
            return false;
        }
        self.by_name.insert(entry.name, self.entries.len());
        self.entries.push(entry);
        true
    }

    fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}
