//! Scene importers and the registry the host collects them in

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gltf_codec::{DocumentReader, SceneBuilder, SceneTree};

use crate::error::{PluginError, Result};

/// Turns a source file into a scene tree
pub trait SceneImporter: Send + Sync {
    fn name(&self) -> &str;

    /// Lowercase file extensions handled, without the dot
    fn extensions(&self) -> &[&str];

    fn import(&self, path: &Path) -> Result<SceneTree>;

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|handled| handled.eq_ignore_ascii_case(ext))
            })
    }
}

/// `.gltf` / `.glb` importer backed by the codec
#[derive(Debug, Clone, Default)]
pub struct GltfSceneImporter {
    reader: DocumentReader,
    builder: SceneBuilder,
}

impl GltfSceneImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(reader: DocumentReader, builder: SceneBuilder) -> Self {
        Self { reader, builder }
    }
}

impl SceneImporter for GltfSceneImporter {
    fn name(&self) -> &str {
        "gltf"
    }

    fn extensions(&self) -> &[&str] {
        &["gltf", "glb"]
    }

    fn import(&self, path: &Path) -> Result<SceneTree> {
        let document = self.reader.read_path(path)?;
        Ok(self.builder.build(&document)?)
    }
}

/// `.blend` importer; conversion to glTF needs the external Blender executable
#[derive(Debug, Clone)]
pub struct BlendSceneImporter {
    blender_path: PathBuf,
}

impl BlendSceneImporter {
    pub fn new(blender_path: PathBuf) -> Self {
        Self { blender_path }
    }

    pub fn blender_path(&self) -> &Path {
        &self.blender_path
    }
}

impl SceneImporter for BlendSceneImporter {
    fn name(&self) -> &str {
        "blend"
    }

    fn extensions(&self) -> &[&str] {
        &["blend"]
    }

    fn import(&self, path: &Path) -> Result<SceneTree> {
        Err(PluginError::ExternalConverterRequired {
            path: path.to_path_buf(),
            converter: self.blender_path.clone(),
        })
    }
}

/// Host-side importer collection
pub trait ImporterRegistry {
    fn add_importer(&mut self, importer: Arc<dyn SceneImporter>);
}

#[derive(Default)]
pub struct InMemoryImporters {
    importers: Vec<Arc<dyn SceneImporter>>,
}

impl std::fmt::Debug for InMemoryImporters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl InMemoryImporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.importers.iter().map(|i| i.name()).collect()
    }

    /// First registered importer that handles the file's extension
    pub fn find_for_path(&self, path: &Path) -> Option<&Arc<dyn SceneImporter>> {
        self.importers.iter().find(|i| i.handles(path))
    }

    pub fn import(&self, path: &Path) -> Result<SceneTree> {
        let importer = self
            .find_for_path(path)
            .ok_or_else(|| PluginError::NoImporter(path.to_path_buf()))?;
        tracing::info!("Importing {} with '{}'", path.display(), importer.name());
        importer.import(path)
    }
}

impl ImporterRegistry for InMemoryImporters {
    fn add_importer(&mut self, importer: Arc<dyn SceneImporter>) {
        tracing::debug!("Added scene importer '{}'", importer.name());
        self.importers.push(importer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_extension_case_insensitive() {
        let importer = GltfSceneImporter::new();
        assert!(importer.handles(Path::new("a/b/scene.GLB")));
        assert!(importer.handles(Path::new("scene.gltf")));
        assert!(!importer.handles(Path::new("scene.blend")));
        assert!(!importer.handles(Path::new("gltf")));
    }

    #[test]
    fn test_blend_import_needs_converter() {
        let importer = BlendSceneImporter::new(PathBuf::from("/opt/blender"));
        match importer.import(Path::new("level.blend")) {
            Err(PluginError::ExternalConverterRequired { path, converter }) => {
                assert_eq!(path, Path::new("level.blend"));
                assert_eq!(converter, Path::new("/opt/blender"));
            }
            other => panic!("Expected converter error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = InMemoryImporters::new();
        registry.add_importer(Arc::new(GltfSceneImporter::new()));
        registry.add_importer(Arc::new(BlendSceneImporter::new(PathBuf::new())));

        assert_eq!(registry.names(), vec!["gltf", "blend"]);
        assert_eq!(
            registry
                .find_for_path(Path::new("x.blend"))
                .map(|i| i.name()),
            Some("blend")
        );
        assert!(matches!(
            registry.import(Path::new("x.fbx")),
            Err(PluginError::NoImporter(_))
        ));
    }
}
