//! Scene exporters

use std::path::Path;
use std::sync::Arc;

use gltf_codec::{DocumentWriter, SceneFlattener, SceneTree};

use crate::error::Result;

pub trait SceneExporter: Send + Sync {
    fn name(&self) -> &str;

    /// Write `tree` to `path`; the file extension picks the container
    fn export(&self, tree: &SceneTree, path: &Path) -> Result<()>;
}

/// glTF exporter: `.glb` binary or `.gltf` with sidecar buffers
#[derive(Debug, Clone, Default)]
pub struct GltfSceneExporter {
    flattener: SceneFlattener,
    writer: DocumentWriter,
}

impl GltfSceneExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(flattener: SceneFlattener, writer: DocumentWriter) -> Self {
        Self { flattener, writer }
    }
}

impl SceneExporter for GltfSceneExporter {
    fn name(&self) -> &str {
        "gltf"
    }

    fn export(&self, tree: &SceneTree, path: &Path) -> Result<()> {
        let document = self.flattener.flatten(tree)?;
        self.writer.write_path(&document, path)?;
        Ok(())
    }
}

pub trait ExporterRegistry {
    fn add_exporter(&mut self, exporter: Arc<dyn SceneExporter>);
}

#[derive(Default)]
pub struct InMemoryExporters {
    exporters: Vec<Arc<dyn SceneExporter>>,
}

impl InMemoryExporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.exporters.iter().map(|e| e.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SceneExporter>> {
        self.exporters.iter().find(|e| e.name() == name)
    }
}

impl ExporterRegistry for InMemoryExporters {
    fn add_exporter(&mut self, exporter: Arc<dyn SceneExporter>) {
        if self.get(exporter.name()).is_some() {
            tracing::debug!("Exporter '{}' already registered", exporter.name());
            return;
        }
        self.exporters.push(exporter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gltf_codec::{DocumentReader, SceneBuilder, SceneNode};

    #[test]
    fn test_export_glb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.glb");

        let mut tree = SceneTree::new();
        tree.add_node(SceneNode::new("Root"), None);
        GltfSceneExporter::new().export(&tree, &path).unwrap();

        let document = DocumentReader::new().read_path(&path).unwrap();
        let read = SceneBuilder::new().build(&document).unwrap();
        assert_eq!(read.nodes.len(), 1);
        assert_eq!(read.nodes[0].name, "Root");
    }

    #[test]
    fn test_duplicate_exporter_ignored() {
        let mut registry = InMemoryExporters::new();
        registry.add_exporter(Arc::new(GltfSceneExporter::new()));
        registry.add_exporter(Arc::new(GltfSceneExporter::new()));
        assert_eq!(registry.names(), vec!["gltf"]);
    }
}
