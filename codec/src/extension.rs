//! Document extension hooks (`GLTFDocumentExtension`)
//!
//! Extensions are invoked in registration order at fixed pipeline stages:
//!
//! | stage             | runs during      | sees                   |
//! |-------------------|------------------|------------------------|
//! | `pre_parse`       | reading          | raw JSON root          |
//! | `post_parse`      | reading          | finished [`Document`]  |
//! | `post_node_build` | scene building   | each built scene node  |
//! | `post_build`      | scene building   | finished [`SceneTree`] |
//! | `pre_flatten`     | scene flattening | source [`SceneTree`]   |
//! | `pre_serialize`   | writing          | [`Document`] to write  |
//!
//! The first failing hook aborts the pipeline.

use std::sync::Arc;

use crate::error::{CodecError, Result};
use crate::json;
use crate::model::Document;
use crate::scene::{SceneNode, SceneTree};

pub trait DocumentExtension: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// glTF extension names this handler understands in `extensionsRequired`
    fn supported_extensions(&self) -> &[&str] {
        &[]
    }

    fn pre_parse(&self, _root: &mut json::Root) -> Result<()> {
        Ok(())
    }

    fn post_parse(&self, _document: &mut Document) -> Result<()> {
        Ok(())
    }

    fn post_node_build(
        &self,
        _document: &Document,
        _node_index: usize,
        _node: &mut SceneNode,
    ) -> Result<()> {
        Ok(())
    }

    fn post_build(&self, _document: &Document, _tree: &mut SceneTree) -> Result<()> {
        Ok(())
    }

    fn pre_flatten(&self, _tree: &mut SceneTree) -> Result<()> {
        Ok(())
    }

    fn pre_serialize(&self, _document: &mut Document) -> Result<()> {
        Ok(())
    }
}

/// Ordered list of registered extensions
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn DocumentExtension>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.extensions.iter().map(|e| e.name()))
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in extensions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::spec_gloss::SpecGlossConversion));
        registry
    }

    /// Append an extension; a second extension with the same name replaces the first
    pub fn register(&mut self, extension: Arc<dyn DocumentExtension>) {
        if let Some(slot) = self
            .extensions
            .iter_mut()
            .find(|e| e.name() == extension.name())
        {
            tracing::debug!("Replacing document extension '{}'", extension.name());
            *slot = extension;
        } else {
            tracing::debug!("Registered document extension '{}'", extension.name());
            self.extensions.push(extension);
        }
    }

    /// Remove an extension by name, returning whether it was present
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.extensions.len();
        self.extensions.retain(|e| e.name() != name);
        before != self.extensions.len()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// Whether any registered extension handles the named glTF extension
    pub fn supports(&self, gltf_extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.supported_extensions().contains(&gltf_extension))
    }

    fn run<F>(&self, stage: &str, mut hook: F) -> Result<()>
    where
        F: FnMut(&dyn DocumentExtension) -> Result<()>,
    {
        for extension in &self.extensions {
            hook(extension.as_ref()).map_err(|source| {
                tracing::error!(
                    "Extension '{}' failed during {}: {}",
                    extension.name(),
                    stage,
                    source
                );
                CodecError::Extension {
                    name: extension.name().to_string(),
                    source: Box::new(source),
                }
            })?;
        }
        Ok(())
    }

    pub fn pre_parse(&self, root: &mut json::Root) -> Result<()> {
        self.run("pre_parse", |e| e.pre_parse(root))
    }

    pub fn post_parse(&self, document: &mut Document) -> Result<()> {
        self.run("post_parse", |e| e.post_parse(document))
    }

    pub fn post_node_build(
        &self,
        document: &Document,
        node_index: usize,
        node: &mut SceneNode,
    ) -> Result<()> {
        self.run("post_node_build", |e| {
            e.post_node_build(document, node_index, node)
        })
    }

    pub fn post_build(&self, document: &Document, tree: &mut SceneTree) -> Result<()> {
        self.run("post_build", |e| e.post_build(document, tree))
    }

    pub fn pre_flatten(&self, tree: &mut SceneTree) -> Result<()> {
        self.run("pre_flatten", |e| e.pre_flatten(tree))
    }

    pub fn pre_serialize(&self, document: &mut Document) -> Result<()> {
        self.run("pre_serialize", |e| e.pre_serialize(document))
    }
}
