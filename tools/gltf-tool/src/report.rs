//! Human-readable reports

use std::path::Path;

use gltf_codec::model::ImageSource;
use gltf_codec::{Document, SceneTree};

pub fn summary(input: &Path, document: &Document) {
    tracing::info!("{:?}", input);
    tracing::info!(
        "  asset: glTF {} ({})",
        document.asset.version,
        document.asset.generator.as_deref().unwrap_or("unknown generator")
    );
    if !document.extensions_used.is_empty() {
        tracing::info!("  extensions: {}", document.extensions_used.join(", "));
    }
    tracing::info!(
        "  {} nodes ({} roots), {} buffers ({} bytes)",
        document.nodes.len(),
        document.root_nodes.len(),
        document.buffers.len(),
        document.buffers.iter().map(Vec::len).sum::<usize>()
    );

    for (i, mesh) in document.meshes.iter().enumerate() {
        let vertices: usize = mesh
            .primitives
            .iter()
            .filter_map(|p| p.attributes.get("POSITION"))
            .filter_map(|&a| document.accessors.get(a))
            .map(|a| a.count)
            .sum();
        tracing::info!(
            "  mesh [{}] '{}': {} primitives, {} vertices",
            i,
            mesh.name.as_deref().unwrap_or("unnamed"),
            mesh.primitives.len(),
            vertices
        );
    }
    for (i, skin) in document.skins.iter().enumerate() {
        tracing::info!(
            "  skin [{}] '{}': {} joints",
            i,
            skin.name.as_deref().unwrap_or("unnamed"),
            skin.joints.len()
        );
    }
    for (i, animation) in document.animations.iter().enumerate() {
        tracing::info!(
            "  animation [{}] '{}': {} channels",
            i,
            animation.name.as_deref().unwrap_or("unnamed"),
            animation.channels.len()
        );
    }
    for (i, image) in document.images.iter().enumerate() {
        let source = match &image.source {
            ImageSource::BufferView(view) => format!("buffer view {}", view),
            ImageSource::Uri { data: Some(_), .. } => "embedded URI".to_string(),
            ImageSource::Uri { uri, data: None } => format!("unresolved '{}'", uri),
        };
        tracing::info!(
            "  image [{}] '{}': {}",
            i,
            image.name.as_deref().unwrap_or("unnamed"),
            source
        );
    }
    tracing::info!(
        "  {} materials, {} textures, {} cameras, {} lights",
        document.materials.len(),
        document.textures.len(),
        document.cameras.len(),
        document.lights.len()
    );
}

pub fn hierarchy(tree: &SceneTree) {
    tracing::info!("{}", tree.name.as_deref().unwrap_or("Scene"));
    for &root in &tree.roots {
        print_node(tree, root, 1);
    }
}

fn print_node(tree: &SceneTree, index: usize, depth: usize) {
    let node = &tree.nodes[index];
    let mut tags = Vec::new();
    if let Some(instance) = node.mesh {
        tags.push(format!("mesh {}", instance.mesh));
    }
    if node.is_joint() {
        tags.push("joint".to_string());
    }
    if node.camera.is_some() {
        tags.push("camera".to_string());
    }
    if node.light.is_some() {
        tags.push("light".to_string());
    }

    if tags.is_empty() {
        tracing::info!("{}{}", "  ".repeat(depth), node.name);
    } else {
        tracing::info!("{}{} [{}]", "  ".repeat(depth), node.name, tags.join(", "));
    }
    for &child in &node.children {
        print_node(tree, child, depth + 1);
    }
}
