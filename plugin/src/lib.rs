//! glTF plugin registration
//!
//! Wires the codec into a host through injected registries:
//! - manifest: the glTF type list, runtime and editor API levels
//! - settings: blend import settings, from a store or a TOML file
//! - blend: the Blender import gate
//! - importer / exporter: scene importers and exporters plus in-memory registries
//!
//! # Example
//!
//! ```
//! use gltf_plugin::*;
//!
//! let mut types = InMemoryTypeRegistry::new();
//! let mut settings = InMemorySettings::new();
//! register_gltf_types(&mut types, &mut settings, true);
//!
//! let mut importers = InMemoryImporters::new();
//! let mut exporters = InMemoryExporters::new();
//! let status = editor_init(&settings, &mut importers, &mut exporters)?;
//! assert_eq!(status, BlendImportStatus::Disabled);
//! assert_eq!(importers.names(), vec!["gltf"]);
//! # Ok::<(), gltf_plugin::PluginError>(())
//! ```

pub mod blend;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod manifest;
pub mod register;
pub mod settings;

pub use blend::BlendImportStatus;
pub use error::{PluginError, Result};
pub use exporter::{ExporterRegistry, GltfSceneExporter, InMemoryExporters, SceneExporter};
pub use importer::{
    BlendSceneImporter, GltfSceneImporter, ImporterRegistry, InMemoryImporters, SceneImporter,
};
pub use manifest::{ApiLevel, InMemoryTypeRegistry, TypeEntry, TypeRegistry};
pub use register::{Registration, editor_init, register_gltf_types};
pub use settings::{ImportSettings, InMemorySettings, SettingValue, SettingsStore};
