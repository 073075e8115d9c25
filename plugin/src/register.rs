//! Plugin entry points
//!
//! [`register_gltf_types`] runs once at startup. [`editor_init`] runs when
//! the editor is up and its settings are readable.

use std::sync::Arc;

use crate::blend::{self, BlendImportStatus};
use crate::error::Result;
use crate::exporter::{ExporterRegistry, GltfSceneExporter};
use crate::importer::{BlendSceneImporter, GltfSceneImporter, ImporterRegistry};
use crate::manifest::{ApiLevel, TypeRegistry, type_entries};
use crate::settings::{ImportSettings, SettingsStore, blend_setting_defs};

/// What a call to [`register_gltf_types`] added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registration {
    pub runtime_types: usize,
    pub editor_types: usize,
    /// Names that were already present and left untouched
    pub skipped: usize,
}

/// Submit the type list, and with tools enabled the editor types and import settings
pub fn register_gltf_types(
    types: &mut dyn TypeRegistry,
    settings: &mut dyn SettingsStore,
    tools_enabled: bool,
) -> Registration {
    let mut registration = Registration::default();

    for entry in type_entries(tools_enabled) {
        if !types.register_type(*entry) {
            registration.skipped += 1;
            continue;
        }
        match entry.api {
            ApiLevel::Runtime => registration.runtime_types += 1,
            ApiLevel::Editor => registration.editor_types += 1,
        }
    }

    if tools_enabled {
        for def in blend_setting_defs() {
            settings.define(def);
        }
    }

    tracing::debug!(
        "Registered glTF types: {} runtime, {} editor, {} already present",
        registration.runtime_types,
        registration.editor_types,
        registration.skipped
    );
    registration
}

/// Register the glTF importer and exporter, then the Blender importer if the gate allows it
pub fn editor_init(
    settings: &dyn SettingsStore,
    importers: &mut dyn ImporterRegistry,
    exporters: &mut dyn ExporterRegistry,
) -> Result<BlendImportStatus> {
    importers.add_importer(Arc::new(GltfSceneImporter::new()));
    exporters.add_exporter(Arc::new(GltfSceneExporter::new()));

    let settings = ImportSettings::from_store(settings)?;
    let status = blend::evaluate(&settings.blend);
    if let BlendImportStatus::Ready(path) = &status {
        tracing::info!("Blend import enabled with Blender at {}", path.display());
        importers.add_importer(Arc::new(BlendSceneImporter::new(path.clone())));
    }
    Ok(status)
}
