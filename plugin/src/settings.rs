//! Import settings
//!
//! Settings live in a host [`SettingsStore`] under slash-separated keys, and
//! can also be loaded from a TOML file:
//!
//! ```toml
//! [blend]
//! enabled = true
//! blender_path = "/usr/bin/blender"
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PluginError, Result};

pub const BLEND_ENABLED: &str = "filesystem/import/blend/enabled";
pub const BLEND_BLENDER_PATH: &str = "filesystem/import/blend/blender_path";

/// Import configuration, passed explicitly instead of read from globals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImportSettings {
    #[serde(default)]
    pub blend: BlendSettings,
}

/// Blender-to-glTF import settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlendSettings {
    /// Whether `.blend` import is enabled (default: false, takes effect on restart)
    #[serde(default)]
    pub enabled: bool,
    /// Path to the Blender executable (default: empty)
    #[serde(default)]
    pub blender_path: String,
}

impl ImportSettings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Read the current values from a settings store, falling back to defaults
    pub fn from_store(store: &dyn SettingsStore) -> Result<Self> {
        let enabled = match store.get(BLEND_ENABLED) {
            Some(value) => value.as_bool().ok_or_else(|| type_error(BLEND_ENABLED, "bool"))?,
            None => false,
        };
        let blender_path = match store.get(BLEND_BLENDER_PATH) {
            Some(value) => value
                .as_str()
                .ok_or_else(|| type_error(BLEND_BLENDER_PATH, "string"))?
                .to_string(),
            None => String::new(),
        };
        Ok(Self {
            blend: BlendSettings {
                enabled,
                blender_path,
            },
        })
    }

    /// Write these values into a store whose keys are already defined
    pub fn apply_to(&self, store: &mut dyn SettingsStore) -> Result<()> {
        store.set(BLEND_ENABLED, SettingValue::Bool(self.blend.enabled))?;
        store.set(
            BLEND_BLENDER_PATH,
            SettingValue::String(self.blend.blender_path.clone()),
        )
    }
}

fn type_error(key: &str, expected: &'static str) -> PluginError {
    PluginError::SettingType {
        key: key.to_string(),
        expected,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    String(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
        }
    }
}

/// Editor hint for how a setting is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyHint {
    #[default]
    None,
    /// Absolute path to a file anywhere on disk
    GlobalFile,
}

/// Declaration of a setting with its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: SettingValue,
    pub restart_required: bool,
    pub hint: PropertyHint,
}

/// Definitions of the blend import settings
pub fn blend_setting_defs() -> [SettingDef; 2] {
    [
        SettingDef {
            key: BLEND_ENABLED,
            default: SettingValue::Bool(false),
            restart_required: true,
            hint: PropertyHint::None,
        },
        SettingDef {
            key: BLEND_BLENDER_PATH,
            default: SettingValue::String(String::new()),
            restart_required: true,
            hint: PropertyHint::GlobalFile,
        },
    ]
}

/// Host-side settings storage
pub trait SettingsStore {
    /// Declare a setting; an existing definition and its value are kept
    fn define(&mut self, def: SettingDef);

    /// Current value, or the default if unset
    fn get(&self, key: &str) -> Option<&SettingValue>;

    fn set(&mut self, key: &str, value: SettingValue) -> Result<()>;

    fn definition(&self, key: &str) -> Option<&SettingDef>;
}

#[derive(Debug, Default)]
pub struct InMemorySettings {
    defs: HashMap<&'static str, SettingDef>,
    values: HashMap<String, SettingValue>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl SettingsStore for InMemorySettings {
    fn define(&mut self, def: SettingDef) {
        if self.defs.contains_key(def.key) {
            return;
        }
        tracing::debug!("Defined setting {} = {:?}", def.key, def.default);
        self.defs.insert(def.key, def);
    }

    fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values
            .get(key)
            .or_else(|| self.defs.get(key).map(|def| &def.default))
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<()> {
        let def = self
            .defs
            .get(key)
            .ok_or_else(|| PluginError::UnknownSetting(key.to_string()))?;
        if def.default.kind() != value.kind() {
            return Err(type_error(key, def.default.kind()));
        }
        if def.restart_required {
            tracing::info!("Setting {} changed; takes effect after restart", key);
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn definition(&self, key: &str) -> Option<&SettingDef> {
        self.defs.get(key)
    }
}
