//! Plugin error type

use std::path::PathBuf;

use gltf_codec::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Setting '{key}' expects a {expected} value")]
    SettingType { key: String, expected: &'static str },

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("No importer handles '{0}'")]
    NoImporter(PathBuf),

    #[error("Importing {path} requires running the external converter at {converter}")]
    ExternalConverterRequired { path: PathBuf, converter: PathBuf },
}

pub type Result<T> = std::result::Result<T, PluginError>;
