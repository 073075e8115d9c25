//! Blender import gate
//!
//! Decides whether the `.blend` importer gets registered. Misconfiguration
//! never fails registration: it disables the import path with a warning.

use std::path::{Path, PathBuf};

use crate::settings::BlendSettings;

pub const NO_PATH_WARNING: &str = "Blend file import is enabled, but no Blender path is configured. Blend files will not be imported.";
pub const INVALID_PATH_WARNING: &str = "Blend file import is enabled, but the Blender path doesn't point to a valid Blender executable. Blend files will not be imported.";

/// Outcome of evaluating the blend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlendImportStatus {
    /// Import flag is off; the path is not looked at
    Disabled,
    NoPathConfigured,
    InvalidPath(PathBuf),
    /// Import can be registered with this Blender executable
    Ready(PathBuf),
}

impl BlendImportStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Warning emitted for this status, if any
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Self::NoPathConfigured => Some(NO_PATH_WARNING),
            Self::InvalidPath(_) => Some(INVALID_PATH_WARNING),
            Self::Disabled | Self::Ready(_) => None,
        }
    }

    pub fn blender_path(&self) -> Option<&Path> {
        match self {
            Self::Ready(path) | Self::InvalidPath(path) => Some(path),
            Self::Disabled | Self::NoPathConfigured => None,
        }
    }
}

/// Evaluate the gate, logging a warning when import is enabled but unusable
pub fn evaluate(settings: &BlendSettings) -> BlendImportStatus {
    let status = check(settings);
    if let Some(warning) = status.warning() {
        tracing::warn!("{}", warning);
    }
    status
}

fn check(settings: &BlendSettings) -> BlendImportStatus {
    if !settings.enabled {
        return BlendImportStatus::Disabled;
    }
    if settings.blender_path.is_empty() {
        return BlendImportStatus::NoPathConfigured;
    }
    let path = PathBuf::from(&settings.blender_path);
    if path.is_file() {
        BlendImportStatus::Ready(path)
    } else {
        BlendImportStatus::InvalidPath(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Evaluate with a subscriber installed, returning what was logged
    fn evaluate_logged(settings: &BlendSettings) -> (BlendImportStatus, String) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let status = tracing::subscriber::with_default(subscriber, || evaluate(settings));
        (status, log.text())
    }

    fn settings(enabled: bool, path: &str) -> BlendSettings {
        BlendSettings {
            enabled,
            blender_path: path.to_string(),
        }
    }

    #[test]
    fn test_disabled_ignores_path() {
        assert_eq!(evaluate(&settings(false, "")), BlendImportStatus::Disabled);
        assert_eq!(
            evaluate(&settings(false, "/nonexistent")),
            BlendImportStatus::Disabled
        );
    }

    #[test]
    fn test_empty_path() {
        let status = evaluate(&settings(true, ""));
        assert_eq!(status, BlendImportStatus::NoPathConfigured);
        assert_eq!(status.warning(), Some(NO_PATH_WARNING));
    }

    #[test]
    fn test_missing_file() {
        let status = evaluate(&settings(true, "/nonexistent/blender"));
        assert_eq!(status.warning(), Some(INVALID_PATH_WARNING));
        assert!(!status.is_ready());
    }

    #[test]
    fn test_directory_is_not_an_executable() {
        let dir = tempfile::tempdir().unwrap();
        let status = evaluate(&settings(true, dir.path().to_str().unwrap()));
        assert!(matches!(status, BlendImportStatus::InvalidPath(_)));
    }

    #[test]
    fn test_warnings_are_logged() {
        let (status, log) = evaluate_logged(&settings(true, ""));
        assert_eq!(status, BlendImportStatus::NoPathConfigured);
        assert!(log.contains("WARN"), "{}", log);
        assert!(log.contains(NO_PATH_WARNING), "{}", log);

        let (status, log) = evaluate_logged(&settings(true, "/nonexistent/blender"));
        assert!(matches!(status, BlendImportStatus::InvalidPath(_)));
        assert!(log.contains(INVALID_PATH_WARNING), "{}", log);
        assert!(!log.contains(NO_PATH_WARNING), "{}", log);
    }

    #[test]
    fn test_no_warning_when_disabled_or_ready() {
        let (_, log) = evaluate_logged(&settings(false, "/nonexistent/blender"));
        assert!(log.is_empty(), "{}", log);

        let blender = tempfile::NamedTempFile::new().unwrap();
        let (status, log) = evaluate_logged(&settings(true, blender.path().to_str().unwrap()));
        assert!(status.is_ready());
        assert!(log.is_empty(), "{}", log);
    }
}
