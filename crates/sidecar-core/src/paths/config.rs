//! Settings file persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::error::PathError;
use super::settings_path;
use crate::settings::Settings;

/// Load settings from the default location, falling back to defaults when
/// the file does not exist yet.
pub fn load_settings() -> Result<Settings, PathError> {
    load_settings_from(&settings_path()?)
}

/// Load settings from an explicit file.
pub fn load_settings_from(path: &Path) -> Result<Settings, PathError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::with_defaults());
        }
        Err(e) => {
            return Err(PathError::SettingsFileError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    serde_json::from_str(&content).map_err(|e| PathError::MalformedSettings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Persist settings to the default location.
pub fn save_settings(settings: &Settings) -> Result<(), PathError> {
    save_settings_to(&settings_path()?, settings)
}

/// Persist settings to an explicit file, creating parent directories.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), PathError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PathError::CreateFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
    }

    let mut content =
        serde_json::to_string_pretty(settings).map_err(|e| PathError::SettingsFileError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    content.push('\n');

    fs::write(path, content).map_err(|e| PathError::SettingsFileError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!(path = %path.display(), "Settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::with_defaults());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::with_defaults();
        settings.port = 15500;
        settings.project_directory = Some("/srv/notes".to_string());
        save_settings_to(&path, &settings).unwrap();

        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"startupTimeoutMs\""));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, PathError::MalformedSettings { .. }));
    }
}
