use anyhow::{Context, Result};
use shared::settings::DispatchSettings;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Legion", "Legion")
        .map(|proj| proj.config_dir().join("settings.json"))
}

/// Load settings from `path`, `None` when the file does not exist.
pub fn load_settings_from(path: &Path) -> Result<Option<DispatchSettings>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let settings = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(settings))
}

/// Load settings from disk or return defaults. Environment overrides are
/// applied either way.
pub fn load_settings_or_default() -> DispatchSettings {
    let loaded = config_path().and_then(|path| match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "ignoring unreadable settings file");
            None
        }
    });
    loaded.unwrap_or_default().with_env_overrides()
}

pub fn save_settings_to(path: &Path, settings: &DispatchSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(settings)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
