use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "pageturner";
const CROP_SETTINGS_FILENAME: &str = "crop_settings.json";
const LOG_FILENAME: &str = "pageturner.log";

/// Compute a stable identifier for a document from its source location.
/// Format: `<md5_first_12>_<slugified_file_stem>`
///
/// The location may be a filesystem path or a URL; only its textual form
/// matters, so the same location always yields the same id.
pub fn document_slug(location: &str) -> String {
    let digest = md5::compute(location.as_bytes());
    let hash_prefix = &format!("{digest:x}")[..12];

    let last_component = location
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = Path::new(last_component)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");

    let slugified: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase();

    format!("{hash_prefix}_{slugified}")
}

/// Compute the XDG-compliant path of the crop settings file.
/// Creates the parent directory if it doesn't exist.
pub fn resolve_crop_settings_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join(APP_NAME);

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {data_dir:?}"))?;

    Ok(data_dir.join(CROP_SETTINGS_FILENAME))
}

/// Compute the XDG-compliant log file path.
/// Uses `state_dir` on platforms that have it, falls back to `cache_dir`.
pub fn resolve_log_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine state or cache directory")?;

    let log_dir = base.join(APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {log_dir:?}"))?;

    Ok(log_dir.join(LOG_FILENAME))
}

/// Path of the engine configuration file, if a config directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join("config.yaml"))
}
