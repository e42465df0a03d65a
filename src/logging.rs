//! Log sink setup for hosts embedding the engine

use std::fs::{self, File};
use std::path::Path;

use anyhow::Context;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Route the `log` facade to a file, truncating it.
///
/// Fails if the file cannot be created or a logger is already installed.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {parent:?}"))?;
        }
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?;
    let config = ConfigBuilder::new()
        .add_filter_allow_str("pageturner")
        .build();

    WriteLogger::init(level, config, file).context("Logger already initialized")?;
    log::info!("Logging to {path:?} at {level}");
    Ok(())
}

/// Log to the platform state directory, see [`crate::paths::resolve_log_path`]
pub fn init_default_logger(level: LevelFilter) -> anyhow::Result<()> {
    let path = crate::paths::resolve_log_path()?;
    init_file_logger(&path, level)
}
