//! Engine configuration, loaded from YAML once at host startup

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::navigation::gesture::DEFAULT_EXIT_WINDOW;
use crate::navigation::{ModeConfig, TapZoneConfig};
use crate::paths::default_config_path;
use crate::render::{
    ServiceConfig, DEFAULT_CACHE_SIZE, DEFAULT_OVERSAMPLING, DEFAULT_PREFETCH_RADIUS,
    DEFAULT_WORKERS, MIN_OVERSAMPLING,
};

pub const CURRENT_VERSION: u32 = 1;

/// Shortest and longest accepted window for the performance exit taps
const EXIT_WINDOW_RANGE_MS: (u64, u64) = (150, 3000);

const SETTINGS_HEADER: &str = "# pageturner engine settings\n\
# Tap zone ratios are fractions of the screen width.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Raster size relative to display size, at least 2
    #[serde(default = "default_oversampling")]
    pub oversampling: f32,

    #[serde(default = "default_normal_zones")]
    pub normal_tap_zones: TapZoneConfig,

    #[serde(default = "default_performance_zones")]
    pub performance_tap_zones: TapZoneConfig,

    /// Window for the triple tap that leaves performance mode
    #[serde(default = "default_exit_window_ms")]
    pub exit_gesture_window_ms: u64,

    #[serde(default = "default_render_workers")]
    pub render_workers: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_prefetch_radius")]
    pub prefetch_radius: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_oversampling() -> f32 {
    DEFAULT_OVERSAMPLING
}

fn default_normal_zones() -> TapZoneConfig {
    TapZoneConfig::NORMAL
}

fn default_performance_zones() -> TapZoneConfig {
    TapZoneConfig::PERFORMANCE
}

fn default_exit_window_ms() -> u64 {
    DEFAULT_EXIT_WINDOW.as_millis() as u64
}

fn default_render_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_prefetch_radius() -> usize {
    DEFAULT_PREFETCH_RADIUS
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            oversampling: default_oversampling(),
            normal_tap_zones: default_normal_zones(),
            performance_tap_zones: default_performance_zones(),
            exit_gesture_window_ms: default_exit_window_ms(),
            render_workers: default_render_workers(),
            cache_size: default_cache_size(),
            prefetch_radius: default_prefetch_radius(),
        }
    }
}

impl EngineSettings {
    /// Load settings from `path`, or the platform config path when `None`.
    ///
    /// A missing file is created with defaults. A file that cannot be read or
    /// parsed is logged and replaced by defaults in memory only.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using default settings");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            if let Err(e) = settings.save_to_path(&path) {
                error!("Failed to write default settings: {e:#}");
            }
            return settings;
        }

        match Self::load_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("{e:#}");
                Self::default()
            }
        }
    }

    /// Parse settings from a YAML file, migrating older versions in place
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path:?}"))?;
        let mut settings: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {path:?}"))?;
        debug!("Loaded settings from {path:?}");

        if settings.version < CURRENT_VERSION {
            settings.migrate();
            if let Err(e) = settings.save_to_path(path) {
                warn!("Could not save migrated settings: {e:#}");
            }
        }

        Ok(settings.sanitized())
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {parent:?}"))?;
            }
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize settings")?;
        fs::write(path, format!("{SETTINGS_HEADER}{yaml}"))
            .with_context(|| format!("Failed to save settings to {path:?}"))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    /// Bring settings written by an older version up to date
    fn migrate(&mut self) {
        info!(
            "Migrating settings from v{} to v{}",
            self.version, CURRENT_VERSION
        );
        // Version 0 files predate performance mode and carry the normal zones there
        if self.version == 0 && self.performance_tap_zones == self.normal_tap_zones {
            self.performance_tap_zones = TapZoneConfig::PERFORMANCE;
        }
        self.version = CURRENT_VERSION;
    }

    /// Pull every value into its accepted range
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !self.oversampling.is_finite() || self.oversampling < MIN_OVERSAMPLING {
            warn!(
                "Oversampling {} is below {MIN_OVERSAMPLING}, raising it",
                self.oversampling
            );
            self.oversampling = MIN_OVERSAMPLING;
        }
        self.normal_tap_zones = self.normal_tap_zones.sanitized();
        self.performance_tap_zones = self.performance_tap_zones.sanitized();
        self.exit_gesture_window_ms = self
            .exit_gesture_window_ms
            .clamp(EXIT_WINDOW_RANGE_MS.0, EXIT_WINDOW_RANGE_MS.1);
        self.render_workers = self.render_workers.max(1);
        self.cache_size = self.cache_size.max(1);
        self
    }

    #[must_use]
    pub fn exit_window(&self) -> Duration {
        Duration::from_millis(self.exit_gesture_window_ms)
    }

    #[must_use]
    pub fn mode_config(&self) -> ModeConfig {
        ModeConfig {
            normal_tap_zones: self.normal_tap_zones,
            performance_tap_zones: self.performance_tap_zones,
            exit_window: self.exit_window(),
        }
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            workers: self.render_workers,
            cache_size: self.cache_size,
            prefetch_radius: self.prefetch_radius,
            oversampling: self.oversampling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: EngineSettings = serde_yaml::from_str("cache_size: 8\n").unwrap();
        assert_eq!(settings.cache_size, 8);
        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.performance_tap_zones, TapZoneConfig::PERFORMANCE);
        assert_eq!(settings.exit_gesture_window_ms, 600);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let settings = EngineSettings {
            oversampling: 3.0,
            prefetch_radius: 4,
            ..EngineSettings::default()
        };
        settings.save_to_path(&path).unwrap();

        let loaded = EngineSettings::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "oversampling: [not, a, number\n").unwrap();

        assert!(EngineSettings::load_from_path(&path).is_err());
        assert_eq!(
            EngineSettings::load_or_default(Some(&path)),
            EngineSettings::default()
        );
    }

    #[test]
    fn missing_file_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let settings = EngineSettings::load_or_default(Some(&path));
        assert_eq!(settings, EngineSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn values_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "version: 1\noversampling: 0.5\nrender_workers: 0\nexit_gesture_window_ms: 5\n",
        )
        .unwrap();

        let settings = EngineSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.oversampling, MIN_OVERSAMPLING);
        assert_eq!(settings.render_workers, 1);
        assert_eq!(settings.exit_gesture_window_ms, 150);
    }

    #[test]
    fn old_version_is_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "version: 0\nperformance_tap_zones:\n  backward_ratio: 0.25\n  forward_ratio: 0.25\n",
        )
        .unwrap();

        let settings = EngineSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.performance_tap_zones, TapZoneConfig::PERFORMANCE);

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("version: 1"));
    }

    #[test]
    fn converts_to_component_configs() {
        let settings = EngineSettings::default();
        assert_eq!(settings.mode_config().exit_window, Duration::from_millis(600));
        assert_eq!(settings.service_config().workers, DEFAULT_WORKERS);
    }
}
