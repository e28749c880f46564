// SPDX-License-Identifier: GPL-3.0-only

//! Persisted portal parameters

use crate::backends::camera::types::{SensorRotation, Size, StreamFormat};
use crate::constants::{APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CAMERA_RESOLUTION};
use crate::errors::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parameters a portal is built with
///
/// Missing fields in a config file fall back to their defaults, so older
/// files keep loading as fields are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Resolution to stream at
    pub camera_resolution: Size,
    /// Webcam wire format (YUY2 or MJPEG)
    pub stream_format: StreamFormat,
    /// Rotation applied when streaming
    pub rotation: SensorRotation,
    /// Render a live view at all
    pub enable_live_view: bool,
    /// Pause the live view while no processor is enabled
    pub auto_stop_live_view: bool,
    /// Where raw frame captures go (None = ~/Pictures/vision-portal)
    pub capture_dir: Option<PathBuf>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            camera_resolution: DEFAULT_CAMERA_RESOLUTION,
            stream_format: StreamFormat::default(),
            rotation: SensorRotation::default(),
            enable_live_view: true,
            auto_stop_live_view: true,
            capture_dir: None,
        }
    }
}

impl PortalConfig {
    /// `<config dir>/vision-portal/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> PortalResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PortalError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(path = %path.display(), ?config, "Loaded portal config");
        Ok(config)
    }

    /// Load `path`, falling back to defaults if it is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable portal config");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> PortalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Saved portal config");
        Ok(())
    }
}
