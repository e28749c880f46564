// SPDX-License-Identifier: GPL-3.0-only

//! Persistence of raw frames requested through `save_next_frame_raw`

use crate::backends::camera::types::CameraFrame;
use crate::constants::{APP_DIR_NAME, CAPTURE_FILE_EXTENSION, CAPTURE_FILE_PREFIX};
use crate::errors::{PortalError, PortalResult};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes a single frame somewhere durable
pub trait FrameSaver: Send + Sync {
    /// Persist `frame` for a capture requested as `path`
    ///
    /// Returns the path actually written.
    fn save(&self, frame: &CameraFrame, path: &Path) -> PortalResult<PathBuf>;
}

/// Saves frames as PNG files
///
/// Absolute paths are written as given. A bare name such as `"left-goal"`
/// becomes `<capture dir>/VisionPortal-left-goal.png`; other relative paths
/// are resolved against the capture directory. A missing extension is
/// replaced with `.png`.
#[derive(Debug, Clone)]
pub struct PngFrameSaver {
    capture_dir: PathBuf,
}

impl PngFrameSaver {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            capture_dir: capture_dir.into(),
        }
    }

    /// `~/Pictures/vision-portal`, falling back to the temp dir
    pub fn default_capture_dir() -> PathBuf {
        dirs::picture_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    /// Map a requested capture path to the file that will be written
    pub fn resolve(&self, requested: &Path) -> PathBuf {
        let mut path = if requested.is_absolute() {
            requested.to_path_buf()
        } else if requested.components().count() == 1 {
            let name = requested.to_string_lossy();
            self.capture_dir.join(format!("{}{}", CAPTURE_FILE_PREFIX, name))
        } else {
            self.capture_dir.join(requested)
        };

        if path.extension().is_none() {
            path.set_extension(CAPTURE_FILE_EXTENSION);
        }
        path
    }
}

impl Default for PngFrameSaver {
    fn default() -> Self {
        Self::new(Self::default_capture_dir())
    }
}

impl FrameSaver for PngFrameSaver {
    fn save(&self, frame: &CameraFrame, path: &Path) -> PortalResult<PathBuf> {
        let target = self.resolve(path);
        let image = frame.to_dynamic_image().ok_or_else(|| {
            PortalError::Storage(format!(
                "frame buffer does not match {}x{} {:?}",
                frame.width, frame.height, frame.format
            ))
        })?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!(path = %target.display(), "Encoding raw frame");
        image.save_with_format(&target, ImageFormat::Png)?;
        info!(path = %target.display(), "Raw frame saved");
        Ok(target)
    }
}
