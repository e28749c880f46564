// SPDX-License-Identifier: GPL-3.0-only

//! Portal-wide constants

use crate::backends::camera::types::Size;
use std::time::Duration;

/// Resolution requested when the caller does not choose one
pub const DEFAULT_CAMERA_RESOLUTION: Size = Size::new(640, 480);

/// How long [`crate::VisionPortal::wait_for_state`] callers typically wait
/// for a lifecycle transition to settle
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix for raw frame captures whose name has no directory component
pub const CAPTURE_FILE_PREFIX: &str = "VisionPortal-";

/// Extension appended to raw captures that do not carry one
pub const CAPTURE_FILE_EXTENSION: &str = "png";

/// Directory name used for captures and config under the user's dirs
pub const APP_DIR_NAME: &str = "vision-portal";

/// Name of the JSON config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Virtual camera timing defaults
pub mod virtual_camera {
    use std::time::Duration;

    /// Frames per second generated by the virtual camera
    pub const DEFAULT_FRAMERATE: u32 = 30;

    /// Simulated latency between `open_async` and its callback
    pub const DEFAULT_OPEN_LATENCY: Duration = Duration::from_millis(150);

    /// Simulated latency between `close_async` and its callback
    pub const DEFAULT_CLOSE_LATENCY: Duration = Duration::from_millis(50);

    /// Error code reported when a simulated open fails
    pub const OPEN_FAILURE_CODE: i32 = -1;

    /// Window over which FPS is averaged
    pub const FPS_WINDOW: Duration = Duration::from_secs(1);
}

/// QR detection tuning
pub mod qr {
    /// Frames larger than this (in either dimension) are sampled down before detection
    pub const MAX_DIMENSION: u32 = 640;

    /// Outline stroke width in canvas pixels (before density scaling)
    pub const OUTLINE_STROKE: f32 = 4.0;

    /// Outline color (RGBA)
    pub const OUTLINE_COLOR: [u8; 4] = [0, 255, 0, 255];
}
