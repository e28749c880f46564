// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use vision_portal::CameraState;
use vision_portal::constants::{self, virtual_camera};

#[test]
fn test_default_resolution_is_usable() {
    assert!(!constants::DEFAULT_CAMERA_RESOLUTION.is_empty());
    assert_eq!(constants::DEFAULT_CAMERA_RESOLUTION.to_string(), "640x480");
}

#[test]
fn test_virtual_camera_close_faster_than_settle_timeout() {
    assert!(virtual_camera::DEFAULT_OPEN_LATENCY < constants::DEFAULT_SETTLE_TIMEOUT);
    assert!(virtual_camera::DEFAULT_CLOSE_LATENCY < constants::DEFAULT_SETTLE_TIMEOUT);
    assert!(virtual_camera::DEFAULT_FRAMERATE > 0);
}

#[test]
fn test_camera_state_names() {
    let names: Vec<String> = CameraState::ALL.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        names,
        [
            "CLOSED",
            "OPENING",
            "DEVICE_READY",
            "STARTING_STREAM",
            "STREAMING",
            "STOPPING_STREAM",
            "CLOSING",
            "ERROR"
        ]
    );
}
