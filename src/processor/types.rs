// SPDX-License-Identifier: GPL-3.0-only

//! Result types produced by the built-in processors

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Four corners of a detected shape, in frame pixel coordinates
///
/// Corners are in detection order (top-left, top-right, bottom-right,
/// bottom-left for an upright code).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [(f32, f32); 4],
}

impl Quad {
    /// Scale every corner, e.g. to map a downsampled detection back to full size
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            corners: self.corners.map(|(x, y)| (x * factor, y * factor)),
        }
    }

    /// Axis-aligned bounds normalized to a frame of the given size
    pub fn bounds(&self, frame_width: u32, frame_height: u32) -> FrameRegion {
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for (x, y) in self.corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        FrameRegion {
            x: min_x / frame_width as f32,
            y: min_y / frame_height as f32,
            width: (max_x - min_x) / frame_width as f32,
            height: (max_y - min_y) / frame_height as f32,
        }
    }
}

/// A decoded QR code and where it was found
#[derive(Debug, Clone, PartialEq)]
pub struct QrDetection {
    pub content: String,
    pub outline: Quad,
    /// Capture timestamp of the frame the code was found in
    pub capture_time_nanos: u64,
}
