// SPDX-License-Identifier: GPL-3.0-only

//! Pixel sources for the virtual camera

use crate::backends::camera::types::{CameraFrame, PixelFormat, Size};
use crate::errors::{PortalError, PortalResult};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the virtual camera's pixels come from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FrameSource {
    /// Animated gradient with a sweeping bar
    #[default]
    TestPattern,
    /// A still image, scaled to the stream size and repeated every frame
    Image(PathBuf),
}

/// Load an image file as an RGBA frame of exactly `size`
pub fn load_image_as_frame(path: &Path, size: Size) -> PortalResult<CameraFrame> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path)?;
    let rgba = if img.width() == size.width && img.height() == size.height {
        img.to_rgba8()
    } else {
        image::imageops::resize(&img.to_rgba8(), size.width, size.height, FilterType::Triangle)
    };

    info!(width = size.width, height = size.height, "Image loaded successfully");

    CameraFrame::from_raw(size.width, size.height, PixelFormat::Rgba, rgba.into_raw()).ok_or_else(
        || PortalError::Storage(format!("decoded image '{}' has unexpected length", path.display())),
    )
}

/// Render frame number `frame_index` of the test pattern
pub fn test_pattern(size: Size, frame_index: u64) -> CameraFrame {
    let mut frame = CameraFrame::new(size.width, size.height, PixelFormat::Rgba);
    if size.is_empty() {
        return frame;
    }

    let shift = (frame_index % 256) as u32;
    let bar_x = (frame_index * 4 % size.width as u64) as u32;
    let stride = frame.stride as usize;

    for (y, row) in frame.data.chunks_mut(stride).enumerate() {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let (x, y) = (x as u32, y as u32);
            if x.abs_diff(bar_x) < 2 {
                px.copy_from_slice(&[255, 255, 255, 255]);
                continue;
            }
            px[0] = ((x * 255 / size.width + shift) % 256) as u8;
            px[1] = ((y * 255 / size.height + shift) % 256) as u8;
            px[2] = (((x + y) / 4 + shift) % 256) as u8;
            px[3] = 255;
        }
    }
    frame
}

/// Frames for one streaming session
pub(super) struct SourceFrames {
    size: Size,
    still: Option<CameraFrame>,
    next_index: u64,
}

impl SourceFrames {
    pub fn open(source: &FrameSource, size: Size) -> PortalResult<Self> {
        let still = match source {
            FrameSource::TestPattern => None,
            FrameSource::Image(path) => Some(load_image_as_frame(path, size)?),
        };
        Ok(Self {
            size,
            still,
            next_index: 0,
        })
    }

    pub fn next_frame(&mut self) -> CameraFrame {
        let index = self.next_index;
        self.next_index += 1;
        match &self.still {
            Some(frame) => frame.clone(),
            None => test_pattern(self.size, index),
        }
    }
}
