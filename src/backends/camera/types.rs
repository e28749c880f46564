// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the camera driver boundary

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame or stream dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Wire format requested from a webcam when streaming starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StreamFormat {
    /// Uncompressed YUY2 (4:2:2); lowest latency, bandwidth bound
    #[default]
    Yuy2,
    /// Motion JPEG; higher resolutions at the cost of decode time
    Mjpeg,
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Yuy2 => write!(f, "YUY2"),
            StreamFormat::Mjpeg => write!(f, "MJPEG"),
        }
    }
}

/// Rotation applied to the sensor image when streaming (clockwise)
///
/// `None` streams in the sensor's native orientation. Quarter turns swap
/// the delivered frame's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }

    /// Dimensions of frames delivered for a stream of `size` with this rotation
    pub fn apply(&self, size: Size) -> Size {
        if self.swaps_dimensions() {
            Size::new(size.height, size.width)
        } else {
            size
        }
    }
}

impl fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Everything a driver needs to (re)start a stream
///
/// The portal captures this once at construction so a resumed stream uses
/// the same resolution, rotation and format as the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub size: Size,
    pub rotation: SensorRotation,
    pub format: StreamFormat,
}

impl fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.size, self.format, self.rotation)
    }
}

/// Identifies a USB webcam attached to the system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebcamName {
    pub name: String,
}

impl WebcamName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for WebcamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Direction of a camera built into the host device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCameraDirection {
    Front,
    Back,
}

/// The camera a portal should drive
///
/// Only [`CameraName::Webcam`] can be opened; the other variants exist so
/// callers get a clear rejection instead of a silent fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraName {
    Webcam(WebcamName),
    Builtin(BuiltinCameraDirection),
    Switchable(Vec<WebcamName>),
}

impl From<WebcamName> for CameraName {
    fn from(name: WebcamName) -> Self {
        CameraName::Webcam(name)
    }
}

impl fmt::Display for CameraName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraName::Webcam(name) => write!(f, "webcam '{}'", name),
            CameraName::Builtin(direction) => write!(f, "builtin {:?} camera", direction),
            CameraName::Switchable(names) => write!(f, "switchable camera ({} members)", names.len()),
        }
    }
}

/// Intrinsic lens calibration for a camera at one resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Resolution the calibration was measured at
    pub size: Size,
    pub focal_length_x: f32,
    pub focal_length_y: f32,
    pub principal_point_x: f32,
    pub principal_point_y: f32,
    /// Radial/tangential distortion coefficients (k1, k2, p1, p2, k3, k4, k5, k6)
    pub distortion: [f32; 8],
}

/// Pixel layout of a [`CameraFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    Rgb24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single frame from the camera
///
/// The portal's pipeline owns a frame only for the duration of one
/// processing pass; processors may modify the pixels in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// Allocate a zeroed, tightly packed frame
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = width * format.bytes_per_pixel() as u32;
        Self {
            width,
            height,
            stride,
            format,
            data: vec![0; stride as usize * height as usize],
        }
    }

    /// Wrap tightly packed pixel data; `None` if the length does not match
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let stride = width * format.bytes_per_pixel() as u32;
        if data.len() != stride as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            stride,
            format,
            data,
        })
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride as usize + x as usize * self.format.bytes_per_pixel()
    }

    /// Bytes of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.format.bytes_per_pixel()]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let start = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel();
        &mut self.data[start..start + bpp]
    }

    /// Rec. 601 luma of the pixel at (x, y)
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        match self.format {
            PixelFormat::Gray8 => self.pixel(x, y)[0],
            PixelFormat::Rgba | PixelFormat::Rgb24 => {
                let p = self.pixel(x, y);
                ((p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000) as u8
            }
        }
    }

    /// Copy the pixels into a tightly packed buffer, dropping stride padding
    ///
    /// Returns `None` when the stride or buffer length cannot hold
    /// `height` rows of `width` pixels.
    fn packed_data(&self) -> Option<Vec<u8>> {
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        let stride = self.stride as usize;
        let height = self.height as usize;
        if stride < row_bytes {
            return None;
        }
        // The final row needs no padding after it
        let required = match height {
            0 => 0,
            h => stride * (h - 1) + row_bytes,
        };
        if self.data.len() < required {
            return None;
        }
        if row_bytes == stride {
            return Some(self.data[..required].to_vec());
        }
        let mut packed = Vec::with_capacity(row_bytes * height);
        for row in self.data.chunks(stride).take(height) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        Some(packed)
    }

    /// Convert into an `image` buffer for encoding
    ///
    /// `None` if the pixel fields are inconsistent with the buffer.
    pub fn to_dynamic_image(&self) -> Option<image::DynamicImage> {
        let data = self.packed_data()?;
        match self.format {
            PixelFormat::Rgba => image::RgbaImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageRgba8),
            PixelFormat::Rgb24 => image::RgbImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageRgb8),
            PixelFormat::Gray8 => image::GrayImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageLuma8),
        }
    }
}

/// Error reported by a driver through an asynchronous callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    pub code: i32,
    pub message: String,
}

impl DeviceError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_swaps_dimensions() {
        let size = Size::new(640, 480);
        assert_eq!(SensorRotation::Rotate90.apply(size), Size::new(480, 640));
        assert_eq!(SensorRotation::Rotate180.apply(size), size);
        assert_eq!(SensorRotation::from_degrees(-90), SensorRotation::Rotate270);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(CameraFrame::from_raw(2, 2, PixelFormat::Rgba, vec![0; 15]).is_none());
        assert!(CameraFrame::from_raw(2, 2, PixelFormat::Rgba, vec![0; 16]).is_some());
    }

    #[test]
    fn test_luma_of_white_is_max() {
        let frame = CameraFrame::from_raw(1, 1, PixelFormat::Rgb24, vec![255, 255, 255]).unwrap();
        assert_eq!(frame.luma(0, 0), 255);
    }

    #[test]
    fn test_to_dynamic_image_strips_padding() {
        let mut frame = CameraFrame::new(2, 2, PixelFormat::Gray8);
        frame.stride = 4;
        frame.data = vec![1, 2, 0, 0, 3, 4, 0, 0];
        let img = frame.to_dynamic_image().unwrap().to_luma8();
        assert_eq!(img.into_raw(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_to_dynamic_image_rejects_inconsistent_layout() {
        let mut frame = CameraFrame::new(4, 2, PixelFormat::Rgba);

        // Stride narrower than one row of pixels
        frame.stride = 8;
        assert!(frame.to_dynamic_image().is_none());

        // Stride is fine but the buffer is missing the second row
        frame.stride = 16;
        frame.data.truncate(20);
        assert!(frame.to_dynamic_image().is_none());

        frame.stride = 0;
        frame.data.clear();
        assert!(frame.to_dynamic_image().is_none());
    }

    #[test]
    fn test_to_dynamic_image_accepts_unpadded_last_row() {
        let mut frame = CameraFrame::new(2, 2, PixelFormat::Gray8);
        frame.stride = 4;
        frame.data = vec![1, 2, 0, 0, 3, 4];
        let img = frame.to_dynamic_image().unwrap().to_luma8();
        assert_eq!(img.into_raw(), vec![1, 2, 3, 4]);
    }
}
