// SPDX-License-Identifier: GPL-3.0-only

//! Render surfaces processors draw overlays on

use crate::backends::camera::types::CameraFrame;
use image::{Rgba, RgbaImage};

/// Surface a live view hands to processors' draw hooks
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Draw a straight line of the given stroke width
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: [u8; 4], stroke_width: f32);

    /// Outline an axis-aligned rectangle
    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: [u8; 4], stroke_width: f32) {
        let (x1, y1) = (x + width, y + height);
        self.stroke_line((x, y), (x1, y), color, stroke_width);
        self.stroke_line((x1, y), (x1, y1), color, stroke_width);
        self.stroke_line((x1, y1), (x, y1), color, stroke_width);
        self.stroke_line((x, y1), (x, y), color, stroke_width);
    }
}

/// In-memory RGBA canvas
///
/// Used by the virtual camera's live view, and handy for tests.
#[derive(Debug, Clone)]
pub struct ImageCanvas {
    image: RgbaImage,
}

impl ImageCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Start from the pixels of a frame
    pub fn from_frame(frame: &CameraFrame) -> Self {
        let image = frame
            .to_dynamic_image()
            .map(|img| img.to_rgba8())
            .unwrap_or_else(|| RgbaImage::new(frame.width, frame.height));
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn fill_square(&mut self, cx: f32, cy: f32, half: f32, color: Rgba<u8>) {
        let x0 = (cx - half).floor().max(0.0) as u32;
        let y0 = (cy - half).floor().max(0.0) as u32;
        let x1 = ((cx + half).ceil().max(0.0) as u32).min(self.image.width());
        let y1 = ((cy + half).ceil().max(0.0) as u32).min(self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x, y, color);
            }
        }
    }
}

impl Canvas for ImageCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: [u8; 4], stroke_width: f32) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        let half = (stroke_width / 2.0).max(0.5);
        let color = Rgba(color);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.fill_square(from.0 + dx * t, from.1 + dy * t, half, color);
        }
    }
}
