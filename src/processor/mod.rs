// SPDX-License-Identifier: GPL-3.0-only

//! Vision processors and the per-frame draw plumbing
//!
//! A [`VisionProcessor`] sees every frame while it is enabled. Whatever it
//! returns from [`VisionProcessor::process_frame`] travels, untouched, to its
//! own [`VisionProcessor::on_draw_frame`] for the same frame.

pub mod canvas;
pub mod tasks;
pub mod types;

pub use canvas::{Canvas, ImageCanvas};
pub use tasks::QrProcessor;
pub use types::{QrDetection, Quad};

use crate::backends::camera::types::{CameraCalibration, CameraFrame};
use std::any::Any;

/// Opaque value handed from a processor's frame step to its draw step
pub type DrawContext = Box<dyn Any + Send>;

/// A per-frame analysis unit attached to a portal
///
/// Processors are shared between the caller (who toggles them) and the
/// driver's capture thread (which runs them), so every hook takes `&self`;
/// implementations keep mutable state behind their own locks.
pub trait VisionProcessor: Send + Sync {
    /// Called once with the first frame's dimensions, whether or not the
    /// processor is enabled at that point
    fn init(&self, width: u32, height: u32, calibration: Option<&CameraCalibration>);

    /// Analyse (and optionally modify) a frame
    fn process_frame(&self, frame: &mut CameraFrame, capture_time_nanos: u64) -> Option<DrawContext>;

    /// Draw overlays for the frame that produced `context`
    fn on_draw_frame(
        &self,
        _canvas: &mut dyn Canvas,
        _viewport: &ViewportDims,
        _context: Option<DrawContext>,
    ) {
    }
}

/// Geometry of the live view a frame is being drawn into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportDims {
    pub onscreen_width: u32,
    pub onscreen_height: u32,
    /// Multiply frame pixel coordinates by this to get canvas coordinates
    pub scale_bmp_px_to_canvas_px: f32,
    /// Display density, for sizing strokes and text
    pub scale_canvas_density: f32,
}

impl ViewportDims {
    /// Viewport that shows a frame 1:1 at unit density
    pub fn unscaled(width: u32, height: u32) -> Self {
        Self {
            onscreen_width: width,
            onscreen_height: height,
            scale_bmp_px_to_canvas_px: 1.0,
            scale_canvas_density: 1.0,
        }
    }
}

/// One draw-context slot per registered processor, for a single frame
///
/// A fresh bundle is built for every frame so a context can never leak into
/// the draw step of a later frame. Slots of processors that were disabled
/// (or returned nothing) are `None`.
#[derive(Default)]
pub struct DrawContextBundle {
    slots: Vec<Option<DrawContext>>,
}

impl DrawContextBundle {
    /// Bundle with `len` empty slots
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn set(&mut self, index: usize, context: Option<DrawContext>) {
        self.slots[index] = context;
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_some)
    }

    /// Borrow the context in `index`, if it holds a `T`
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    pub fn into_slots(self) -> Vec<Option<DrawContext>> {
        self.slots
    }
}

impl std::fmt::Debug for DrawContextBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set: Vec<bool> = self.slots.iter().map(Option::is_some).collect();
        f.debug_struct("DrawContextBundle").field("set", &set).finish()
    }
}

/// Result of running the pipeline over one frame
#[derive(Debug)]
pub struct ProcessedFrame {
    /// The frame to display, including any processor edits
    pub frame: CameraFrame,
    /// Contexts to pass to [`crate::backends::camera::FramePipeline::on_draw`]
    pub contexts: DrawContextBundle,
}
