// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection processor
//!
//! Finds and decodes QR codes with the `rqrr` crate. Large frames are
//! sampled down to a bounded size first; detections are mapped back to
//! full-frame coordinates and outlined on the live view.

use crate::backends::camera::types::{CameraCalibration, CameraFrame, Size};
use crate::constants::qr;
use crate::processor::types::{QrDetection, Quad};
use crate::processor::{Canvas, DrawContext, ViewportDims, VisionProcessor};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace};

/// QR code detector
pub struct QrProcessor {
    max_dimension: u32,
    frame_size: Mutex<Option<Size>>,
    latest: Mutex<Vec<QrDetection>>,
}

impl Default for QrProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QrProcessor {
    pub fn new() -> Self {
        Self::with_max_dimension(qr::MAX_DIMENSION)
    }

    /// Create a detector that samples frames down to `max_dimension`
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            frame_size: Mutex::new(None),
            latest: Mutex::new(Vec::new()),
        }
    }

    /// Detections from the most recently processed frame
    pub fn detections(&self) -> Vec<QrDetection> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Frame size reported to `init`, if it has run
    pub fn frame_size(&self) -> Option<Size> {
        *self.frame_size.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn detect(&self, frame: &CameraFrame, capture_time_nanos: u64) -> Vec<QrDetection> {
        let start = std::time::Instant::now();

        let step = frame.width.max(frame.height).div_ceil(self.max_dimension).max(1);
        let width = (frame.width / step) as usize;
        let height = (frame.height / step) as usize;
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            frame.luma(x as u32 * step, y as u32 * step)
        });
        let grids = prepared.detect_grids();

        let detections: Vec<QrDetection> = grids
            .iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, content)) => {
                    let outline = Quad {
                        corners: std::array::from_fn(|i| {
                            (grid.bounds[i].x as f32, grid.bounds[i].y as f32)
                        }),
                    }
                    .scaled(step as f32);
                    Some(QrDetection {
                        content,
                        outline,
                        capture_time_nanos,
                    })
                }
                Err(e) => {
                    debug!(error = ?e, "Found QR grid but failed to decode");
                    None
                }
            })
            .collect();

        trace!(
            width,
            height,
            step,
            grids = grids.len(),
            decoded = detections.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "QR detection complete"
        );

        detections
    }
}

impl VisionProcessor for QrProcessor {
    fn init(&self, width: u32, height: u32, _calibration: Option<&CameraCalibration>) {
        *self.frame_size.lock().unwrap_or_else(PoisonError::into_inner) = Some(Size::new(width, height));
    }

    fn process_frame(&self, frame: &mut CameraFrame, capture_time_nanos: u64) -> Option<DrawContext> {
        let detections = self.detect(frame, capture_time_nanos);
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = detections.clone();
        Some(Box::new(detections))
    }

    fn on_draw_frame(&self, canvas: &mut dyn Canvas, viewport: &ViewportDims, context: Option<DrawContext>) {
        let Some(detections) = context.and_then(|ctx| ctx.downcast::<Vec<QrDetection>>().ok()) else {
            return;
        };

        let scale = viewport.scale_bmp_px_to_canvas_px;
        let stroke = qr::OUTLINE_STROKE * viewport.scale_canvas_density;
        for detection in detections.iter() {
            let corners = detection.outline.scaled(scale).corners;
            for i in 0..corners.len() {
                let next = corners[(i + 1) % corners.len()];
                canvas.stroke_line(corners[i], next, qr::OUTLINE_COLOR, stroke);
            }
        }
    }
}
