// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame fan-out to the attached processors

use super::registry::ProcessorRegistry;
use crate::backends::camera::FramePipeline;
use crate::backends::camera::types::{CameraCalibration, CameraFrame};
use crate::processor::{Canvas, DrawContextBundle, ProcessedFrame, ViewportDims};
use crate::storage::FrameSaver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// The frame consumer a portal installs on its device
pub(crate) struct ProcessingPipeline {
    registry: Arc<ProcessorRegistry>,
    calibration: Option<CameraCalibration>,
    capture_request: Mutex<Option<PathBuf>>,
    frame_saver: Option<Arc<dyn FrameSaver>>,
    initialized: AtomicBool,
}

impl ProcessingPipeline {
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        calibration: Option<CameraCalibration>,
        frame_saver: Option<Arc<dyn FrameSaver>>,
    ) -> Self {
        Self {
            registry,
            calibration,
            capture_request: Mutex::new(None),
            frame_saver,
            initialized: AtomicBool::new(false),
        }
    }

    /// Ask for the next delivered frame to be saved to `path`
    ///
    /// A later request before the next frame replaces this one.
    pub fn request_capture(&self, path: PathBuf) {
        let mut pending = self.capture_request.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(path) {
            debug!(path = %previous.display(), "Replacing pending capture request");
        }
    }

    fn take_capture_request(&self) -> Option<PathBuf> {
        self.capture_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn save_frame(&self, frame: &CameraFrame, path: PathBuf) {
        match &self.frame_saver {
            Some(saver) => {
                if let Err(e) = saver.save(frame, &path) {
                    warn!(path = %path.display(), error = %e, "Failed to save raw frame");
                }
            }
            None => {
                debug!(path = %path.display(), "No frame saver configured; capture request dropped");
            }
        }
    }
}

impl FramePipeline for ProcessingPipeline {
    fn on_init(&self, first_frame: &CameraFrame) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Pipeline already initialized; ignoring repeated init");
            return;
        }

        info!(
            width = first_frame.width,
            height = first_frame.height,
            processors = self.registry.len(),
            calibrated = self.calibration.is_some(),
            "Initializing processors"
        );
        for processor in self.registry.processors() {
            processor.init(first_frame.width, first_frame.height, self.calibration.as_ref());
        }
    }

    fn on_frame(&self, mut frame: CameraFrame, capture_time_nanos: u64) -> ProcessedFrame {
        if let Some(path) = self.take_capture_request() {
            self.save_frame(&frame, path);
        }

        let mut contexts = DrawContextBundle::with_len(self.registry.len());
        for (index, processor) in self.registry.processors().iter().enumerate() {
            if self.registry.is_enabled_at(index) {
                contexts.set(index, processor.process_frame(&mut frame, capture_time_nanos));
            }
        }

        ProcessedFrame { frame, contexts }
    }

    fn on_draw(&self, canvas: &mut dyn Canvas, viewport: &ViewportDims, contexts: DrawContextBundle) {
        let processors = self.registry.processors();
        for (index, (processor, context)) in processors.iter().zip(contexts.into_slots()).enumerate() {
            if self.registry.is_enabled_at(index) {
                processor.on_draw_frame(canvas, viewport, context);
            }
        }
    }
}
