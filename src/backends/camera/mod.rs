// SPDX-License-Identifier: GPL-3.0-only
// Camera driver boundary consumed by the portal

//! Camera backend abstraction
//!
//! The portal never talks to hardware directly. A driver implements
//! [`CameraDevice`] and a [`CameraFactory`] hands out devices by name.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    VisionPortal     │  ← Lifecycle state machine, processor registry
//! └──────────┬──────────┘
//!            │ open/start/stop/close
//!            ▼
//! ┌─────────────────────┐
//! │ CameraDevice Trait  │  ← Async open/close, blocking start/stop
//! └──────────┬──────────┘
//!            │ frames (driver capture thread)
//!            ▼
//! ┌─────────────────────┐
//! │  FramePipeline      │  ← Portal's processing pipeline
//! └─────────────────────┘
//! ```

pub mod frame_loop;
pub mod types;

pub use types::*;

use crate::processor::{Canvas, DrawContextBundle, ProcessedFrame, ViewportDims};
use std::sync::Arc;

/// Invoked once when an asynchronous open finishes
pub type OpenCallback = Box<dyn FnOnce(Result<(), DeviceError>) + Send + 'static>;

/// Invoked once when an asynchronous close finishes
pub type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

/// A camera device as exposed by its driver
///
/// Drivers are internally synchronized: every method takes `&self` and may
/// be called from the portal's caller thread or its background transition
/// threads. Callbacks may run on any thread, including synchronously inside
/// the call that registered them.
pub trait CameraDevice: Send + Sync {
    // ===== Lifecycle =====

    /// Begin opening the device; `on_complete` reports the outcome
    fn open_async(&self, on_complete: OpenCallback);

    /// Start streaming frames to the installed pipeline (blocking)
    fn start_streaming(&self, config: &StreamConfig);

    /// Stop streaming frames (blocking)
    ///
    /// When this returns no further frame will be delivered until the next
    /// [`CameraDevice::start_streaming`].
    fn stop_streaming(&self);

    /// Begin closing the device; `on_closed` runs once it is released
    fn close_async(&self, on_closed: CloseCallback);

    // ===== Frame delivery =====

    /// Install the consumer that receives every captured frame
    fn set_pipeline(&self, pipeline: Arc<dyn FramePipeline>);

    // ===== Live view =====

    fn pause_viewport(&self);

    fn resume_viewport(&self);

    // ===== Metadata =====

    /// Frames per second currently being delivered
    fn fps(&self) -> f32;
}

/// Consumer of frames delivered by a [`CameraDevice`]
///
/// All three methods are called from the driver's capture thread (or its
/// render thread for `on_draw`), never concurrently with each other for the
/// same frame.
pub trait FramePipeline: Send + Sync {
    /// Called exactly once, with the first frame, before any `on_frame`
    fn on_init(&self, first_frame: &CameraFrame);

    /// Process one frame; the returned frame is what the live view shows
    fn on_frame(&self, frame: CameraFrame, capture_time_nanos: u64) -> ProcessedFrame;

    /// Draw overlays for a frame previously returned from `on_frame`
    fn on_draw(&self, canvas: &mut dyn Canvas, viewport: &ViewportDims, contexts: DrawContextBundle);
}

/// Creates devices for camera names
pub trait CameraFactory: Send + Sync {
    /// Create (but do not open) a device for a webcam
    ///
    /// `live_view` tells the driver whether it should render a preview at
    /// all. Returns `None` if the driver could not produce a device.
    fn create_webcam(&self, name: &WebcamName, live_view: bool) -> Option<Arc<dyn CameraDevice>>;
}

/// Hardware parameter groups a camera may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Exposure,
    Focus,
    Gain,
    WhiteBalance,
    PanTiltZoom,
}

/// Handle to one group of hardware parameters
///
/// No driver currently hands these out; the portal reports them as
/// unsupported.
pub trait CameraControl: Send + Sync {
    fn kind(&self) -> ControlKind;
}
