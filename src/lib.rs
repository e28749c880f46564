// SPDX-License-Identifier: MPL-2.0

//! Vision Portal - camera lifecycle and frame processing for vision pipelines
//!
//! A [`VisionPortal`] opens one camera through a [`CameraFactory`], streams
//! its frames and fans each one out to an ordered set of
//! [`VisionProcessor`]s, which may annotate a live view.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`portal`]: The portal facade, its lifecycle state machine and pipeline
//! - [`processor`]: The processor trait, draw contexts and built-in processors
//! - [`backends`]: Camera driver traits and the software virtual camera
//! - [`config`]: Persisted portal configuration
//! - [`storage`]: Raw frame capture to disk
//!
//! # Example
//!
//! ```ignore
//! let portal = VisionPortal::builder(Arc::new(VirtualCameraFactory::default()))
//!     .camera(WebcamName::new("Webcam 1"))
//!     .add_processor(Arc::new(QrProcessor::new()))
//!     .build()?;
//! portal.wait_for_state(CameraState::Streaming, DEFAULT_SETTLE_TIMEOUT).await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod portal;
pub mod processor;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::types::{
    CameraCalibration, CameraFrame, CameraName, PixelFormat, SensorRotation, Size, StreamFormat,
    WebcamName,
};
pub use backends::camera::{CameraDevice, CameraFactory, ControlKind};
pub use backends::virtual_camera::{VirtualCameraFactory, VirtualCameraSettings};
pub use config::PortalConfig;
pub use errors::{PortalError, PortalResult};
pub use portal::{CameraState, VisionPortal, VisionPortalBuilder};
pub use processor::{DrawContext, QrDetection, QrProcessor, VisionProcessor};
pub use storage::{FrameSaver, PngFrameSaver};
