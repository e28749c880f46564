// SPDX-License-Identifier: GPL-3.0-only

//! The vision portal facade
//!
//! A [`VisionPortal`] owns one camera device and a fixed set of
//! [`VisionProcessor`]s. Building it immediately starts opening the camera;
//! once the driver reports the device ready the portal starts streaming and
//! every frame is fanned out to the enabled processors.
//!
//! All lifecycle calls return immediately. Use [`VisionPortal::camera_state`]
//! to poll, or [`VisionPortal::wait_for_state`] to await a transition.

mod lifecycle;
mod pipeline;
mod registry;
mod state;

pub use state::CameraState;

use crate::backends::camera::types::{
    CameraCalibration, CameraName, SensorRotation, Size, StreamConfig, StreamFormat, WebcamName,
};
use crate::backends::camera::{CameraControl, CameraFactory, ControlKind};
use crate::config::PortalConfig;
use crate::errors::{PortalError, PortalResult};
use crate::processor::VisionProcessor;
use crate::storage::{FrameSaver, PngFrameSaver};
use lifecycle::Lifecycle;
use pipeline::ProcessingPipeline;
use registry::ProcessorRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

enum SaverChoice {
    Default,
    Custom(Arc<dyn FrameSaver>),
    Disabled,
}

/// Builder for [`VisionPortal`]
pub struct VisionPortalBuilder {
    factory: Arc<dyn CameraFactory>,
    camera: Option<CameraName>,
    config: PortalConfig,
    processors: Vec<Arc<dyn VisionProcessor>>,
    calibration: Option<CameraCalibration>,
    frame_saver: SaverChoice,
}

impl VisionPortalBuilder {
    fn new(factory: Arc<dyn CameraFactory>) -> Self {
        Self {
            factory,
            camera: None,
            config: PortalConfig::default(),
            processors: Vec::new(),
            calibration: None,
            frame_saver: SaverChoice::Default,
        }
    }

    pub fn camera(mut self, camera: impl Into<CameraName>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Replace every config-backed setting at once
    pub fn config(mut self, config: PortalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn camera_resolution(mut self, size: Size) -> Self {
        self.config.camera_resolution = size;
        self
    }

    pub fn stream_format(mut self, format: StreamFormat) -> Self {
        self.config.stream_format = format;
        self
    }

    pub fn rotation(mut self, rotation: SensorRotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    pub fn enable_live_view(mut self, enable: bool) -> Self {
        self.config.enable_live_view = enable;
        self
    }

    /// Pause the live view automatically while no processor is enabled
    pub fn auto_stop_live_view(mut self, auto_stop: bool) -> Self {
        self.config.auto_stop_live_view = auto_stop;
        self
    }

    /// Attach a processor; processors run in the order they are added
    pub fn add_processor<P: VisionProcessor + 'static>(mut self, processor: Arc<P>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn add_processors(mut self, processors: impl IntoIterator<Item = Arc<dyn VisionProcessor>>) -> Self {
        self.processors.extend(processors);
        self
    }

    pub fn calibration(mut self, calibration: CameraCalibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Persist `save_next_frame_raw` captures with `saver` instead of PNG files
    pub fn frame_saver(mut self, saver: Arc<dyn FrameSaver>) -> Self {
        self.frame_saver = SaverChoice::Custom(saver);
        self
    }

    /// Drop capture requests instead of persisting them
    pub fn without_frame_saver(mut self) -> Self {
        self.frame_saver = SaverChoice::Disabled;
        self
    }

    /// Validate parameters, create the device and start opening it
    pub fn build(self) -> PortalResult<VisionPortal> {
        let camera = self
            .camera
            .ok_or_else(|| PortalError::invalid_argument("no camera specified"))?;
        let config = self.config;
        if config.camera_resolution.is_empty() {
            return Err(PortalError::invalid_argument(format!(
                "camera resolution {} has a zero dimension",
                config.camera_resolution
            )));
        }

        let webcam = match &camera {
            CameraName::Webcam(webcam) => webcam,
            other => {
                return Err(PortalError::invalid_argument(format!(
                    "Unknown camera name: {}",
                    other
                )));
            }
        };
        let device = self
            .factory
            .create_webcam(webcam, config.enable_live_view)
            .ok_or_else(|| PortalError::illegal_state(format!("no device created for {}", camera)))?;

        let frame_saver: Option<Arc<dyn FrameSaver>> = match self.frame_saver {
            SaverChoice::Default => Some(Arc::new(
                config
                    .capture_dir
                    .clone()
                    .map(PngFrameSaver::new)
                    .unwrap_or_default(),
            )),
            SaverChoice::Custom(saver) => Some(saver),
            SaverChoice::Disabled => None,
        };

        let registry = Arc::new(ProcessorRegistry::new(self.processors));
        let pipeline = Arc::new(ProcessingPipeline::new(
            Arc::clone(&registry),
            self.calibration,
            frame_saver,
        ));
        let stream = StreamConfig {
            size: config.camera_resolution,
            rotation: config.rotation,
            format: config.stream_format,
        };
        let lifecycle = Arc::new(Lifecycle::new(device, stream, pipeline.clone()));

        info!(camera = %camera, processors = registry.len(), "Creating vision portal");
        lifecycle.open()?;

        Ok(VisionPortal {
            lifecycle,
            registry,
            pipeline,
            auto_stop_live_view: config.auto_stop_live_view,
        })
    }
}

/// One camera, its lifecycle and its attached processors
pub struct VisionPortal {
    lifecycle: Arc<Lifecycle>,
    registry: Arc<ProcessorRegistry>,
    pipeline: Arc<ProcessingPipeline>,
    auto_stop_live_view: bool,
}

impl VisionPortal {
    /// Start building a portal whose devices come from `factory`
    pub fn builder(factory: Arc<dyn CameraFactory>) -> VisionPortalBuilder {
        VisionPortalBuilder::new(factory)
    }

    // ===== Processors =====

    /// Enable or disable an attached processor
    ///
    /// Fails with [`PortalError::InvalidArgument`] if `processor` was never
    /// attached to this portal. With auto-stop live view on, the live view is
    /// paused when this leaves no processor enabled and resumed otherwise.
    pub fn set_processor_enabled(&self, processor: &dyn VisionProcessor, enabled: bool) -> PortalResult<()> {
        let enabled_count = self.registry.set_enabled(processor, enabled)?;

        if self.auto_stop_live_view {
            if enabled_count == 0 {
                self.stop_live_view();
            } else {
                self.resume_live_view();
            }
        }
        Ok(())
    }

    pub fn processor_enabled(&self, processor: &dyn VisionProcessor) -> PortalResult<bool> {
        self.registry.is_enabled(processor)
    }

    pub fn processors(&self) -> &[Arc<dyn VisionProcessor>] {
        self.registry.processors()
    }

    // ===== State =====

    pub fn camera_state(&self) -> CameraState {
        self.lifecycle.state()
    }

    /// Receiver that observes every committed state change
    pub fn subscribe_state(&self) -> watch::Receiver<CameraState> {
        self.lifecycle.subscribe()
    }

    /// Wait until the camera reaches `target`
    ///
    /// Fails with [`PortalError::DeviceOpenFailure`] if the camera lands in
    /// [`CameraState::Error`] instead, and with [`PortalError::Timeout`] if
    /// neither happens within `timeout`.
    pub async fn wait_for_state(&self, target: CameraState, timeout: Duration) -> PortalResult<()> {
        let mut rx = self.lifecycle.subscribe();
        let settled = match tokio::time::timeout(
            timeout,
            rx.wait_for(|state| *state == target || *state == CameraState::Error),
        )
        .await
        {
            Ok(Ok(state)) => *state,
            Ok(Err(_)) => return Err(PortalError::illegal_state("camera state channel closed")),
            Err(_) => {
                return Err(PortalError::Timeout {
                    expected: target,
                    actual: self.camera_state(),
                });
            }
        };

        if settled == target {
            Ok(())
        } else {
            Err(PortalError::DeviceOpenFailure(
                "camera entered the ERROR state".to_string(),
            ))
        }
    }

    // ===== Capture =====

    /// Save the next delivered frame, before any processor touches it
    pub fn save_next_frame_raw(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "Raw frame capture requested");
        self.pipeline.request_capture(path);
    }

    // ===== Streaming =====

    /// Stop streaming frames, keeping the device open
    ///
    /// Returns at once; the state passes through
    /// [`CameraState::StoppingStream`] to [`CameraState::DeviceReady`].
    pub fn stop_streaming(&self) -> PortalResult<()> {
        self.lifecycle.stop_streaming()
    }

    /// Restart streaming with the resolution, rotation and format given at build time
    pub fn resume_streaming(&self) -> PortalResult<()> {
        self.lifecycle.resume_streaming()
    }

    // ===== Live view =====

    pub fn stop_live_view(&self) {
        if let Some(device) = self.lifecycle.device() {
            device.pause_viewport();
        }
    }

    pub fn resume_live_view(&self) {
        if let Some(device) = self.lifecycle.device() {
            device.resume_viewport();
        }
    }

    /// Frames per second being delivered, or 0 without a device
    pub fn fps(&self) -> f32 {
        self.lifecycle.device().map(|device| device.fps()).unwrap_or(0.0)
    }

    // ===== Unsupported hardware access =====

    /// Hardware controls are not available through this portal
    ///
    /// Fails with [`PortalError::Unsupported`] while streaming and with
    /// [`PortalError::IllegalState`] otherwise.
    pub fn camera_control(&self, kind: ControlKind) -> PortalResult<Arc<dyn CameraControl>> {
        if self.camera_state() == CameraState::Streaming {
            Err(PortalError::unsupported(format!(
                "{:?} control is not supported",
                kind
            )))
        } else {
            Err(PortalError::illegal_state(
                "camera controls are only available while streaming",
            ))
        }
    }

    pub fn set_active_camera(&self, webcam: &WebcamName) -> PortalResult<()> {
        Err(PortalError::unsupported(format!(
            "cannot switch to '{}': active camera switching is only supported for switchable webcams",
            webcam
        )))
    }

    pub fn active_camera(&self) -> PortalResult<WebcamName> {
        Err(PortalError::unsupported(
            "active camera is only reported for switchable webcams",
        ))
    }

    // ===== Teardown =====

    /// Release the device; always permitted
    pub fn close(&self) {
        self.lifecycle.close();
    }
}

impl Drop for VisionPortal {
    fn drop(&mut self) {
        self.lifecycle.close();
    }
}

impl std::fmt::Debug for VisionPortal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionPortal")
            .field("state", &self.camera_state())
            .field("processors", &self.registry.len())
            .field("auto_stop_live_view", &self.auto_stop_live_view)
            .finish()
    }
}
