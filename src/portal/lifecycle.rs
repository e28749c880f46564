// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle state machine
//!
//! User calls (`stop_streaming`, `resume_streaming`, `close`) and driver
//! callbacks (open/close completion) move the camera between
//! [`CameraState`]s. Every transition that touches the device holds the
//! per-instance control lock; blocking driver work runs on a spawned thread
//! that takes the lock again, so callers never wait on hardware.

use super::pipeline::ProcessingPipeline;
use super::state::{CameraState, StateCell};
use crate::backends::camera::types::{DeviceError, StreamConfig};
use crate::backends::camera::{CameraDevice, FramePipeline};
use crate::errors::{PortalError, PortalResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What the device is actually doing, as opposed to what was requested
struct DeviceControl {
    streaming: bool,
}

pub(crate) struct Lifecycle {
    state: Arc<StateCell>,
    control: Mutex<DeviceControl>,
    /// Written only while `control` is held; read lock-free via snapshots
    device: RwLock<Option<Arc<dyn CameraDevice>>>,
    stream: StreamConfig,
    pipeline: Arc<ProcessingPipeline>,
}

impl Lifecycle {
    pub fn new(
        device: Arc<dyn CameraDevice>,
        stream: StreamConfig,
        pipeline: Arc<ProcessingPipeline>,
    ) -> Self {
        Self {
            state: Arc::new(StateCell::new(CameraState::Closed)),
            control: Mutex::new(DeviceControl { streaming: false }),
            device: RwLock::new(Some(device)),
            stream,
            pipeline,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }

    /// Snapshot of the device handle; `None` once closed
    pub fn device(&self) -> Option<Arc<dyn CameraDevice>> {
        self.device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_control(&self) -> MutexGuard<'_, DeviceControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// CLOSED → OPENING, then wait for the driver's callback
    pub fn open(self: &Arc<Self>) -> PortalResult<()> {
        let device = self
            .device()
            .ok_or_else(|| PortalError::illegal_state("no camera device to open"))?;

        self.state.set(CameraState::Opening);
        info!(stream = %self.stream, "Opening camera device");

        let lifecycle = Arc::downgrade(self);
        device.open_async(Box::new(move |result| {
            if let Some(lifecycle) = lifecycle.upgrade() {
                lifecycle.on_open_complete(result);
            }
        }));
        Ok(())
    }

    fn on_open_complete(&self, result: Result<(), DeviceError>) {
        let mut control = self.lock_control();

        if let Err(e) = result {
            if self.state.compare_and_set(CameraState::Opening, CameraState::Error) {
                error!(code = e.code, error = %e, "Camera opening failed");
            } else {
                warn!(state = %self.state(), error = %e, "Camera open failed after close was requested");
            }
            return;
        }

        if !self.state.compare_and_set(CameraState::Opening, CameraState::DeviceReady) {
            info!(state = %self.state(), "Camera opened after close was requested; not streaming");
            return;
        }
        let Some(device) = self.device() else {
            return;
        };

        self.state.set(CameraState::StartingStream);
        device.start_streaming(&self.stream);
        control.streaming = true;
        device.set_pipeline(self.pipeline.clone() as Arc<dyn FramePipeline>);
        self.state.set(CameraState::Streaming);
        info!(stream = %self.stream, "Camera streaming");
    }

    pub fn stop_streaming(self: &Arc<Self>) -> PortalResult<()> {
        let _control = self.lock_control();

        match self.state.get() {
            previous @ (CameraState::Streaming | CameraState::StartingStream) => {
                info!("Stopping camera stream");
                self.state.set(CameraState::StoppingStream);
                self.spawn_stream_transition("portal-stop-stream")
                    .inspect_err(|_| self.state.set(previous))
            }
            CameraState::StoppingStream | CameraState::DeviceReady | CameraState::Closing => Ok(()),
            state => Err(PortalError::IllegalTransition {
                operation: "stop_streaming",
                state,
            }),
        }
    }

    pub fn resume_streaming(self: &Arc<Self>) -> PortalResult<()> {
        let _control = self.lock_control();

        match self.state.get() {
            previous @ (CameraState::DeviceReady | CameraState::StoppingStream) => {
                info!("Resuming camera stream");
                self.state.set(CameraState::StartingStream);
                self.spawn_stream_transition("portal-resume-stream")
                    .inspect_err(|_| self.state.set(previous))
            }
            // OPENING streams on its own once the device is ready
            CameraState::Streaming | CameraState::StartingStream | CameraState::Opening => Ok(()),
            state => Err(PortalError::IllegalTransition {
                operation: "resume_streaming",
                state,
            }),
        }
    }

    fn spawn_stream_transition(self: &Arc<Self>, name: &str) -> PortalResult<()> {
        let lifecycle = Arc::clone(self);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || lifecycle.settle_stream())
            .map(|_| ())
            .map_err(|e| {
                error!(thread = name, error = %e, "Failed to spawn stream transition");
                PortalError::illegal_state(format!("failed to spawn {}: {}", name, e))
            })
    }

    /// Drive the device toward whatever stream state is requested *now*
    ///
    /// Stop and resume may both be pending with their threads racing for the
    /// lock; acting on the current request rather than the one that spawned
    /// this thread makes every interleaving end in the last requested state.
    fn settle_stream(&self) {
        let mut control = self.lock_control();
        let Some(device) = self.device() else {
            debug!(state = %self.state(), "Device closed before stream transition ran");
            return;
        };

        match self.state.get() {
            CameraState::StoppingStream => {
                if control.streaming {
                    device.stop_streaming();
                    control.streaming = false;
                }
                self.state.set(CameraState::DeviceReady);
            }
            CameraState::StartingStream => {
                if !control.streaming {
                    device.start_streaming(&self.stream);
                    control.streaming = true;
                }
                self.state.set(CameraState::Streaming);
            }
            state => debug!(state = %state, "Stream transition already settled"),
        }
    }

    /// Any state → CLOSING, then CLOSED once the driver confirms
    pub fn close(&self) {
        let mut control = self.lock_control();
        let device = self
            .device
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(device) = device else {
            match self.state.get() {
                CameraState::Closing | CameraState::Closed => debug!("Camera already closed"),
                _ => self.state.set(CameraState::Closed),
            }
            return;
        };

        info!(state = %self.state(), "Closing camera device");
        self.state.set(CameraState::Closing);
        control.streaming = false;

        let state = Arc::clone(&self.state);
        device.close_async(Box::new(move || {
            if state.compare_and_set(CameraState::Closing, CameraState::Closed) {
                info!("Camera device closed");
            }
        }));
    }
}
