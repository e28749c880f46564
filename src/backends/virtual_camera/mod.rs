// SPDX-License-Identifier: GPL-3.0-only

//! Software camera driver
//!
//! Implements [`CameraDevice`] without hardware so the portal can be run and
//! tested anywhere. Open and close complete on background threads after a
//! configurable latency; streaming runs a capture loop that generates frames
//! at a fixed rate.
//!
//! # Architecture
//!
//! ```text
//! FrameSource (pattern / still image)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ Capture loop     │  ← CaptureLoopController thread, paced to framerate
//! └──────────────────┘
//!        │ on_init / on_frame
//!        ▼
//! ┌──────────────────┐
//! │ FramePipeline    │  ← Installed by the portal
//! └──────────────────┘
//!        │ on_draw (live view on and not paused)
//!        ▼
//! ┌──────────────────┐
//! │ ImageCanvas      │  ← Latest preview kept for snapshots
//! └──────────────────┘
//! ```

mod source;

pub use source::{FrameSource, load_image_as_frame, test_pattern};

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::{DeviceError, StreamConfig, WebcamName};
use crate::backends::camera::{
    CameraDevice, CameraFactory, CloseCallback, FramePipeline, OpenCallback,
};
use crate::constants::virtual_camera as defaults;
use crate::processor::{ImageCanvas, ViewportDims};
use image::RgbaImage;
use source::SourceFrames;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Behavior knobs for virtual devices
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCameraSettings {
    pub open_latency: Duration,
    pub close_latency: Duration,
    pub framerate: u32,
    /// Report a driver error instead of opening
    pub fail_open: bool,
    pub source: FrameSource,
}

impl Default for VirtualCameraSettings {
    fn default() -> Self {
        Self {
            open_latency: defaults::DEFAULT_OPEN_LATENCY,
            close_latency: defaults::DEFAULT_CLOSE_LATENCY,
            framerate: defaults::DEFAULT_FRAMERATE,
            fail_open: false,
            source: FrameSource::default(),
        }
    }
}

/// Hands out [`VirtualCamera`]s for any webcam name
#[derive(Default)]
pub struct VirtualCameraFactory {
    settings: VirtualCameraSettings,
    last_created: Mutex<Option<Arc<VirtualCamera>>>,
}

impl VirtualCameraFactory {
    pub fn new(settings: VirtualCameraSettings) -> Self {
        Self {
            settings,
            last_created: Mutex::new(None),
        }
    }

    /// The most recently created device, for inspection
    pub fn last_created(&self) -> Option<Arc<VirtualCamera>> {
        self.last_created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CameraFactory for VirtualCameraFactory {
    fn create_webcam(&self, name: &WebcamName, live_view: bool) -> Option<Arc<dyn CameraDevice>> {
        let camera = Arc::new(VirtualCamera::new(name.clone(), self.settings.clone(), live_view));
        *self.last_created.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&camera));
        Some(camera)
    }
}

/// Rolling frames-per-second measurement
struct FpsCounter {
    window_start: Instant,
    frames_in_window: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
        }
    }

    /// Count a frame; returns the new rate when a window closes
    fn tick(&mut self) -> Option<f32> {
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed < defaults::FPS_WINDOW {
            return None;
        }
        let fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
        self.window_start = Instant::now();
        self.frames_in_window = 0;
        Some(fps)
    }
}

/// State shared between the device handle and its capture thread
struct Shared {
    pipeline: Mutex<Option<Arc<dyn FramePipeline>>>,
    viewport_paused: AtomicBool,
    fps_bits: AtomicU32,
    frames_delivered: AtomicU64,
    preview: Mutex<Option<RgbaImage>>,
    /// Capture timestamps count from here for the device's whole life
    epoch: Instant,
    /// Set once the pipeline has seen its first frame
    initialized: AtomicBool,
}

impl Shared {
    fn pipeline(&self) -> Option<Arc<dyn FramePipeline>> {
        self.pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_fps(&self, fps: f32) {
        self.fps_bits.store(fps.to_bits(), Ordering::Relaxed);
    }
}

/// Per-session capture loop state
struct CaptureSession {
    frames: SourceFrames,
    frame_interval: Duration,
    next_deadline: Instant,
    fps: FpsCounter,
}

/// Deadline of the frame after one due at `deadline`
///
/// A frame that ran late re-anchors the schedule at `now`, so a stall is
/// followed by normal pacing rather than a burst of catch-up frames.
fn next_deadline(deadline: Instant, now: Instant, interval: Duration) -> Instant {
    deadline.max(now) + interval
}

/// A camera that synthesizes its frames
pub struct VirtualCamera {
    name: WebcamName,
    settings: VirtualCameraSettings,
    live_view: bool,
    shared: Arc<Shared>,
    capture: Mutex<Option<CaptureLoopController>>,
    open: Arc<AtomicBool>,
}

impl VirtualCamera {
    pub fn new(name: WebcamName, settings: VirtualCameraSettings, live_view: bool) -> Self {
        Self {
            name,
            settings,
            live_view,
            shared: Arc::new(Shared {
                pipeline: Mutex::new(None),
                viewport_paused: AtomicBool::new(false),
                fps_bits: AtomicU32::new(0.0f32.to_bits()),
                frames_delivered: AtomicU64::new(0),
                preview: Mutex::new(None),
                epoch: Instant::now(),
                initialized: AtomicBool::new(false),
            }),
            capture: Mutex::new(None),
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &WebcamName {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_streaming(&self) -> bool {
        self.lock_capture()
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    pub fn is_viewport_paused(&self) -> bool {
        self.shared.viewport_paused.load(Ordering::SeqCst)
    }

    /// Frames handed to the pipeline since creation
    pub fn frames_delivered(&self) -> u64 {
        self.shared.frames_delivered.load(Ordering::SeqCst)
    }

    /// Last rendered live view, overlays included
    pub fn preview_snapshot(&self) -> Option<RgbaImage> {
        self.shared
            .preview
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_capture(&self) -> MutexGuard<'_, Option<CaptureLoopController>> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_capture(&self) {
        let controller = self.lock_capture().take();
        if let Some(mut controller) = controller {
            controller.stop();
        }
        self.shared.set_fps(0.0);
    }

    fn capture_step(shared: &Shared, live_view: bool, session: &mut CaptureSession) -> LoopAction {
        let now = Instant::now();
        if session.next_deadline > now {
            thread::sleep(session.next_deadline - now);
        }
        session.next_deadline = next_deadline(session.next_deadline, now, session.frame_interval);

        let Some(pipeline) = shared.pipeline() else {
            // Streaming has started but the portal has not attached yet
            return LoopAction::Continue;
        };

        let frame = session.frames.next_frame();
        if !shared.initialized.swap(true, Ordering::SeqCst) {
            pipeline.on_init(&frame);
        }

        let capture_time_nanos = shared.epoch.elapsed().as_nanos() as u64;
        let processed = pipeline.on_frame(frame, capture_time_nanos);
        shared.frames_delivered.fetch_add(1, Ordering::SeqCst);

        if live_view && !shared.viewport_paused.load(Ordering::SeqCst) {
            let mut canvas = ImageCanvas::from_frame(&processed.frame);
            let viewport = ViewportDims::unscaled(processed.frame.width, processed.frame.height);
            pipeline.on_draw(&mut canvas, &viewport, processed.contexts);
            *shared.preview.lock().unwrap_or_else(PoisonError::into_inner) = Some(canvas.into_image());
        }

        if let Some(fps) = session.fps.tick() {
            shared.set_fps(fps);
        }
        LoopAction::Continue
    }
}

impl CameraDevice for VirtualCamera {
    fn open_async(&self, on_complete: OpenCallback) {
        let latency = self.settings.open_latency;
        let fail = self.settings.fail_open;
        let name = self.name.clone();
        let open = Arc::clone(&self.open);

        let spawned = thread::Builder::new()
            .name("virtual-camera-open".to_string())
            .spawn(move || {
                thread::sleep(latency);
                if fail {
                    warn!(camera = %name, "Simulating open failure");
                    on_complete(Err(DeviceError::new(
                        defaults::OPEN_FAILURE_CODE,
                        format!("failed to open {}", name),
                    )));
                } else {
                    open.store(true, Ordering::SeqCst);
                    debug!(camera = %name, "Virtual camera opened");
                    on_complete(Ok(()));
                }
            });

        if let Err(e) = spawned {
            error!(camera = %self.name, error = %e, "Failed to spawn open thread");
        }
    }

    fn start_streaming(&self, config: &StreamConfig) {
        self.stop_capture();

        let size = config.rotation.apply(config.size);
        let source = self.settings.source.clone();
        let framerate = self.settings.framerate.max(1);
        let shared = Arc::clone(&self.shared);
        let live_view = self.live_view;

        info!(camera = %self.name, size = %size, format = %config.format, framerate, "Starting virtual stream");

        let controller = CaptureLoopController::spawn(
            "virtual-capture",
            move || {
                let frames = SourceFrames::open(&source, size).map_err(|e| e.to_string())?;
                let now = Instant::now();
                Ok(CaptureSession {
                    frames,
                    frame_interval: Duration::from_secs(1) / framerate,
                    next_deadline: now,
                    fps: FpsCounter::new(),
                })
            },
            move |session| Self::capture_step(&shared, live_view, session),
        );

        match controller {
            Ok(controller) => *self.lock_capture() = Some(controller),
            Err(e) => error!(camera = %self.name, error = %e, "Failed to start capture loop"),
        }
    }

    fn stop_streaming(&self) {
        debug!(camera = %self.name, "Stopping virtual stream");
        self.stop_capture();
    }

    fn close_async(&self, on_closed: CloseCallback) {
        self.stop_capture();
        self.shared
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.open.store(false, Ordering::SeqCst);

        let latency = self.settings.close_latency;
        let name = self.name.clone();
        let spawned = thread::Builder::new()
            .name("virtual-camera-close".to_string())
            .spawn(move || {
                thread::sleep(latency);
                debug!(camera = %name, "Virtual camera closed");
                on_closed();
            });
        if let Err(e) = spawned {
            error!(error = %e, "Failed to spawn close thread");
        }
    }

    fn set_pipeline(&self, pipeline: Arc<dyn FramePipeline>) {
        *self.shared.pipeline.lock().unwrap_or_else(PoisonError::into_inner) = Some(pipeline);
    }

    fn pause_viewport(&self) {
        if !self.shared.viewport_paused.swap(true, Ordering::SeqCst) {
            debug!(camera = %self.name, "Live view paused");
        }
    }

    fn resume_viewport(&self) {
        if self.shared.viewport_paused.swap(false, Ordering::SeqCst) {
            debug!(camera = %self.name, "Live view resumed");
        }
    }

    fn fps(&self) -> f32 {
        f32::from_bits(self.shared.fps_bits.load(Ordering::Relaxed))
    }
}

impl Drop for VirtualCamera {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{SensorRotation, Size, StreamFormat};
    use crate::backends::camera::types::CameraFrame;
    use crate::processor::{Canvas, DrawContextBundle, ProcessedFrame};
    use std::sync::mpsc;

    /// Pipeline that counts init calls and records capture timestamps
    #[derive(Default)]
    struct CountingPipeline {
        inits: AtomicU32,
        stamps: Mutex<Vec<u64>>,
    }

    impl CountingPipeline {
        fn frames(&self) -> usize {
            self.stamps.lock().unwrap().len()
        }
    }

    impl FramePipeline for CountingPipeline {
        fn on_init(&self, _first_frame: &CameraFrame) {
            self.inits.fetch_add(1, Ordering::SeqCst);
        }

        fn on_frame(&self, frame: CameraFrame, capture_time_nanos: u64) -> ProcessedFrame {
            self.stamps.lock().unwrap().push(capture_time_nanos);
            ProcessedFrame {
                frame,
                contexts: DrawContextBundle::with_len(0),
            }
        }

        fn on_draw(&self, _canvas: &mut dyn Canvas, _viewport: &ViewportDims, _contexts: DrawContextBundle) {}
    }

    fn small_stream() -> StreamConfig {
        StreamConfig {
            size: Size::new(8, 8),
            rotation: SensorRotation::None,
            format: StreamFormat::Yuy2,
        }
    }

    fn wait_for_frames(pipeline: &CountingPipeline, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pipeline.frames() < count {
            assert!(Instant::now() < deadline, "timed out waiting for {} frames", count);
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn fast_settings() -> VirtualCameraSettings {
        VirtualCameraSettings {
            open_latency: Duration::from_millis(5),
            close_latency: Duration::from_millis(5),
            framerate: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_reports_success() {
        let camera = VirtualCamera::new(WebcamName::new("cam"), fast_settings(), true);
        let (tx, rx) = mpsc::channel();
        camera.open_async(Box::new(move |result| tx.send(result).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Ok(()));
        assert!(camera.is_open());
    }

    #[test]
    fn test_open_failure_carries_code() {
        let settings = VirtualCameraSettings {
            fail_open: true,
            ..fast_settings()
        };
        let camera = VirtualCamera::new(WebcamName::new("cam"), settings, true);
        let (tx, rx) = mpsc::channel();
        camera.open_async(Box::new(move |result| tx.send(result).unwrap()));
        let err = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap_err();
        assert_eq!(err.code, defaults::OPEN_FAILURE_CODE);
        assert!(!camera.is_open());
    }

    #[test]
    fn test_stop_streaming_halts_capture() {
        let camera = VirtualCamera::new(WebcamName::new("cam"), fast_settings(), false);
        camera.start_streaming(&StreamConfig {
            size: Size::new(8, 8),
            rotation: SensorRotation::None,
            format: StreamFormat::Yuy2,
        });
        assert!(camera.is_streaming());
        camera.stop_streaming();
        assert!(!camera.is_streaming());
        assert_eq!(camera.fps(), 0.0);
    }

    #[test]
    fn test_close_invokes_callback() {
        let camera = VirtualCamera::new(WebcamName::new("cam"), fast_settings(), false);
        let (tx, rx) = mpsc::channel();
        camera.close_async(Box::new(move || tx.send(()).unwrap()));
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_restarted_stream_keeps_device_clock_and_init() {
        let camera = VirtualCamera::new(WebcamName::new("cam"), fast_settings(), false);
        let pipeline = Arc::new(CountingPipeline::default());
        camera.set_pipeline(pipeline.clone());

        camera.start_streaming(&small_stream());
        wait_for_frames(&pipeline, 3);
        camera.stop_streaming();
        let first_session = pipeline.frames();

        camera.start_streaming(&small_stream());
        wait_for_frames(&pipeline, first_session + 3);
        camera.stop_streaming();

        let stamps = pipeline.stamps.lock().unwrap().clone();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", stamps);
        assert_eq!(pipeline.inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_frame_reanchors_schedule() {
        let interval = Duration::from_millis(10);
        let start = Instant::now();

        // On time: the schedule advances by exactly one interval
        assert_eq!(next_deadline(start + interval, start, interval), start + interval * 2);

        // Stalled well past the deadline: pacing resumes from now
        let now = start + interval * 5;
        let next = next_deadline(start, now, interval);
        assert_eq!(next, now + interval);
        assert!(next > now);
    }

    #[test]
    fn test_factory_remembers_last_device() {
        let factory = VirtualCameraFactory::new(fast_settings());
        assert!(factory.last_created().is_none());
        factory.create_webcam(&WebcamName::new("a"), true).unwrap();
        assert_eq!(factory.last_created().unwrap().name(), &WebcamName::new("a"));
    }
}
