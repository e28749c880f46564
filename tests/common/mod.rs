// SPDX-License-Identifier: GPL-3.0-only

//! Shared test doubles: a scriptable camera driver and a recording processor

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vision_portal::backends::camera::types::DeviceError;
use vision_portal::backends::camera::{
    CameraDevice, CameraFactory, CloseCallback, FramePipeline, OpenCallback, StreamConfig,
};
use vision_portal::processor::{Canvas, DrawContext, ImageCanvas, ProcessedFrame, ViewportDims};
use vision_portal::{
    CameraCalibration, CameraFrame, FrameSaver, PixelFormat, PortalResult, VisionProcessor,
    WebcamName,
};

/// Driver calls observed by [`MockCamera`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    StartStreaming(StreamConfig),
    StopStreaming,
    Close,
    SetPipeline,
    PauseViewport,
    ResumeViewport,
}

/// Camera whose asynchronous callbacks are fired by the test
#[derive(Default)]
pub struct MockCamera {
    calls: Mutex<Vec<Call>>,
    open_callback: Mutex<Option<OpenCallback>>,
    close_callback: Mutex<Option<CloseCallback>>,
    pipeline: Mutex<Option<Arc<dyn FramePipeline>>>,
    initialized: AtomicBool,
}

impl MockCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn count_starts(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::StartStreaming(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Fire the pending open callback
    pub fn complete_open(&self, result: Result<(), DeviceError>) {
        let callback = self.open_callback.lock().unwrap().take();
        callback.expect("open_async was not called")(result);
    }

    /// Fire the pending close callback
    pub fn complete_close(&self) {
        let callback = self.close_callback.lock().unwrap().take();
        callback.expect("close_async was not called")();
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.lock().unwrap().is_some()
    }

    /// Push one frame through the installed pipeline, like a capture thread
    pub fn deliver(&self, frame: CameraFrame, capture_time_nanos: u64) -> ProcessedFrame {
        let pipeline = self.pipeline.lock().unwrap().clone().expect("no pipeline installed");
        if !self.initialized.swap(true, Ordering::SeqCst) {
            pipeline.on_init(&frame);
        }
        pipeline.on_frame(frame, capture_time_nanos)
    }

    /// Deliver a frame and render its overlays
    pub fn deliver_and_draw(&self, frame: CameraFrame, capture_time_nanos: u64) -> ImageCanvas {
        let processed = self.deliver(frame, capture_time_nanos);
        let pipeline = self.pipeline.lock().unwrap().clone().expect("no pipeline installed");
        let mut canvas = ImageCanvas::from_frame(&processed.frame);
        let viewport = ViewportDims::unscaled(processed.frame.width, processed.frame.height);
        pipeline.on_draw(&mut canvas, &viewport, processed.contexts);
        canvas
    }
}

impl CameraDevice for MockCamera {
    fn open_async(&self, on_complete: OpenCallback) {
        self.record(Call::Open);
        *self.open_callback.lock().unwrap() = Some(on_complete);
    }

    fn start_streaming(&self, config: &StreamConfig) {
        self.record(Call::StartStreaming(*config));
    }

    fn stop_streaming(&self) {
        self.record(Call::StopStreaming);
    }

    fn close_async(&self, on_closed: CloseCallback) {
        self.record(Call::Close);
        *self.close_callback.lock().unwrap() = Some(on_closed);
    }

    fn set_pipeline(&self, pipeline: Arc<dyn FramePipeline>) {
        self.record(Call::SetPipeline);
        *self.pipeline.lock().unwrap() = Some(pipeline);
    }

    fn pause_viewport(&self) {
        self.record(Call::PauseViewport);
    }

    fn resume_viewport(&self) {
        self.record(Call::ResumeViewport);
    }

    fn fps(&self) -> f32 {
        30.0
    }
}

/// Factory handing out one prepared [`MockCamera`] (or nothing)
pub struct MockFactory {
    camera: Option<Arc<MockCamera>>,
    requests: Mutex<Vec<(WebcamName, bool)>>,
}

impl MockFactory {
    pub fn new(camera: Arc<MockCamera>) -> Arc<Self> {
        Arc::new(Self {
            camera: Some(camera),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            camera: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(WebcamName, bool)> {
        self.requests.lock().unwrap().clone()
    }
}

impl CameraFactory for MockFactory {
    fn create_webcam(&self, name: &WebcamName, live_view: bool) -> Option<Arc<dyn CameraDevice>> {
        self.requests.lock().unwrap().push((name.clone(), live_view));
        self.camera.clone().map(|camera| camera as Arc<dyn CameraDevice>)
    }
}

/// Processor that counts its calls and tags every frame with `tag`
#[derive(Default)]
pub struct RecordingProcessor {
    pub tag: u32,
    pub inits: Mutex<Vec<(u32, u32, Option<CameraCalibration>)>>,
    pub frames: AtomicUsize,
    pub draws: AtomicUsize,
}

impl RecordingProcessor {
    pub fn new(tag: u32) -> Arc<Self> {
        Arc::new(Self {
            tag,
            ..Default::default()
        })
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }
}

impl VisionProcessor for RecordingProcessor {
    fn init(&self, width: u32, height: u32, calibration: Option<&CameraCalibration>) {
        self.inits
            .lock()
            .unwrap()
            .push((width, height, calibration.cloned()));
    }

    fn process_frame(&self, _frame: &mut CameraFrame, _capture_time_nanos: u64) -> Option<DrawContext> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(self.tag))
    }

    fn on_draw_frame(&self, _canvas: &mut dyn Canvas, _viewport: &ViewportDims, context: Option<DrawContext>) {
        let tag = context.and_then(|c| c.downcast::<u32>().ok());
        assert_eq!(tag.as_deref(), Some(&self.tag), "draw context from another processor");
        self.draws.fetch_add(1, Ordering::SeqCst);
    }
}

/// Saver that remembers requested paths instead of writing files
#[derive(Default)]
pub struct RecordingSaver {
    pub saved: Mutex<Vec<(PathBuf, u32, u32)>>,
}

impl FrameSaver for RecordingSaver {
    fn save(&self, frame: &CameraFrame, path: &Path) -> PortalResult<PathBuf> {
        self.saved
            .lock()
            .unwrap()
            .push((path.to_path_buf(), frame.width, frame.height));
        Ok(path.to_path_buf())
    }
}

pub fn frame(width: u32, height: u32) -> CameraFrame {
    CameraFrame::new(width, height, PixelFormat::Rgba)
}
