// SPDX-License-Identifier: GPL-3.0-only

use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use vision_portal::backends::virtual_camera::FrameSource;
use vision_portal::constants::DEFAULT_SETTLE_TIMEOUT;
use vision_portal::{
    CameraState, PortalConfig, QrProcessor, VirtualCameraFactory, VirtualCameraSettings,
    VisionPortal, WebcamName,
};

#[derive(Parser)]
#[command(name = "vision-portal-demo")]
#[command(about = "Stream a virtual camera through a QR detecting vision portal")]
#[command(version = env!("VISION_PORTAL_BUILD_VERSION"))]
struct Cli {
    /// Config file (default: the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to stream before shutting down
    #[arg(short, long, default_value = "5")]
    seconds: u64,

    /// Name of the raw frame capture (default: a timestamp)
    #[arg(long)]
    capture: Option<String>,

    /// Feed this image to the virtual camera instead of a test pattern
    #[arg(short, long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=vision_portal=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.or_else(PortalConfig::default_path) {
        Some(path) => PortalConfig::load_or_default(&path),
        None => PortalConfig::default(),
    };

    let settings = VirtualCameraSettings {
        source: cli.image.map(FrameSource::Image).unwrap_or_default(),
        ..Default::default()
    };
    let factory = Arc::new(VirtualCameraFactory::new(settings));
    let qr = Arc::new(QrProcessor::new());

    let portal = VisionPortal::builder(factory.clone())
        .camera(WebcamName::new("Virtual Webcam"))
        .config(config)
        .add_processor(qr.clone())
        .build()?;

    println!("Opening camera...");
    portal
        .wait_for_state(CameraState::Streaming, DEFAULT_SETTLE_TIMEOUT)
        .await?;
    println!("Streaming: {:?}", portal);

    let capture = cli
        .capture
        .unwrap_or_else(|| Local::now().format("%Y%m%d-%H%M%S").to_string());
    portal.save_next_frame_raw(&capture);
    println!("Raw frame requested: {}", capture);

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Streaming for {} seconds... (press Ctrl+C to stop early)", cli.seconds);
    let deadline = Instant::now() + Duration::from_secs(cli.seconds);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    while Instant::now() < deadline && !stop_flag.load(Ordering::SeqCst) {
        ticker.tick().await;
        println!("FPS: {:.1}", portal.fps());
        for detection in qr.detections() {
            println!("  QR: {}", detection.content);
        }
    }

    println!("Pausing stream...");
    portal.stop_streaming()?;
    portal
        .wait_for_state(CameraState::DeviceReady, DEFAULT_SETTLE_TIMEOUT)
        .await?;
    portal.resume_streaming()?;
    portal
        .wait_for_state(CameraState::Streaming, DEFAULT_SETTLE_TIMEOUT)
        .await?;
    println!("Stream resumed");

    if let Some(camera) = factory.last_created() {
        println!("Frames delivered: {}", camera.frames_delivered());
    }

    portal.close();
    portal
        .wait_for_state(CameraState::Closed, DEFAULT_SETTLE_TIMEOUT)
        .await?;
    println!("Camera closed");
    Ok(())
}
