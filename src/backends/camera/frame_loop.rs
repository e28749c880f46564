// SPDX-License-Identifier: GPL-3.0-only
//! Capture thread lifecycle for drivers
//!
//! Drivers deliver frames from a dedicated thread they own. This module
//! gives them a named thread with a stop signal that `stop()` waits on, so
//! a blocking `stop_streaming` can guarantee no frame is in flight once it
//! returns.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::spawn(
///     "virtual-capture",
///     || Ok(FrameSource::new()),
///     |source| {
///         deliver(source.next_frame());
///         LoopAction::Continue
///     },
/// )?;
///
/// // Later, stop the loop and wait for the thread
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Spawn a named capture thread
    ///
    /// `init_fn` runs once on the new thread to build the loop state; if it
    /// fails the thread exits without iterating. `loop_fn` then runs until
    /// it returns [`LoopAction::Stop`] or the controller is stopped.
    pub fn spawn<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> io::Result<Self>
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                    return;
                }
            };

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }

            info!(name = %thread_name, "Capture loop thread exiting");
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopping from inside the loop; the flag is enough.
            return;
        }
        if let Err(e) = handle.join() {
            warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
        } else {
            debug!(name = %self.name, "Capture loop thread finished");
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
