// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle states and the cell that holds the current one

use std::fmt;
use tokio::sync::watch;
use tracing::debug;

/// Where a portal's camera is in its lifecycle
///
/// ```text
/// CLOSED → OPENING → DEVICE_READY → STARTING_STREAM → STREAMING
///             │            ▲                              │
///             ▼            └──────── STOPPING_STREAM ◄────┘
///           ERROR
///
/// OPENING / DEVICE_READY / STREAMING / STOPPING_STREAM → CLOSING → CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraState {
    #[default]
    Closed,
    Opening,
    DeviceReady,
    StartingStream,
    Streaming,
    StoppingStream,
    Closing,
    /// The device failed to open; only `close` leaves this state
    Error,
}

impl CameraState {
    pub const ALL: [CameraState; 8] = [
        CameraState::Closed,
        CameraState::Opening,
        CameraState::DeviceReady,
        CameraState::StartingStream,
        CameraState::Streaming,
        CameraState::StoppingStream,
        CameraState::Closing,
        CameraState::Error,
    ];
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraState::Closed => "CLOSED",
            CameraState::Opening => "OPENING",
            CameraState::DeviceReady => "DEVICE_READY",
            CameraState::StartingStream => "STARTING_STREAM",
            CameraState::Streaming => "STREAMING",
            CameraState::StoppingStream => "STOPPING_STREAM",
            CameraState::Closing => "CLOSING",
            CameraState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Single current state, readable from any thread
///
/// Backed by a watch channel so reads always see the latest committed value
/// and waiters can be woken on every commit.
pub(crate) struct StateCell {
    tx: watch::Sender<CameraState>,
}

impl StateCell {
    pub fn new(initial: CameraState) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    pub fn get(&self) -> CameraState {
        *self.tx.borrow()
    }

    pub fn set(&self, state: CameraState) {
        let previous = self.tx.send_replace(state);
        debug!(from = %previous, to = %state, "Camera state committed");
    }

    /// Commit `to` only if the current state is `expected`
    pub fn compare_and_set(&self, expected: CameraState, to: CameraState) -> bool {
        let swapped = self.tx.send_if_modified(|current| {
            if *current == expected {
                *current = to;
                true
            } else {
                false
            }
        });
        if swapped {
            debug!(from = %expected, to = %to, "Camera state committed");
        }
        swapped
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_and_set_only_from_expected() {
        let cell = StateCell::new(CameraState::Opening);
        assert!(!cell.compare_and_set(CameraState::Streaming, CameraState::DeviceReady));
        assert_eq!(cell.get(), CameraState::Opening);
        assert!(cell.compare_and_set(CameraState::Opening, CameraState::DeviceReady));
        assert_eq!(cell.get(), CameraState::DeviceReady);
    }

    #[test]
    fn test_subscriber_sees_commit() {
        let cell = StateCell::new(CameraState::Closed);
        let rx = cell.subscribe();
        cell.set(CameraState::Opening);
        assert_eq!(*rx.borrow(), CameraState::Opening);
    }

    #[test]
    fn test_display_names_are_distinct() {
        let mut names: Vec<String> = CameraState::ALL.iter().map(|s| s.to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), CameraState::ALL.len());
    }
}
