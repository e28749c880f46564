// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera drivers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Portal Layer                  │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Camera traits   │  │ Virtual Camera  │  │
//! │  │ (device/factory) │◄─┤   (software)    │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Driver traits, stream types and the capture loop helper
//! - [`virtual_camera`]: Software camera that synthesizes frames

pub mod camera;
pub mod virtual_camera;
