// SPDX-License-Identifier: GPL-3.0-only

//! Built-in processors

pub mod qr_detector;

pub use qr_detector::QrProcessor;
