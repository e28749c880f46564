// SPDX-License-Identifier: GPL-3.0-only

//! Attached processors and their enabled flags

use crate::errors::{PortalError, PortalResult};
use crate::processor::VisionProcessor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Ordered processors plus one enabled flag per processor
///
/// The list is fixed at construction. Flags are written from the caller's
/// thread and read from the capture thread, hence atomics.
pub(crate) struct ProcessorRegistry {
    processors: Vec<Arc<dyn VisionProcessor>>,
    enabled: Vec<AtomicBool>,
}

impl ProcessorRegistry {
    /// Register processors, all enabled
    pub fn new(processors: Vec<Arc<dyn VisionProcessor>>) -> Self {
        let enabled = processors.iter().map(|_| AtomicBool::new(true)).collect();
        Self { processors, enabled }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn processors(&self) -> &[Arc<dyn VisionProcessor>] {
        &self.processors
    }

    fn is_same(registered: &Arc<dyn VisionProcessor>, processor: &dyn VisionProcessor) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(registered), processor as *const dyn VisionProcessor)
    }

    /// Set the flag of every registration of `processor`
    ///
    /// Returns the number of enabled processors afterwards.
    pub fn set_enabled(&self, processor: &dyn VisionProcessor, enabled: bool) -> PortalResult<usize> {
        let mut found = false;
        let mut enabled_count = 0;

        for (registered, flag) in self.processors.iter().zip(&self.enabled) {
            if Self::is_same(registered, processor) {
                flag.store(enabled, Ordering::SeqCst);
                found = true;
            }
            if flag.load(Ordering::SeqCst) {
                enabled_count += 1;
            }
        }

        if !found {
            return Err(PortalError::invalid_argument(
                "Processor not attached to this portal",
            ));
        }

        debug!(enabled, enabled_count, "Processor toggled");
        Ok(enabled_count)
    }

    pub fn is_enabled(&self, processor: &dyn VisionProcessor) -> PortalResult<bool> {
        self.processors
            .iter()
            .position(|registered| Self::is_same(registered, processor))
            .map(|index| self.is_enabled_at(index))
            .ok_or_else(|| PortalError::invalid_argument("Processor not attached to this portal"))
    }

    pub fn is_enabled_at(&self, index: usize) -> bool {
        self.enabled[index].load(Ordering::SeqCst)
    }
}
