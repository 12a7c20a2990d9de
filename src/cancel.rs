//! Cooperative cancellation for install runs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ModError, Result};

/// Shared cancellation flag
///
/// Clones observe the same flag. The installer checks it at every recursion
/// entry and once more before committing staged mods.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(ModError::Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ModError::Cancelled)
        } else {
            Ok(())
        }
    }
}
