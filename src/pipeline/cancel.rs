use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{Result, VisionError};

/// Cooperative cancellation flag shared between the host and a pipeline run.
///
/// The fetch stage checks it before every resource and after every chunk, so
/// an abandoned navigation stops in-flight downloads at the next boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns [`VisionError::Cancelled`] once the token has been triggered.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VisionError::Cancelled)
        } else {
            Ok(())
        }
    }
}
