//! Progress reporting and cooperative cancellation.
//!
//! Long-running stages call [`ProgressReporter::tick`] as they work. The
//! callback only sees `(stage, percent)` and is invoked when the integer
//! percentage changes; nothing flows back into the pipeline except the
//! cancellation flag.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ToolpathError, ToolpathResult};

/// Pipeline stages that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Offset,
    Sampling,
    Sorting,
    Optimizing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offset => write!(f, "offset"),
            Self::Sampling => write!(f, "sampling"),
            Self::Sorting => write!(f, "sorting"),
            Self::Optimizing => write!(f, "optimizing"),
        }
    }
}

/// A progress callback receiving (stage, percent) values.
pub type ProgressCallback = Box<dyn Fn(Stage, u8) + Send + Sync>;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress sink handed to every long-running stage.
#[derive(Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    cancel: CancelToken,
    last: Cell<Option<(Stage, u8)>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ProgressReporter {
    /// Reporter without a callback that is never cancelled.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Checks for cancellation without reporting.
    pub fn check(&self) -> ToolpathResult<()> {
        if self.cancel.is_cancelled() {
            Err(ToolpathError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Reports `done` of `total` work units for `stage`.
    pub fn tick(&self, stage: Stage, done: usize, total: usize) -> ToolpathResult<()> {
        self.check()?;
        let percent = if total == 0 {
            100
        } else {
            ((done.min(total) * 100) / total) as u8
        };
        if self.last.get() != Some((stage, percent)) {
            self.last.set(Some((stage, percent)));
            if let Some(callback) = &self.callback {
                callback(stage, percent);
            }
        }
        Ok(())
    }
}
