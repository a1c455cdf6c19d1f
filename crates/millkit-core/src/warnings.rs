//! Per-operation warnings log.
//!
//! Recoverable conditions (grid resolution reduced, missing custom cutter
//! source, sorter fallback) are collected here instead of failing the
//! operation. Every entry is also emitted through `tracing`.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Non-fatal diagnostics accumulated while computing one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warnings {
    entries: Vec<String>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.entries.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: Warnings) {
        self.entries.extend(other.entries);
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}
