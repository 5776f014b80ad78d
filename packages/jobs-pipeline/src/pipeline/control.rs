//! Run-loop control: command messages and the shared status cell.
//!
//! Pause/resume/stop are delivered to the run loop as messages on a
//! channel the loop drains at batch boundaries. The status cell is a
//! separate read-side snapshot the control methods update immediately, so
//! callers observe a requested transition before the boundary honors it.

use std::sync::{Arc, RwLock};

use crate::types::run::PipelineStatus;

/// Control messages honored at batch boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    Stop,
}

/// Shared lifecycle status, readable from any task.
#[derive(Clone)]
pub(crate) struct StatusCell {
    inner: Arc<RwLock<PipelineStatus>>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PipelineStatus::Idle)),
        }
    }

    pub(crate) fn get(&self) -> PipelineStatus {
        *self.inner.read().unwrap()
    }

    pub(crate) fn set(&self, status: PipelineStatus) {
        *self.inner.write().unwrap() = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cell_roundtrip() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), PipelineStatus::Idle);

        cell.set(PipelineStatus::Running);
        assert_eq!(cell.get(), PipelineStatus::Running);

        let clone = cell.clone();
        clone.set(PipelineStatus::Paused);
        assert_eq!(cell.get(), PipelineStatus::Paused); // shared cell
    }
}
