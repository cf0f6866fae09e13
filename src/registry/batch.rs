//! Queued registry mutations committed in one write.

use chrono::{DateTime, Utc};

use crate::error::{ClassifiedError, Result};
use crate::taxonomy::ErrorCode;

use super::document::{Fields, RegistryDocument};

/// A mutation waiting for `commit_batch`.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Register { session_id: String, data: Fields },
    Unregister { session_id: String },
    Update { session_id: String, updates: Fields },
}

impl BatchOp {
    pub fn register(session_id: impl Into<String>, data: Fields) -> Self {
        BatchOp::Register {
            session_id: session_id.into(),
            data,
        }
    }

    pub fn unregister(session_id: impl Into<String>) -> Self {
        BatchOp::Unregister {
            session_id: session_id.into(),
        }
    }

    pub fn update(session_id: impl Into<String>, updates: Fields) -> Self {
        BatchOp::Update {
            session_id: session_id.into(),
            updates,
        }
    }

    /// Apply to `registry`. Returns whether the op changed anything.
    ///
    /// Register always applies; unregister and update only apply to
    /// sessions that exist.
    pub(crate) fn apply(&self, registry: &mut RegistryDocument, now: DateTime<Utc>) -> bool {
        match self {
            BatchOp::Register { session_id, data } => {
                registry.insert_session(session_id, data.clone(), now);
                true
            }
            BatchOp::Unregister { session_id } => registry.remove_session(session_id),
            BatchOp::Update {
                session_id,
                updates,
            } => registry.merge_session(session_id, updates, now),
        }
    }
}

/// Pending ops between `start_batch` and commit or cancel.
#[derive(Debug, Default)]
pub(crate) struct BatchQueue {
    active: bool,
    ops: Vec<BatchOp>,
}

impl BatchQueue {
    /// Enter batch mode, dropping anything already queued.
    pub(crate) fn start(&mut self) {
        self.active = true;
        self.ops.clear();
    }

    pub(crate) fn push(&mut self, op: BatchOp) -> Result<()> {
        if !self.active {
            return Err(not_batching("Not in batch mode. Call start_batch() first."));
        }
        self.ops.push(op);
        Ok(())
    }

    /// Leave batch mode and hand back the queued ops in submission order.
    pub(crate) fn take(&mut self) -> Result<Vec<BatchOp>> {
        if !self.active {
            return Err(not_batching("Not in batch mode").with_context("applied", 0));
        }
        self.active = false;
        Ok(std::mem::take(&mut self.ops))
    }

    pub(crate) fn cancel(&mut self) {
        self.active = false;
        self.ops.clear();
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn len(&self) -> usize {
        self.ops.len()
    }
}

fn not_batching(message: &str) -> ClassifiedError {
    ClassifiedError::new(ErrorCode::State, message)
}
