pub mod executor;
pub mod mapper;
pub mod planner;

use crate::storage::Consistency;
use crate::storage::key_path::KeyPath;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-owned flag that aborts an in-flight query at the next page boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub consistency: Consistency,
    pub cancel: Option<CancelSignal>,
}

impl QueryOptions {
    pub fn at_revision(revision: u64) -> Self {
        Self {
            consistency: Consistency::AtRevision(revision),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// One decoded item visible under the query scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedItem<T> {
    pub path: KeyPath,
    pub resource: T,
    pub create_revision: u64,
    pub mod_revision: u64,
}

/// Decoded items in ascending key order, read at one store revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<T> {
    pub items: Vec<ScopedItem<T>>,
    pub revision: u64,
    pub pages: u32,
}

impl<T> QueryResult<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_resources(self) -> Vec<T> {
        self.items.into_iter().map(|item| item.resource).collect()
    }
}
