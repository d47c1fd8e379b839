use crate::error::StoreError;
use crate::storage::{Consistency, KeyValue, RangePage, RangeReader, RangeRequest};
use im::OrdMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::ops::Bound;
use tokio::time::Instant;

const DEFAULT_MAX_PAGE_SIZE: usize = 1_000;
const DEFAULT_RETAINED_REVISIONS: usize = 1_024;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredEntry {
    value: Vec<u8>,
    create_revision: u64,
    mod_revision: u64,
}

#[derive(Debug, Clone)]
struct Version {
    revision: u64,
    entries: OrdMap<Vec<u8>, StoredEntry>,
}

#[derive(Debug)]
struct MemoryState {
    current: Version,
    /// Retained older revisions, contiguous and oldest first.
    history: VecDeque<Version>,
    max_versions: usize,
}

impl MemoryState {
    fn latest(&self) -> &Version {
        &self.current
    }

    fn oldest_revision(&self) -> u64 {
        self.history
            .front()
            .map_or(self.current.revision, |v| v.revision)
    }

    fn at(&self, consistency: Consistency) -> Result<&Version, StoreError> {
        let current = self.current.revision;
        let requested = match consistency {
            Consistency::Latest => return Ok(&self.current),
            Consistency::AtRevision(rev) => rev,
        };
        if requested > current {
            return Err(StoreError::FutureRevision { requested, current });
        }
        if requested == current {
            return Ok(&self.current);
        }
        let oldest_available = self.oldest_revision();
        let compacted = StoreError::Compacted {
            requested,
            oldest_available,
        };
        if requested < oldest_available {
            return Err(compacted);
        }
        self.history
            .get((requested - oldest_available) as usize)
            .ok_or(compacted)
    }

    fn publish(&mut self, entries: OrdMap<Vec<u8>, StoredEntry>) -> u64 {
        let revision = self.current.revision + 1;
        let previous = std::mem::replace(&mut self.current, Version { revision, entries });
        self.history.push_back(previous);
        while self.history.len() + 1 > self.max_versions {
            self.history.pop_front();
        }
        revision
    }
}

/// In-process sorted key-value store with revisioned snapshots.
///
/// Every write publishes a new revision; reads are served from an immutable
/// snapshot so a paginated scan pinned to one revision is unaffected by
/// concurrent writers. At most `max_page_size` pairs are returned per read
/// regardless of the requested page limit.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    max_page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_PAGE_SIZE, DEFAULT_RETAINED_REVISIONS)
    }

    pub fn with_limits(max_page_size: usize, max_retained_revisions: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                current: Version {
                    revision: 1,
                    entries: OrdMap::new(),
                },
                history: VecDeque::new(),
                max_versions: max_retained_revisions.max(1),
            }),
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn revision(&self) -> u64 {
        self.state.read().latest().revision
    }

    pub fn oldest_revision(&self) -> u64 {
        self.state.read().oldest_revision()
    }

    pub fn len(&self) -> usize {
        self.state.read().latest().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `value` under `key` and returns the new revision.
    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> u64 {
        let key = key.into();
        let mut state = self.state.write();
        let next_revision = state.latest().revision + 1;
        let mut entries = state.latest().entries.clone();
        let create_revision = entries
            .get(&key)
            .map_or(next_revision, |existing| existing.create_revision);
        entries.insert(
            key,
            StoredEntry {
                value: value.into(),
                create_revision,
                mod_revision: next_revision,
            },
        );
        state.publish(entries)
    }

    /// Removes `key`, returning the new revision if it existed.
    pub fn delete(&self, key: &[u8]) -> Option<u64> {
        let mut state = self.state.write();
        let mut entries = state.latest().entries.clone();
        entries.remove(key)?;
        Some(state.publish(entries))
    }

    /// Discards every retained revision older than `revision`.
    pub fn compact(&self, revision: u64) {
        let mut state = self.state.write();
        let current = state.latest().revision;
        let keep_from = revision.min(current);
        while state
            .history
            .front()
            .is_some_and(|v| v.revision < keep_from)
        {
            state.history.pop_front();
        }
    }

    fn read_page(&self, request: &RangeRequest<'_>) -> Result<RangePage, StoreError> {
        let state = self.state.read();
        let version = state.at(request.consistency)?;
        let limit = request.page_limit.clamp(1, self.max_page_size);
        let lower = match request.continuation {
            Some(after) => Bound::Excluded(after.to_vec()),
            None => Bound::Included(request.start.to_vec()),
        };
        let empty = match &lower {
            Bound::Included(start) => start.as_slice() >= request.end,
            Bound::Excluded(after) => after.as_slice() >= request.end,
            Bound::Unbounded => false,
        };
        let mut pairs = Vec::new();
        if !empty {
            for (k, v) in version
                .entries
                .range((lower, Bound::Excluded(request.end.to_vec())))
            {
                pairs.push(KeyValue {
                    key: k.clone(),
                    value: v.value.clone(),
                    create_revision: v.create_revision,
                    mod_revision: v.mod_revision,
                });
                if pairs.len() > limit {
                    break;
                }
            }
        }
        let truncated = pairs.len() > limit;
        if truncated {
            pairs.truncate(limit);
        }
        let continuation = if truncated {
            pairs.last().map(|kv| kv.key.clone())
        } else {
            None
        };
        Ok(RangePage {
            pairs,
            continuation,
            revision: version.revision,
        })
    }
}

impl RangeReader for MemoryStore {
    async fn range_read(&self, request: RangeRequest<'_>) -> Result<RangePage, StoreError> {
        if request.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StoreError::DeadlineExceeded);
        }
        self.read_page(&request)
    }
}
