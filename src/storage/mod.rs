pub mod key_path;
pub mod memory;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Instant;

/// Which store revision a read observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Consistency {
    #[default]
    Latest,
    AtRevision(u64),
}

/// One stored pair as returned by a range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub create_revision: u64,
    pub mod_revision: u64,
}

/// A single bounded read over `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct RangeRequest<'a> {
    pub start: &'a [u8],
    pub end: &'a [u8],
    /// Exclusive lower bound replacing `start` when resuming a scan.
    pub continuation: Option<&'a [u8]>,
    pub page_limit: usize,
    pub consistency: Consistency,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePage {
    /// Pairs in ascending key order.
    pub pairs: Vec<KeyValue>,
    /// Last returned key when more pairs remain in the range.
    pub continuation: Option<Vec<u8>>,
    /// Store revision the page was read at.
    pub revision: u64,
}

/// Range-read contract of the backing store.
///
/// Implementations return keys in ascending byte order, honor the
/// continuation key as an exclusive start bound, and read linearizably at
/// the requested revision. Connection retries and backoff happen inside the
/// implementation; an error returned here is terminal for the read.
pub trait RangeReader: Send + Sync {
    fn range_read(
        &self,
        request: RangeRequest<'_>,
    ) -> impl Future<Output = Result<RangePage, StoreError>> + Send;
}

impl<T: RangeReader> RangeReader for std::sync::Arc<T> {
    fn range_read(
        &self,
        request: RangeRequest<'_>,
    ) -> impl Future<Output = Result<RangePage, StoreError>> + Send {
        (**self).range_read(request)
    }
}
