use crate::error::QueryError;
use crate::query::CancelSignal;
use crate::query::planner::RangePlan;
use crate::storage::{Consistency, KeyValue, RangeReader, RangeRequest};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub page_limit: usize,
    pub max_result_rows: usize,
    pub consistency: Consistency,
    pub read_deadline: Option<Duration>,
}

/// Raw pairs of one logical scan, in store key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScan {
    pub pairs: Vec<KeyValue>,
    pub revision: u64,
    pub pages: u32,
}

/// Reads every pair inside `plan`, following continuation keys page by page.
///
/// The first page fixes the revision; later pages are read at that revision
/// so the whole scan observes a single snapshot. The cancel signal is checked
/// before every page. Pairs fetched before a failure are dropped.
pub async fn execute<S: RangeReader>(
    store: &S,
    plan: &RangePlan,
    options: &ScanOptions,
    cancel: Option<&CancelSignal>,
) -> Result<RawScan, QueryError> {
    let mut continuation: Option<Vec<u8>> = None;
    let mut accumulated: Vec<KeyValue> = Vec::new();
    let mut consistency = options.consistency;
    let mut pinned: Option<u64> = None;
    let mut pages: u32 = 0;

    loop {
        if cancel.is_some_and(CancelSignal::is_cancelled) {
            warn!(pages, fetched = accumulated.len(), "scoped scan cancelled");
            return Err(QueryError::Cancelled);
        }

        let request = RangeRequest {
            start: &plan.start,
            end: &plan.end,
            continuation: continuation.as_deref(),
            page_limit: options.page_limit,
            consistency,
            deadline: options.read_deadline.map(|d| Instant::now() + d),
        };
        let page = store.range_read(request).await.map_err(|e| {
            warn!(pages, error = %e, "range read failed");
            QueryError::from(e)
        })?;
        pages += 1;

        match pinned {
            None => {
                pinned = Some(page.revision);
                consistency = Consistency::AtRevision(page.revision);
            }
            Some(revision) if revision != page.revision => {
                return Err(QueryError::StoreUnavailable {
                    message: format!(
                        "store answered page {pages} at revision {} instead of {revision}",
                        page.revision
                    ),
                });
            }
            Some(_) => {}
        }

        let fetched = accumulated.len() + page.pairs.len();
        if fetched > options.max_result_rows {
            return Err(QueryError::ScanLimitExceeded {
                fetched,
                max_result_rows: options.max_result_rows,
            });
        }
        if page.continuation.is_some() && page.pairs.is_empty() {
            return Err(QueryError::StoreUnavailable {
                message: format!("store returned an empty page {pages} with a continuation key"),
            });
        }
        accumulated.extend(page.pairs);
        debug!(page = pages, fetched, revision = page.revision, "range page read");

        match page.continuation {
            Some(next) if next.as_slice() < plan.end.as_slice() => continuation = Some(next),
            _ => break,
        }
    }

    Ok(RawScan {
        pairs: accumulated,
        revision: pinned.unwrap_or_default(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::{ScanOptions, execute};
    use crate::error::{QueryError, StoreError};
    use crate::query::CancelSignal;
    use crate::query::planner::{PrefixDepth, RangePlan};
    use crate::storage::memory::MemoryStore;
    use crate::storage::{Consistency, KeyValue, RangePage, RangeReader, RangeRequest};
    use parking_lot::Mutex;

    fn options(page_limit: usize) -> ScanOptions {
        ScanOptions {
            page_limit,
            max_result_rows: 1_000,
            consistency: Consistency::Latest,
            read_deadline: None,
        }
    }

    fn seeded(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..count {
            store.put(format!("/r/a/{i:03}"), vec![i as u8]);
        }
        store.put(b"/r/b/000".to_vec(), b"other".to_vec());
        store
    }

    fn plan() -> RangePlan {
        RangePlan::for_prefix(b"/r/a/".to_vec(), PrefixDepth::Organization).expect("plan")
    }

    #[tokio::test]
    async fn concatenates_pages_in_store_order() {
        let store = seeded(7);
        let scan = execute(&store, &plan(), &options(3), None)
            .await
            .expect("scan");
        assert_eq!(scan.pages, 3);
        assert_eq!(scan.pairs.len(), 7);
        assert!(scan.pairs.windows(2).all(|w| w[0].key < w[1].key));
        assert_eq!(scan.revision, store.revision());
    }

    #[tokio::test]
    async fn enforces_the_row_cap() {
        let store = seeded(7);
        let mut opts = options(3);
        opts.max_result_rows = 5;
        let err = execute(&store, &plan(), &opts, None)
            .await
            .expect_err("cap");
        assert!(matches!(err, QueryError::ScanLimitExceeded { fetched: 6, .. }));
    }

    #[tokio::test]
    async fn cancelled_signal_stops_before_reading() {
        let store = seeded(2);
        let cancel = CancelSignal::new();
        cancel.cancel();
        let err = execute(&store, &plan(), &options(1), Some(&cancel))
            .await
            .expect_err("cancelled");
        assert_eq!(err, QueryError::Cancelled);
    }

    fn pair(key: &[u8]) -> KeyValue {
        KeyValue {
            key: key.to_vec(),
            value: b"v".to_vec(),
            create_revision: 2,
            mod_revision: 2,
        }
    }

    /// Answers each read from a scripted list of pages.
    struct ScriptedStore {
        pages: Mutex<Vec<Result<RangePage, StoreError>>>,
    }

    impl RangeReader for ScriptedStore {
        async fn range_read(&self, _request: RangeRequest<'_>) -> Result<RangePage, StoreError> {
            self.pages.lock().remove(0)
        }
    }

    #[tokio::test]
    async fn revision_drift_between_pages_is_rejected() {
        let store = ScriptedStore {
            pages: Mutex::new(vec![
                Ok(RangePage {
                    pairs: vec![pair(b"/r/a/000")],
                    continuation: Some(b"/r/a/000".to_vec()),
                    revision: 4,
                }),
                Ok(RangePage {
                    pairs: Vec::new(),
                    continuation: None,
                    revision: 5,
                }),
            ]),
        };
        let err = execute(&store, &plan(), &options(1), None)
            .await
            .expect_err("drift");
        assert_eq!(err.code_str(), "store_unavailable");
    }

    #[tokio::test]
    async fn store_failure_after_first_page_discards_results() {
        let store = ScriptedStore {
            pages: Mutex::new(vec![
                Ok(RangePage {
                    pairs: vec![pair(b"/r/a/000")],
                    continuation: Some(b"/r/a/000".to_vec()),
                    revision: 4,
                }),
                Err(StoreError::Unavailable("leader lost".into())),
            ]),
        };
        let err = execute(&store, &plan(), &options(1), None)
            .await
            .expect_err("unavailable");
        assert_eq!(
            err,
            QueryError::StoreUnavailable {
                message: "leader lost".into()
            }
        );
    }
}
