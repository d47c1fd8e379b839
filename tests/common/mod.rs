#![allow(dead_code)]

use scopekv::error::StoreError;
use scopekv::storage::key_path::{ResourceTemplate, encode_key};
use scopekv::storage::memory::MemoryStore;
use scopekv::storage::{RangePage, RangeReader, RangeRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const KEY_PREFIX: &str = "/scopekv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    pub organization: String,
    pub environment: String,
    pub command: String,
    pub interval: u32,
    pub subscriptions: Vec<String>,
}

pub fn fixture_check(name: &str, organization: &str, environment: &str) -> CheckConfig {
    CheckConfig {
        name: name.to_string(),
        organization: organization.to_string(),
        environment: environment.to_string(),
        command: format!("check-{name} --warn 80"),
        interval: 60,
        subscriptions: vec!["linux".to_string()],
    }
}

pub fn checks() -> ResourceTemplate {
    ResourceTemplate::new(KEY_PREFIX, "checks").expect("checks template")
}

pub fn handlers() -> ResourceTemplate {
    ResourceTemplate::new(KEY_PREFIX, "handlers").expect("handlers template")
}

pub fn store_check(store: &MemoryStore, check: &CheckConfig) -> u64 {
    let key = encode_key(
        &checks(),
        &check.organization,
        &check.environment,
        Some(check.name.as_str()),
    )
    .expect("check key");
    store.put(key, serde_json::to_vec(check).expect("encode check"))
}

/// The three-tenant layout: default/default/check1, acme/default/check2,
/// acme/dev/check3, plus a handler that must never show up in check scans.
pub fn seed_reference_layout(store: &MemoryStore) {
    store_check(store, &fixture_check("check1", "default", "default"));
    store_check(store, &fixture_check("check2", "acme", "default"));
    store_check(store, &fixture_check("check3", "acme", "dev"));
    let handler_key =
        encode_key(&handlers(), "acme", "dev", Some("slack")).expect("handler key");
    store.put(handler_key, br#"{"name":"slack"}"#.to_vec());
}

/// Wraps a memory store and runs `hook` before every read with the
/// zero-based read index. A returned error fails that read.
pub struct Intercepted<F> {
    pub inner: Arc<MemoryStore>,
    reads: AtomicUsize,
    hook: F,
}

impl<F> Intercepted<F>
where
    F: Fn(usize, &MemoryStore) -> Option<StoreError> + Send + Sync,
{
    pub fn new(inner: Arc<MemoryStore>, hook: F) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            hook,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<F> RangeReader for Intercepted<F>
where
    F: Fn(usize, &MemoryStore) -> Option<StoreError> + Send + Sync,
{
    async fn range_read(&self, request: RangeRequest<'_>) -> Result<RangePage, StoreError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = (self.hook)(n, &self.inner) {
            return Err(err);
        }
        self.inner.range_read(request).await
    }
}

/// Delays every read before handing it to the memory store.
pub struct SlowStore {
    pub inner: Arc<MemoryStore>,
    pub delay: Duration,
}

impl RangeReader for SlowStore {
    async fn range_read(&self, request: RangeRequest<'_>) -> Result<RangePage, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.range_read(request).await
    }
}
