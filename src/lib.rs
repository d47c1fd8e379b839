pub mod config;
pub mod error;
pub mod query;
pub mod resource;
pub mod scope;
pub mod storage;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::query::executor::{RawScan, ScanOptions, execute};
use crate::query::mapper::map_scan;
use crate::query::planner::{RangePlan, plan_range};
use crate::query::{QueryOptions, QueryResult, ScopedItem};
use crate::resource::ResourceDecoder;
use crate::scope::ScopeContext;
use crate::storage::RangeReader;
use crate::storage::key_path::{KeyPath, ResourceTemplate};
use tracing::debug;

pub use crate::query::CancelSignal;
pub use crate::scope::ScopeSelector;
pub use crate::storage::Consistency;

/// Tenant-scoped read entry point over a sorted, revisioned backing store.
///
/// Holds no per-query state; any number of queries may run concurrently
/// against one engine.
#[derive(Debug)]
pub struct ScopedQueryEngine<S> {
    config: QueryConfig,
    store: S,
}

impl<S: RangeReader> ScopedQueryEngine<S> {
    pub fn new(store: S, config: QueryConfig) -> Result<Self, QueryError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Template for `tag` under the configured key prefix.
    pub fn template(&self, tag: &str) -> Result<ResourceTemplate, QueryError> {
        ResourceTemplate::new(&self.config.key_prefix, tag)
    }

    /// The range a query for `scope` would scan, without reading it.
    pub fn plan(
        &self,
        template: &ResourceTemplate,
        scope: &ScopeContext,
    ) -> Result<RangePlan, QueryError> {
        plan_range(template, scope)
    }

    /// Every raw pair visible under `scope`, undecoded.
    pub async fn query_raw(
        &self,
        template: &ResourceTemplate,
        scope: &ScopeContext,
        options: &QueryOptions,
    ) -> Result<RawScan, QueryError> {
        let plan = plan_range(template, scope)?;
        self.scan(&plan, options).await
    }

    pub async fn query<D: ResourceDecoder>(
        &self,
        template: &ResourceTemplate,
        scope: &ScopeContext,
        decoder: &D,
    ) -> Result<QueryResult<D::Output>, QueryError> {
        self.query_with_options(template, scope, decoder, &QueryOptions::default())
            .await
    }

    pub async fn query_with_options<D: ResourceDecoder>(
        &self,
        template: &ResourceTemplate,
        scope: &ScopeContext,
        decoder: &D,
        options: &QueryOptions,
    ) -> Result<QueryResult<D::Output>, QueryError> {
        let raw = self.query_raw(template, scope, options).await?;
        let result = map_scan(template, decoder, raw)?;
        debug!(
            resource = template.tag(),
            scope = %scope,
            items = result.len(),
            revision = result.revision,
            "scoped query complete"
        );
        Ok(result)
    }

    /// Lists the resources of type `tag` visible under `scope`.
    pub async fn list<D: ResourceDecoder>(
        &self,
        tag: &str,
        scope: &ScopeContext,
        decoder: &D,
    ) -> Result<Vec<D::Output>, QueryError> {
        let template = self.template(tag)?;
        let result = self.query(&template, scope, decoder).await?;
        Ok(result.into_resources())
    }

    /// Reads one fully concrete resource.
    pub async fn get<D: ResourceDecoder>(
        &self,
        template: &ResourceTemplate,
        path: &KeyPath,
        decoder: &D,
        options: &QueryOptions,
    ) -> Result<Option<ScopedItem<D::Output>>, QueryError> {
        let plan = RangePlan::for_key(path.encode(template))?;
        let raw = self.scan(&plan, options).await?;
        let result = map_scan(template, decoder, raw)?;
        Ok(result.items.into_iter().next())
    }

    async fn scan(&self, plan: &RangePlan, options: &QueryOptions) -> Result<RawScan, QueryError> {
        let scan_options = ScanOptions {
            page_limit: self.config.page_limit,
            max_result_rows: self.config.max_result_rows,
            consistency: options.consistency,
            read_deadline: self.config.read_deadline(),
        };
        execute(&self.store, plan, &scan_options, options.cancel.as_ref()).await
    }
}
