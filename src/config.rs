use crate::error::QueryError;
use crate::scope::WILDCARD;
use crate::storage::key_path::SEPARATOR;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime configuration for a scoped query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Store-wide root under which every resource type root lives.
    pub key_prefix: String,
    /// Pairs requested from the store per range read.
    pub page_limit: usize,
    /// Hard cap on pairs one query may accumulate across all pages.
    pub max_result_rows: usize,
    /// Deadline handed to the store for each underlying read.
    pub read_deadline_ms: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            key_prefix: "/scopekv".to_string(),
            page_limit: 500,
            max_result_rows: 10_000,
            read_deadline_ms: None,
        }
    }
}

impl QueryConfig {
    /// Large pages and a high row cap for export and reporting scans.
    pub fn bulk() -> Self {
        Self {
            page_limit: 5_000,
            max_result_rows: 1_000_000,
            read_deadline_ms: Some(30_000),
            ..Self::default()
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, QueryError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|e| QueryError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_max_result_rows(mut self, max_result_rows: usize) -> Self {
        self.max_result_rows = max_result_rows;
        self
    }

    pub fn with_read_deadline(mut self, deadline: Duration) -> Self {
        self.read_deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    pub fn read_deadline(&self) -> Option<Duration> {
        self.read_deadline_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page_limit == 0 {
            return Err(invalid("page_limit must be > 0"));
        }
        if self.max_result_rows == 0 {
            return Err(invalid("max_result_rows must be > 0"));
        }
        if self.key_prefix.is_empty() {
            return Err(invalid("key_prefix must not be empty"));
        }
        if self.key_prefix.as_bytes().last() == Some(&SEPARATOR) {
            return Err(invalid("key_prefix must not end with the separator"));
        }
        if self
            .key_prefix
            .split(SEPARATOR as char)
            .any(|part| part == WILDCARD)
        {
            return Err(invalid("key_prefix must not contain the wildcard sentinel"));
        }
        if self.read_deadline_ms == Some(0) {
            return Err(invalid("read_deadline_ms must be > 0 when set"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> QueryError {
    QueryError::InvalidConfig {
        message: message.to_string(),
    }
}
