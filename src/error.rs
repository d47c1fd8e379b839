use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    InvalidSegment,
    MalformedKey,
    CorruptRecord,
    StoreUnavailable,
    Cancelled,
    InvalidPlan,
    InvalidConfig,
    ScanLimitExceeded,
    RevisionCompacted,
    RevisionNotYetVisible,
}

impl QueryErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryErrorCode::InvalidSegment => "invalid_segment",
            QueryErrorCode::MalformedKey => "malformed_key",
            QueryErrorCode::CorruptRecord => "corrupt_record",
            QueryErrorCode::StoreUnavailable => "store_unavailable",
            QueryErrorCode::Cancelled => "cancelled",
            QueryErrorCode::InvalidPlan => "invalid_plan",
            QueryErrorCode::InvalidConfig => "invalid_config",
            QueryErrorCode::ScanLimitExceeded => "scan_limit_exceeded",
            QueryErrorCode::RevisionCompacted => "revision_compacted",
            QueryErrorCode::RevisionNotYetVisible => "revision_not_yet_visible",
        }
    }

    /// Data-integrity failures signal store corruption or a layout mismatch.
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            QueryErrorCode::MalformedKey | QueryErrorCode::CorruptRecord
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid key segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },
    #[error("malformed key {key:?}: {reason}")]
    MalformedKey { key: String, reason: String },
    #[error("corrupt record at key {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },
    #[error("query cancelled")]
    Cancelled,
    #[error("invalid range plan: {reason}")]
    InvalidPlan { reason: String },
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("scan limit exceeded: fetched={fetched}, max_result_rows={max_result_rows}")]
    ScanLimitExceeded {
        fetched: usize,
        max_result_rows: usize,
    },
    #[error("revision {requested} was compacted (oldest_available={oldest_available})")]
    RevisionCompacted { requested: u64, oldest_available: u64 },
    #[error("revision {requested} is not yet visible (current={current})")]
    RevisionNotYetVisible { requested: u64, current: u64 },
}

impl QueryError {
    pub fn code(&self) -> QueryErrorCode {
        match self {
            QueryError::InvalidSegment { .. } => QueryErrorCode::InvalidSegment,
            QueryError::MalformedKey { .. } => QueryErrorCode::MalformedKey,
            QueryError::CorruptRecord { .. } => QueryErrorCode::CorruptRecord,
            QueryError::StoreUnavailable { .. } => QueryErrorCode::StoreUnavailable,
            QueryError::Cancelled => QueryErrorCode::Cancelled,
            QueryError::InvalidPlan { .. } => QueryErrorCode::InvalidPlan,
            QueryError::InvalidConfig { .. } => QueryErrorCode::InvalidConfig,
            QueryError::ScanLimitExceeded { .. } => QueryErrorCode::ScanLimitExceeded,
            QueryError::RevisionCompacted { .. } => QueryErrorCode::RevisionCompacted,
            QueryError::RevisionNotYetVisible { .. } => QueryErrorCode::RevisionNotYetVisible,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub(crate) fn invalid_segment(segment: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidSegment {
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_key(key: &[u8], reason: impl Into<String>) -> Self {
        QueryError::MalformedKey {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_record(key: &[u8], reason: impl Into<String>) -> Self {
        QueryError::CorruptRecord {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by the backing store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("read deadline exceeded")]
    DeadlineExceeded,
    #[error("revision {requested} compacted (oldest_available={oldest_available})")]
    Compacted { requested: u64, oldest_available: u64 },
    #[error("revision {requested} not yet visible (current={current})")]
    FutureRevision { requested: u64, current: u64 },
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(message) => QueryError::StoreUnavailable { message },
            StoreError::DeadlineExceeded => QueryError::StoreUnavailable {
                message: "read deadline exceeded".into(),
            },
            StoreError::Compacted {
                requested,
                oldest_available,
            } => QueryError::RevisionCompacted {
                requested,
                oldest_available,
            },
            StoreError::FutureRevision { requested, current } => {
                QueryError::RevisionNotYetVisible { requested, current }
            }
        }
    }
}

/// Failure reported by a resource decoder for one stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {resource_tag} payload: {message}")]
pub struct DecodeError {
    pub resource_tag: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::{QueryError, QueryErrorCode, StoreError};

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(QueryErrorCode::InvalidSegment.as_str(), "invalid_segment");
        assert_eq!(QueryErrorCode::CorruptRecord.as_str(), "corrupt_record");
        assert_eq!(
            QueryErrorCode::StoreUnavailable.as_str(),
            "store_unavailable"
        );
        assert_eq!(QueryErrorCode::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn store_errors_map_to_query_taxonomy() {
        let err: QueryError = StoreError::Unavailable("connection reset".into()).into();
        assert_eq!(err.code(), QueryErrorCode::StoreUnavailable);
        assert_eq!(err.to_string(), "store unavailable: connection reset");

        let err: QueryError = StoreError::DeadlineExceeded.into();
        assert_eq!(err.code_str(), "store_unavailable");

        let err: QueryError = StoreError::Compacted {
            requested: 3,
            oldest_available: 9,
        }
        .into();
        assert_eq!(err.code(), QueryErrorCode::RevisionCompacted);
    }

    #[test]
    fn corrupt_record_reports_the_offending_key() {
        let err = QueryError::corrupt_record(b"/scopekv/checks/acme/dev/check3", "bad payload");
        assert!(err.code().is_integrity_failure());
        assert_eq!(
            err.to_string(),
            "corrupt record at key \"/scopekv/checks/acme/dev/check3\": bad payload"
        );
    }
}
