use crate::error::QueryError;
use crate::query::executor::RawScan;
use crate::query::{QueryResult, ScopedItem};
use crate::resource::ResourceDecoder;
use crate::storage::key_path::{KeyPath, ResourceTemplate};
use tracing::error;

/// Decodes every raw pair, keeping store key order.
///
/// The first undecodable key or payload fails the whole result; nothing is
/// skipped.
pub fn map_scan<D: ResourceDecoder>(
    template: &ResourceTemplate,
    decoder: &D,
    scan: RawScan,
) -> Result<QueryResult<D::Output>, QueryError> {
    let mut items = Vec::with_capacity(scan.pairs.len());
    for kv in scan.pairs {
        let path = KeyPath::decode(template, &kv.key).map_err(|e| {
            let reason = match e {
                QueryError::MalformedKey { reason, .. } => reason,
                other => other.to_string(),
            };
            corrupt(&kv.key, reason)
        })?;
        let resource = decoder
            .decode(template.tag(), &kv.value)
            .map_err(|e| corrupt(&kv.key, e.to_string()))?;
        items.push(ScopedItem {
            path,
            resource,
            create_revision: kv.create_revision,
            mod_revision: kv.mod_revision,
        });
    }
    Ok(QueryResult {
        items,
        revision: scan.revision,
        pages: scan.pages,
    })
}

fn corrupt(key: &[u8], reason: String) -> QueryError {
    let err = QueryError::corrupt_record(key, reason);
    error!(error = %err, "corrupt record in scoped scan");
    err
}
