//! Report persistence port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Write-only keyed store for structured records.
///
/// Keys identify a session, loop or iteration. Writing an existing key
/// replaces the previous record.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Store a record under `key`.
    async fn put(&self, key: &str, record: &serde_json::Value) -> DomainResult<()>;
}
