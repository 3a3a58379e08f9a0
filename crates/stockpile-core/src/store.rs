//! Storage port traits. All operations are async; implementations live in
//! the db crate (and as in-memory doubles in tests).

use chrono::{DateTime, Utc};

use crate::audit::{AuditLog, AuditLogFilter, AuditStatus, NewAuditLog};
use crate::product::{NewProduct, Product};

/// Result of an insert attempt against the unique product name.
///
/// A conflict is an expected concurrent-write outcome, not an error: the
/// store reports it structurally so the write path can branch on it instead
/// of matching on error-message text. The store must enforce the name's
/// uniqueness atomically; at most one concurrent insert observes `Created`.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(Product),
    NameConflict,
}

pub trait ProductStore: Send + Sync {
    fn insert(
        &self,
        input: NewProduct,
    ) -> impl Future<Output = anyhow::Result<InsertOutcome>> + Send;
    fn find_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Product>>> + Send;
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Product>>> + Send;
    fn find_all(&self) -> impl Future<Output = anyhow::Result<Vec<Product>>> + Send;
    /// Case-insensitive substring match on the product name.
    fn search_by_name(
        &self,
        fragment: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Product>>> + Send;
    fn update(&self, product: Product) -> impl Future<Output = anyhow::Result<Product>> + Send;
    fn delete(&self, id: i64) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn delete_all(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

pub trait AuditLogStore: Send + Sync {
    /// Append one row. No update or delete-by-id operations exist; the
    /// trail only ever grows, or is trimmed by the retention operations.
    fn append(&self, input: NewAuditLog) -> impl Future<Output = anyhow::Result<AuditLog>> + Send;
    fn find_with_filters(
        &self,
        filter: AuditLogFilter,
    ) -> impl Future<Output = anyhow::Result<Vec<AuditLog>>> + Send;
    fn find_by_entity_id(
        &self,
        entity_id: i64,
    ) -> impl Future<Output = anyhow::Result<Vec<AuditLog>>> + Send;
    /// FAILED rows, newest first.
    fn find_failed(&self) -> impl Future<Output = anyhow::Result<Vec<AuditLog>>> + Send;
    fn count_by_status(
        &self,
        status: AuditStatus,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
    fn count_chaos_impacted(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;
    /// Remove rows with `request_timestamp` strictly before the cutoff.
    fn delete_before(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
    fn delete_all(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;
}
