//! Query and retention surface over the persisted audit trail.

use chrono::{DateTime, Utc};
use stockpile_core::store::AuditLogStore;
use stockpile_core::{AuditLog, AuditLogFilter, AuditStatus, ChaosStats};

#[derive(Clone)]
pub struct AuditLogService<S> {
    store: S,
}

impl<S: AuditLogStore> AuditLogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_audit_logs(&self, filter: AuditLogFilter) -> anyhow::Result<Vec<AuditLog>> {
        self.store.find_with_filters(filter).await
    }

    pub async fn get_audit_logs_by_entity(&self, entity_id: i64) -> anyhow::Result<Vec<AuditLog>> {
        self.store.find_by_entity_id(entity_id).await
    }

    pub async fn get_failed_operations(&self) -> anyhow::Result<Vec<AuditLog>> {
        self.store.find_failed().await
    }

    pub async fn get_chaos_statistics(&self) -> anyhow::Result<ChaosStats> {
        let total_succeeded = self.store.count_by_status(AuditStatus::Succeeded).await?;
        let total_failed = self.store.count_by_status(AuditStatus::Failed).await?;
        let chaos_impacted = self.store.count_chaos_impacted().await?;
        Ok(ChaosStats {
            total_succeeded,
            total_failed,
            chaos_impacted,
            success_rate: success_rate(total_succeeded, total_failed),
        })
    }

    pub async fn delete_logs_before(&self, before: DateTime<Utc>) -> anyhow::Result<u64> {
        let deleted = self.store.delete_before(before).await?;
        tracing::info!(deleted, %before, "trimmed audit trail");
        Ok(deleted)
    }

    pub async fn delete_all(&self) -> anyhow::Result<u64> {
        let deleted = self.store.delete_all().await?;
        tracing::warn!(deleted, "purged the entire audit trail");
        Ok(deleted)
    }
}

fn success_rate(succeeded: u64, failed: u64) -> f64 {
    let total = succeeded + failed;
    if total == 0 {
        return 0.0;
    }
    succeeded as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryAuditLogStore, log_row};
    use chrono::Duration;
    use stockpile_core::Operation;

    #[test]
    fn success_rate_guards_against_empty_denominator() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(7, 3), 70.0);
        assert_eq!(success_rate(0, 4), 0.0);
        assert_eq!(success_rate(4, 0), 100.0);
    }

    #[tokio::test]
    async fn chaos_statistics_aggregate_the_trail() {
        let store = MemoryAuditLogStore::default();
        for _ in 0..7 {
            store.seed(log_row(Some(AuditStatus::Succeeded), false, Utc::now()));
        }
        for _ in 0..3 {
            store.seed(log_row(Some(AuditStatus::Failed), true, Utc::now()));
        }
        // ATTEMPTED rows never count toward the rate.
        store.seed(log_row(Some(AuditStatus::Attempted), false, Utc::now()));

        let stats = AuditLogService::new(store).get_chaos_statistics().await.unwrap();
        assert_eq!(stats.total_succeeded, 7);
        assert_eq!(stats.total_failed, 3);
        assert_eq!(stats.chaos_impacted, 3);
        assert_eq!(stats.success_rate, 70.0);
    }

    #[tokio::test]
    async fn chaos_statistics_on_an_empty_trail() {
        let service = AuditLogService::new(MemoryAuditLogStore::default());
        let stats = service.get_chaos_statistics().await.unwrap();
        assert_eq!(stats.total_succeeded, 0);
        assert_eq!(stats.total_failed, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn filters_apply_independently() {
        let store = MemoryAuditLogStore::default();
        let old = Utc::now() - Duration::hours(2);
        store.seed(log_row(Some(AuditStatus::Succeeded), false, old));
        store.seed(log_row(Some(AuditStatus::Failed), true, Utc::now()));
        let service = AuditLogService::new(store);

        let all = service.get_audit_logs(AuditLogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let failed = service
            .get_audit_logs(AuditLogFilter {
                status: Some(AuditStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);

        let chaos = service
            .get_audit_logs(AuditLogFilter {
                chaos_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(chaos.len(), 1);

        let recent = service
            .get_audit_logs(AuditLogFilter {
                start_time: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let by_operation = service
            .get_audit_logs(AuditLogFilter {
                operation: Some(Operation::Create),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_operation.len(), 2);
    }

    #[tokio::test]
    async fn logs_by_entity_only_match_that_entity() {
        let store = MemoryAuditLogStore::default();
        let mut a = log_row(Some(AuditStatus::Succeeded), false, Utc::now());
        a.entity_id = Some(7);
        store.seed(a);
        let mut b = log_row(Some(AuditStatus::Failed), false, Utc::now());
        b.entity_id = Some(8);
        store.seed(b);

        let rows = AuditLogService::new(store)
            .get_audit_logs_by_entity(7)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id, Some(7));
    }

    #[tokio::test]
    async fn failed_operations_come_back_newest_first() {
        let store = MemoryAuditLogStore::default();
        let older = Utc::now() - Duration::minutes(10);
        let newer = Utc::now();
        store.seed(log_row(Some(AuditStatus::Failed), false, older));
        store.seed(log_row(Some(AuditStatus::Failed), false, newer));
        store.seed(log_row(Some(AuditStatus::Succeeded), false, Utc::now()));

        let failed = AuditLogService::new(store).get_failed_operations().await.unwrap();
        assert_eq!(failed.len(), 2);
        assert!(failed[0].request_timestamp >= failed[1].request_timestamp);
    }

    #[tokio::test]
    async fn delete_before_removes_exactly_the_older_rows_and_is_idempotent() {
        let store = MemoryAuditLogStore::default();
        let cutoff = Utc::now();
        store.seed(log_row(Some(AuditStatus::Succeeded), false, cutoff - Duration::hours(1)));
        store.seed(log_row(Some(AuditStatus::Succeeded), false, cutoff - Duration::seconds(1)));
        store.seed(log_row(Some(AuditStatus::Succeeded), false, cutoff + Duration::hours(1)));
        let service = AuditLogService::new(store.clone());

        assert_eq!(service.delete_logs_before(cutoff).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        // A second identical call deletes nothing further.
        assert_eq!(service.delete_logs_before(cutoff).await.unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_all_purges_and_reports_the_count() {
        let store = MemoryAuditLogStore::default();
        store.seed(log_row(Some(AuditStatus::Succeeded), false, Utc::now()));
        store.seed(log_row(Some(AuditStatus::Failed), false, Utc::now()));
        let service = AuditLogService::new(store.clone());

        assert_eq!(service.delete_all().await.unwrap(), 2);
        assert_eq!(store.len(), 0);
    }
}
