//! The audit consumer: drains the event channel into the audit trail.
//!
//! Consumption is independent of the business path; a failed save is
//! logged and the event is gone. Redelivered events simply append again —
//! the trail is a log, not a keyed map, so duplicates are accepted.

use stockpile_bus::{AUDIT_TOPIC, AuditBus, FAILED_TOPIC, Subscription};
use stockpile_core::store::AuditLogStore;
use stockpile_core::{AuditEvent, NewAuditLog};

pub const CONSUMER_GROUP: &str = "audit-logger";

pub struct AuditConsumer<S> {
    store: S,
}

impl<S> AuditConsumer<S>
where
    S: AuditLogStore + Clone + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Subscribe to both topics and drain each on a detached task. Must run
    /// before the server starts publishing; events have no home until a
    /// group exists.
    pub fn spawn(self, bus: &AuditBus) {
        for topic in [AUDIT_TOPIC, FAILED_TOPIC] {
            let subscription = bus.subscribe(topic, CONSUMER_GROUP);
            let store = self.store.clone();
            tokio::spawn(drain(topic, subscription, store));
        }
    }
}

async fn drain<S: AuditLogStore>(topic: &'static str, mut subscription: Subscription, store: S) {
    while let Some(event) = subscription.recv().await {
        let event_type = event.event_type.clone();
        tracing::debug!(topic, %event_type, "consuming audit event");
        match store.append(map_event(event)).await {
            Ok(row) => tracing::debug!(id = row.id, %event_type, "saved audit log"),
            Err(err) => tracing::error!(%err, topic, %event_type, "failed to save audit log"),
        }
    }
    tracing::debug!(topic, "audit subscription closed");
}

/// Structural transform from wire event to trail row. Payload snapshots are
/// flattened to text; a wire status the projection does not recognize maps
/// to absent rather than failing the event.
pub fn map_event(event: AuditEvent) -> NewAuditLog {
    NewAuditLog {
        event_id: event.event_id,
        event_type: event.event_type,
        entity_type: event.entity_type,
        entity_id: event.entity_id,
        operation: event.operation,
        status: event.status.parse().ok(),
        user_id: event.user_id,
        request_payload: event.request_payload.map(|v| v.to_string()),
        response_payload: event.response_payload.map(|v| v.to_string()),
        error_message: event.error_message,
        http_status_code: event.http_status_code,
        request_timestamp: event.request_timestamp,
        completion_timestamp: event.completion_timestamp,
        duration_ms: event.duration_ms,
        source_ip: event.source_ip,
        pod_name: event.pod_name,
        chaos_active: event.chaos_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryAuditLogStore, wait_until};
    use chrono::Utc;
    use stockpile_core::AuditStatus;

    fn event(event_id: &str, status: &str) -> AuditEvent {
        AuditEvent {
            event_id: event_id.to_string(),
            event_type: format!("ProductCreate{status}"),
            entity_type: "Product".to_string(),
            entity_id: Some(1),
            operation: "CREATE".to_string(),
            status: status.to_string(),
            user_id: None,
            request_payload: Some(serde_json::json!({"name": "Widget"})),
            response_payload: None,
            error_message: None,
            http_status_code: Some(201),
            request_timestamp: Utc::now(),
            completion_timestamp: None,
            duration_ms: None,
            source_ip: None,
            pod_name: Some("pod-1".to_string()),
            chaos_active: true,
        }
    }

    #[test]
    fn map_event_is_a_faithful_structural_transform() {
        let row = map_event(event("e1", "SUCCEEDED"));
        assert_eq!(row.event_id, "e1");
        assert_eq!(row.status, Some(AuditStatus::Succeeded));
        assert_eq!(row.request_payload.as_deref(), Some(r#"{"name":"Widget"}"#));
        assert_eq!(row.http_status_code, Some(201));
        assert!(row.chaos_active);
    }

    #[test]
    fn map_event_tolerates_unrecognized_status() {
        assert_eq!(map_event(event("e1", "EXPLODED")).status, None);
        assert_eq!(map_event(event("e1", "")).status, None);
    }

    #[tokio::test]
    async fn consumer_persists_events_from_both_topics() {
        let bus = AuditBus::new(4, 16);
        let store = MemoryAuditLogStore::default();
        AuditConsumer::new(store.clone()).spawn(&bus);

        bus.publish(AUDIT_TOPIC, "e1", &event("e1", "ATTEMPTED")).unwrap();
        bus.publish(FAILED_TOPIC, "e1", &event("e1", "FAILED")).unwrap();

        wait_until(|| store.len() == 2).await;
        let rows = store.rows();
        assert!(rows.iter().any(|r| r.status == Some(AuditStatus::Attempted)));
        assert!(rows.iter().any(|r| r.status == Some(AuditStatus::Failed)));
    }

    #[tokio::test]
    async fn redelivered_event_appends_a_duplicate_row() {
        let bus = AuditBus::new(4, 16);
        let store = MemoryAuditLogStore::default();
        AuditConsumer::new(store.clone()).spawn(&bus);

        let e = event("e1", "SUCCEEDED");
        bus.publish(AUDIT_TOPIC, "e1", &e).unwrap();
        bus.publish(AUDIT_TOPIC, "e1", &e).unwrap();

        wait_until(|| store.len() == 2).await;
        let rows = store.rows();
        assert_eq!(rows[0].event_id, rows[1].event_id);
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[tokio::test]
    async fn full_pipeline_lands_both_lifecycle_events_in_the_trail() {
        use crate::audit::Auditor;
        use stockpile_core::{Operation, ProductError};

        let bus = AuditBus::new(4, 64);
        let store = MemoryAuditLogStore::default();
        AuditConsumer::new(store.clone()).spawn(&bus);
        let auditor = Auditor::new(bus.clone(), Some("pod-1".to_string()), false);

        auditor
            .audit(
                async { Ok::<_, ProductError>(serde_json::json!({"id": 5})) },
                Operation::Create,
                None,
                serde_json::json!({"name": "Widget"}),
            )
            .await
            .unwrap();

        wait_until(|| store.len() == 2).await;
        let rows = store.rows();
        assert_eq!(rows[0].event_id, rows[1].event_id);
        assert!(rows.iter().any(|r| r.status == Some(AuditStatus::Attempted)));
        assert!(rows.iter().any(|r| r.status == Some(AuditStatus::Succeeded)));

        // A failing operation lands its FAILED row through the other topic.
        let _: Result<(), ProductError> = auditor
            .audit(
                async { Err(ProductError::validation("price must be greater than 0")) },
                Operation::Create,
                None,
                serde_json::json!({"name": "Widget"}),
            )
            .await;

        wait_until(|| store.len() == 4).await;
        assert!(
            store
                .rows()
                .iter()
                .any(|r| r.status == Some(AuditStatus::Failed))
        );
    }

    #[tokio::test]
    async fn save_failure_drops_the_event_and_keeps_draining() {
        let bus = AuditBus::new(4, 16);
        let store = MemoryAuditLogStore::default();
        store.fail_next_append("disk full");
        AuditConsumer::new(store.clone()).spawn(&bus);

        bus.publish(AUDIT_TOPIC, "e1", &event("e1", "ATTEMPTED")).unwrap();
        bus.publish(AUDIT_TOPIC, "e2", &event("e2", "ATTEMPTED")).unwrap();

        // One of the two events is lost; the consumer keeps going.
        wait_until(|| store.len() == 1).await;
    }
}
