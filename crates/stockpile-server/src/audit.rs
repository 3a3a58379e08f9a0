//! The audit interceptor: wraps a business operation in ATTEMPTED /
//! SUCCEEDED / FAILED lifecycle events.
//!
//! The contract is one-directional: auditing observes the business path
//! but can never fail it. The ATTEMPTED publish completes before the
//! wrapped future starts; the terminal event is built and published on a
//! detached task after the caller already holds the result; every publish
//! error is logged and swallowed.

use chrono::{DateTime, Utc};
use stockpile_bus::{AUDIT_TOPIC, AuditBus, FAILED_TOPIC};
use stockpile_core::{AuditEvent, AuditStatus, Operation};

const ENTITY_TYPE: &str = "Product";

/// Status code stamped on SUCCEEDED events.
const SUCCESS_STATUS_CODE: i32 = 201;
/// Status code stamped on FAILED events.
const FAILURE_STATUS_CODE: i32 = 500;

#[derive(Clone)]
pub struct Auditor {
    bus: AuditBus,
    pod_name: Option<String>,
    chaos_active: bool,
}

impl Auditor {
    pub fn new(bus: AuditBus, pod_name: Option<String>, chaos_active: bool) -> Self {
        Self {
            bus,
            pod_name,
            chaos_active,
        }
    }

    /// Run `operation` bracketed by lifecycle events and hand its result
    /// back unchanged.
    ///
    /// `entity_id` is the operation's target when it is known up front
    /// (update/delete); creates pass `None` and the SUCCEEDED event picks
    /// the id out of the response payload instead.
    pub async fn audit<T, E, F>(
        &self,
        operation: F,
        op: Operation,
        entity_id: Option<i64>,
        request_payload: serde_json::Value,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: serde::Serialize,
        E: std::fmt::Display,
    {
        let event_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let attempted = self.build_event(
            &event_id,
            op,
            AuditStatus::Attempted,
            entity_id,
            Some(request_payload.clone()),
            started_at,
        );
        if let Err(err) = self.bus.publish(AUDIT_TOPIC, &event_id, &attempted) {
            tracing::warn!(%err, %event_id, "failed to publish ATTEMPTED audit event");
        }

        let result = operation.await;

        match &result {
            Ok(value) => {
                let response_payload = match serde_json::to_value(value) {
                    Ok(v) => Some(v),
                    Err(err) => {
                        tracing::warn!(%err, %event_id, "failed to serialize response payload");
                        None
                    }
                };
                let mut event = self.build_event(
                    &event_id,
                    op,
                    AuditStatus::Succeeded,
                    entity_id,
                    Some(request_payload),
                    started_at,
                );
                event.entity_id = entity_id.or_else(|| {
                    response_payload
                        .as_ref()
                        .and_then(|v| v.get("id"))
                        .and_then(serde_json::Value::as_i64)
                });
                event.response_payload = response_payload;
                event.http_status_code = Some(SUCCESS_STATUS_CODE);

                let bus = self.bus.clone();
                tokio::spawn(async move {
                    complete(&mut event);
                    if let Err(err) = bus.publish(AUDIT_TOPIC, &event.event_id, &event) {
                        tracing::warn!(%err, event_id = %event.event_id, "failed to publish SUCCEEDED audit event");
                    }
                });
            }
            Err(error) => {
                let mut event = self.build_event(
                    &event_id,
                    op,
                    AuditStatus::Failed,
                    entity_id,
                    Some(request_payload),
                    started_at,
                );
                event.error_message = Some(error.to_string());
                event.http_status_code = Some(FAILURE_STATUS_CODE);

                let bus = self.bus.clone();
                tokio::spawn(async move {
                    complete(&mut event);
                    if let Err(err) = bus.publish(FAILED_TOPIC, &event.event_id, &event) {
                        tracing::error!(%err, event_id = %event.event_id, "failed to publish FAILED audit event");
                    }
                });
            }
        }

        result
    }

    fn build_event(
        &self,
        event_id: &str,
        op: Operation,
        status: AuditStatus,
        entity_id: Option<i64>,
        request_payload: Option<serde_json::Value>,
        requested_at: DateTime<Utc>,
    ) -> AuditEvent {
        AuditEvent {
            event_id: event_id.to_string(),
            event_type: AuditEvent::event_type_for(ENTITY_TYPE, op, status),
            entity_type: ENTITY_TYPE.to_string(),
            entity_id,
            operation: op.to_string(),
            status: status.to_string(),
            user_id: None,
            request_payload,
            response_payload: None,
            error_message: None,
            http_status_code: None,
            request_timestamp: requested_at,
            completion_timestamp: None,
            duration_ms: None,
            source_ip: None,
            pod_name: self.pod_name.clone(),
            chaos_active: self.chaos_active,
        }
    }
}

fn complete(event: &mut AuditEvent) {
    let now = Utc::now();
    event.completion_timestamp = Some(now);
    event.duration_ms = Some((now - event.request_timestamp).num_milliseconds());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use stockpile_core::{Product, ProductError};

    fn auditor(bus: &AuditBus) -> Auditor {
        Auditor::new(bus.clone(), Some("pod-1".to_string()), false)
    }

    fn widget() -> Product {
        Product {
            id: 42,
            name: "Widget".into(),
            description: None,
            price: Decimal::from(10),
            quantity: 5,
        }
    }

    #[tokio::test]
    async fn success_emits_attempted_then_succeeded_with_same_event_id() {
        let bus = AuditBus::new(4, 16);
        let mut sub = bus.subscribe(AUDIT_TOPIC, "test");

        let result = auditor(&bus)
            .audit(
                async { Ok::<_, ProductError>(widget()) },
                Operation::Create,
                None,
                serde_json::json!({"name": "Widget"}),
            )
            .await
            .unwrap();
        assert_eq!(result.id, 42);

        let attempted = sub.recv().await.unwrap();
        assert_eq!(attempted.status, "ATTEMPTED");
        assert_eq!(attempted.event_type, "ProductCreateATTEMPTED");
        assert_eq!(attempted.entity_id, None);
        assert_eq!(attempted.pod_name.as_deref(), Some("pod-1"));

        let succeeded = sub.recv().await.unwrap();
        assert_eq!(succeeded.status, "SUCCEEDED");
        assert_eq!(succeeded.event_id, attempted.event_id);
        assert_eq!(succeeded.http_status_code, Some(201));
        // The created row's id is picked out of the response payload.
        assert_eq!(succeeded.entity_id, Some(42));
        assert!(succeeded.response_payload.is_some());

        let completion = succeeded.completion_timestamp.unwrap();
        assert!(completion >= succeeded.request_timestamp);
        assert_eq!(
            succeeded.duration_ms,
            Some((completion - succeeded.request_timestamp).num_milliseconds())
        );
    }

    #[tokio::test]
    async fn failure_routes_terminal_event_to_failure_topic() {
        let bus = AuditBus::new(4, 16);
        let mut general = bus.subscribe(AUDIT_TOPIC, "test");
        let mut failures = bus.subscribe(FAILED_TOPIC, "test");

        let result: Result<Product, ProductError> = auditor(&bus)
            .audit(
                async { Err(ProductError::validation("price must be greater than 0")) },
                Operation::Create,
                None,
                serde_json::json!({"name": "Widget"}),
            )
            .await;
        assert!(result.is_err());

        let attempted = general.recv().await.unwrap();
        assert_eq!(attempted.status, "ATTEMPTED");

        let failed = failures.recv().await.unwrap();
        assert_eq!(failed.status, "FAILED");
        assert_eq!(failed.event_id, attempted.event_id);
        assert_eq!(failed.http_status_code, Some(500));
        assert_eq!(
            failed.error_message.as_deref(),
            Some("price must be greater than 0")
        );
        assert!(failed.completion_timestamp.unwrap() >= failed.request_timestamp);
    }

    #[tokio::test]
    async fn known_entity_id_is_stamped_on_all_events() {
        let bus = AuditBus::new(4, 16);
        let mut sub = bus.subscribe(AUDIT_TOPIC, "test");

        auditor(&bus)
            .audit(
                async { Ok::<_, ProductError>(()) },
                Operation::Delete,
                Some(7),
                serde_json::json!({"id": 7}),
            )
            .await
            .unwrap();

        assert_eq!(sub.recv().await.unwrap().entity_id, Some(7));
        assert_eq!(sub.recv().await.unwrap().entity_id, Some(7));
    }

    #[tokio::test]
    async fn publish_failure_never_touches_the_business_result() {
        let bus = AuditBus::new(4, 16);
        // Subscribe and immediately drop: every publish now fails Closed.
        drop(bus.subscribe(AUDIT_TOPIC, "test"));
        drop(bus.subscribe(FAILED_TOPIC, "test"));

        let created = auditor(&bus)
            .audit(
                async { Ok::<_, ProductError>(widget()) },
                Operation::Create,
                None,
                serde_json::json!({"name": "Widget"}),
            )
            .await
            .unwrap();
        assert_eq!(created, widget());

        let failed: Result<Product, ProductError> = auditor(&bus)
            .audit(
                async { Err(ProductError::NotFound(9)) },
                Operation::Update,
                Some(9),
                serde_json::Value::Null,
            )
            .await;
        // The business error comes through untouched as well.
        assert!(matches!(failed, Err(ProductError::NotFound(9))));
    }
}
