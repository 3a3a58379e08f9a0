//! Audit lifecycle events and their durable projection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of an audited operation. ATTEMPTED is emitted before the
/// operation runs; exactly one of SUCCEEDED/FAILED follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Attempted,
    Succeeded,
    Failed,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditStatus::Attempted => "ATTEMPTED",
            AuditStatus::Succeeded => "SUCCEEDED",
            AuditStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("unrecognized audit status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AuditStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATTEMPTED" => Ok(AuditStatus::Attempted),
            "SUCCEEDED" => Ok(AuditStatus::Succeeded),
            "FAILED" => Ok(AuditStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The kind of business operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Read,
}

impl Operation {
    /// Mixed-case fragment used when composing event type names, e.g. the
    /// `Create` in `ProductCreateSUCCEEDED`.
    pub fn pascal(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
            Operation::Read => "Read",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Read => "READ",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("unrecognized operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Operation::Create),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            "READ" => Ok(Operation::Read),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// One lifecycle event as it travels over the channel (wire form).
///
/// `operation` and `status` are carried as strings so the consumer side can
/// tolerate values it does not recognize; the projection parses them
/// leniently. For one `event_id` at most one ATTEMPTED and at most one
/// terminal event exist, and either may be lost independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub operation: String,
    pub status: String,
    pub user_id: Option<String>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub http_status_code: Option<i32>,
    pub request_timestamp: DateTime<Utc>,
    pub completion_timestamp: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub source_ip: Option<String>,
    pub pod_name: Option<String>,
    pub chaos_active: bool,
}

impl AuditEvent {
    /// Compose the `<EntityType><Operation><Status>` event type name.
    pub fn event_type_for(entity_type: &str, operation: Operation, status: AuditStatus) -> String {
        format!("{entity_type}{}{status}", operation.pascal())
    }
}

/// A persisted audit-trail row. Rows are append-only: each consumed event
/// produces its own row, duplicates included, and nothing is ever updated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub operation: String,
    pub status: Option<AuditStatus>,
    pub user_id: Option<String>,
    pub request_payload: Option<String>,
    pub response_payload: Option<String>,
    pub error_message: Option<String>,
    pub http_status_code: Option<i32>,
    pub request_timestamp: DateTime<Utc>,
    pub completion_timestamp: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub source_ip: Option<String>,
    pub pod_name: Option<String>,
    pub chaos_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An audit-trail row before the store assigns identity and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLog {
    pub event_id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub operation: String,
    pub status: Option<AuditStatus>,
    pub user_id: Option<String>,
    pub request_payload: Option<String>,
    pub response_payload: Option<String>,
    pub error_message: Option<String>,
    pub http_status_code: Option<i32>,
    pub request_timestamp: DateTime<Utc>,
    pub completion_timestamp: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub source_ip: Option<String>,
    pub pod_name: Option<String>,
    pub chaos_active: bool,
}

/// Optional, independent constraints for audit-trail queries. An absent
/// field leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuditLogFilter {
    pub status: Option<AuditStatus>,
    pub operation: Option<Operation>,
    pub chaos_active: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Aggregate over the audit trail used for resilience reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaosStats {
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub chaos_impacted: u64,
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_spelling() {
        for status in [AuditStatus::Attempted, AuditStatus::Succeeded, AuditStatus::Failed] {
            assert_eq!(status.to_string().parse::<AuditStatus>().unwrap(), status);
        }
        assert!("succeeded".parse::<AuditStatus>().is_err());
        assert!("".parse::<AuditStatus>().is_err());
    }

    #[test]
    fn operation_round_trips_through_wire_spelling() {
        for op in [Operation::Create, Operation::Update, Operation::Delete, Operation::Read] {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn event_type_composes_entity_operation_and_status() {
        assert_eq!(
            AuditEvent::event_type_for("Product", Operation::Create, AuditStatus::Succeeded),
            "ProductCreateSUCCEEDED"
        );
        assert_eq!(
            AuditEvent::event_type_for("Product", Operation::Delete, AuditStatus::Attempted),
            "ProductDeleteATTEMPTED"
        );
    }
}
