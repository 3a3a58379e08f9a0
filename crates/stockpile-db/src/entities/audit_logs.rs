use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub operation: String,
    pub status: Option<String>,
    pub user_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub request_payload: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub response_payload: Option<String>,
    pub error_message: Option<String>,
    pub http_status_code: Option<i32>,
    pub request_timestamp: DateTimeWithTimeZone,
    pub completion_timestamp: Option<DateTimeWithTimeZone>,
    pub duration_ms: Option<i64>,
    pub source_ip: Option<String>,
    pub pod_name: Option<String>,
    pub chaos_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
