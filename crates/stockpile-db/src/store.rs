//! sea-orm backed implementations of the core storage ports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use stockpile_core::store::{AuditLogStore, InsertOutcome, ProductStore};
use stockpile_core::{AuditLog, AuditLogFilter, AuditStatus, NewAuditLog, NewProduct, Product};

use crate::entities::{audit_logs, products};

#[derive(Clone)]
pub struct PgProductStore {
    db: Arc<DatabaseConnection>,
}

impl PgProductStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl ProductStore for PgProductStore {
    async fn insert(&self, input: NewProduct) -> anyhow::Result<InsertOutcome> {
        let model = products::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            quantity: Set(input.quantity),
            ..Default::default()
        };
        // The unique index on name arbitrates concurrent creates; a
        // violation is reported structurally, not as an error.
        match model.insert(&*self.db).await {
            Ok(row) => Ok(InsertOutcome::Created(to_product(row))),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertOutcome::NameConflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let row = products::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(row.map(to_product))
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Product>> {
        let row = products::Entity::find()
            .filter(products::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        Ok(row.map(to_product))
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Product>> {
        let rows = products::Entity::find().all(&*self.db).await?;
        Ok(rows.into_iter().map(to_product).collect())
    }

    async fn search_by_name(&self, fragment: &str) -> anyhow::Result<Vec<Product>> {
        let pattern = format!("%{}%", fragment.to_lowercase());
        let rows = products::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col((
                    products::Entity,
                    products::Column::Name,
                ))))
                .like(pattern),
            )
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(to_product).collect())
    }

    async fn update(&self, product: Product) -> anyhow::Result<Product> {
        let model = products::ActiveModel {
            id: Set(product.id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            quantity: Set(product.quantity),
        };
        let row = model.update(&*self.db).await?;
        Ok(to_product(row))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        products::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let res = products::Entity::delete_many().exec(&*self.db).await?;
        Ok(res.rows_affected)
    }
}

fn to_product(row: products::Model) -> Product {
    Product {
        id: row.id,
        name: row.name,
        description: row.description,
        price: row.price,
        quantity: row.quantity,
    }
}

#[derive(Clone)]
pub struct PgAuditLogStore {
    db: Arc<DatabaseConnection>,
}

impl PgAuditLogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl AuditLogStore for PgAuditLogStore {
    async fn append(&self, input: NewAuditLog) -> anyhow::Result<AuditLog> {
        let model = audit_logs::ActiveModel {
            event_id: Set(input.event_id),
            event_type: Set(input.event_type),
            entity_type: Set(input.entity_type),
            entity_id: Set(input.entity_id),
            operation: Set(input.operation),
            status: Set(input.status.map(|s| s.to_string())),
            user_id: Set(input.user_id),
            request_payload: Set(input.request_payload),
            response_payload: Set(input.response_payload),
            error_message: Set(input.error_message),
            http_status_code: Set(input.http_status_code),
            request_timestamp: Set(input.request_timestamp.into()),
            completion_timestamp: Set(input.completion_timestamp.map(Into::into)),
            duration_ms: Set(input.duration_ms),
            source_ip: Set(input.source_ip),
            pod_name: Set(input.pod_name),
            chaos_active: Set(input.chaos_active),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let row = model.insert(&*self.db).await?;
        Ok(to_audit_log(row))
    }

    async fn find_with_filters(&self, filter: AuditLogFilter) -> anyhow::Result<Vec<AuditLog>> {
        let mut query = audit_logs::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(audit_logs::Column::Status.eq(status.to_string()));
        }
        if let Some(operation) = filter.operation {
            query = query.filter(audit_logs::Column::Operation.eq(operation.to_string()));
        }
        if let Some(chaos_active) = filter.chaos_active {
            query = query.filter(audit_logs::Column::ChaosActive.eq(chaos_active));
        }
        if let Some(start) = filter.start_time {
            let start: sea_orm::entity::prelude::DateTimeWithTimeZone = start.into();
            query = query.filter(audit_logs::Column::RequestTimestamp.gte(start));
        }
        if let Some(end) = filter.end_time {
            let end: sea_orm::entity::prelude::DateTimeWithTimeZone = end.into();
            query = query.filter(audit_logs::Column::RequestTimestamp.lte(end));
        }
        let rows = query.all(&*self.db).await?;
        Ok(rows.into_iter().map(to_audit_log).collect())
    }

    async fn find_by_entity_id(&self, entity_id: i64) -> anyhow::Result<Vec<AuditLog>> {
        let rows = audit_logs::Entity::find()
            .filter(audit_logs::Column::EntityId.eq(entity_id))
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(to_audit_log).collect())
    }

    async fn find_failed(&self) -> anyhow::Result<Vec<AuditLog>> {
        let rows = audit_logs::Entity::find()
            .filter(audit_logs::Column::Status.eq(AuditStatus::Failed.to_string()))
            .order_by_desc(audit_logs::Column::RequestTimestamp)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(to_audit_log).collect())
    }

    async fn count_by_status(&self, status: AuditStatus) -> anyhow::Result<u64> {
        let count = audit_logs::Entity::find()
            .filter(audit_logs::Column::Status.eq(status.to_string()))
            .count(&*self.db)
            .await?;
        Ok(count)
    }

    async fn count_chaos_impacted(&self) -> anyhow::Result<u64> {
        let count = audit_logs::Entity::find()
            .filter(audit_logs::Column::ChaosActive.eq(true))
            .count(&*self.db)
            .await?;
        Ok(count)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> anyhow::Result<u64> {
        let before: sea_orm::entity::prelude::DateTimeWithTimeZone = before.into();
        let res = audit_logs::Entity::delete_many()
            .filter(audit_logs::Column::RequestTimestamp.lt(before))
            .exec(&*self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let res = audit_logs::Entity::delete_many().exec(&*self.db).await?;
        Ok(res.rows_affected)
    }
}

fn to_audit_log(row: audit_logs::Model) -> AuditLog {
    AuditLog {
        id: row.id,
        event_id: row.event_id,
        event_type: row.event_type,
        entity_type: row.entity_type,
        entity_id: row.entity_id,
        operation: row.operation,
        status: row.status.as_deref().and_then(|s| s.parse().ok()),
        user_id: row.user_id,
        request_payload: row.request_payload,
        response_payload: row.response_payload,
        error_message: row.error_message,
        http_status_code: row.http_status_code,
        request_timestamp: row.request_timestamp.with_timezone(&Utc),
        completion_timestamp: row.completion_timestamp.map(|t| t.with_timezone(&Utc)),
        duration_ms: row.duration_ms,
        source_ip: row.source_ip,
        pod_name: row.pod_name,
        chaos_active: row.chaos_active,
        created_at: row.created_at.with_timezone(&Utc),
    }
}
