//! In-memory store doubles for service tests. The product double enforces
//! the unique-name constraint atomically under its lock, which is exactly
//! the arbitration role the real storage layer plays.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use stockpile_core::store::{AuditLogStore, InsertOutcome, ProductStore};
use stockpile_core::{
    AuditLog, AuditLogFilter, AuditStatus, NewAuditLog, NewProduct, Product,
};

#[derive(Clone, Default)]
pub struct MemoryProductStore {
    inner: Arc<Mutex<ProductState>>,
}

#[derive(Default)]
struct ProductState {
    next_id: i64,
    rows: Vec<Product>,
    fail_next_insert: Option<String>,
}

impl MemoryProductStore {
    pub fn fail_next_insert(&self, message: &str) {
        self.lock().fail_next_insert = Some(message.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProductState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProductStore for MemoryProductStore {
    async fn insert(&self, input: NewProduct) -> anyhow::Result<InsertOutcome> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next_insert.take() {
            anyhow::bail!(message);
        }
        if state.rows.iter().any(|p| p.name == input.name) {
            return Ok(InsertOutcome::NameConflict);
        }
        state.next_id += 1;
        let product = Product {
            id: state.next_id,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
        };
        state.rows.push(product.clone());
        Ok(InsertOutcome::Created(product))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Product>> {
        Ok(self.lock().rows.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.lock().rows.iter().find(|p| p.name == name).cloned())
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.lock().rows.clone())
    }

    async fn search_by_name(&self, fragment: &str) -> anyhow::Result<Vec<Product>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn update(&self, product: Product) -> anyhow::Result<Product> {
        let mut state = self.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| anyhow::anyhow!("no product row with id {}", product.id))?;
        *row = product.clone();
        Ok(product)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        self.lock().rows.retain(|p| p.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let mut state = self.lock();
        let deleted = state.rows.len() as u64;
        state.rows.clear();
        Ok(deleted)
    }
}

#[derive(Clone, Default)]
pub struct MemoryAuditLogStore {
    inner: Arc<Mutex<AuditState>>,
}

#[derive(Default)]
struct AuditState {
    next_id: i64,
    rows: Vec<AuditLog>,
    fail_next_append: Option<String>,
}

impl MemoryAuditLogStore {
    pub fn fail_next_append(&self, message: &str) {
        self.lock().fail_next_append = Some(message.to_string());
    }

    pub fn seed(&self, input: NewAuditLog) {
        let mut state = self.lock();
        let row = materialize(&mut state, input);
        state.rows.push(row);
    }

    pub fn rows(&self) -> Vec<AuditLog> {
        self.lock().rows.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuditState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn materialize(state: &mut AuditState, input: NewAuditLog) -> AuditLog {
    state.next_id += 1;
    AuditLog {
        id: state.next_id,
        event_id: input.event_id,
        event_type: input.event_type,
        entity_type: input.entity_type,
        entity_id: input.entity_id,
        operation: input.operation,
        status: input.status,
        user_id: input.user_id,
        request_payload: input.request_payload,
        response_payload: input.response_payload,
        error_message: input.error_message,
        http_status_code: input.http_status_code,
        request_timestamp: input.request_timestamp,
        completion_timestamp: input.completion_timestamp,
        duration_ms: input.duration_ms,
        source_ip: input.source_ip,
        pod_name: input.pod_name,
        chaos_active: input.chaos_active,
        created_at: Utc::now(),
    }
}

impl AuditLogStore for MemoryAuditLogStore {
    async fn append(&self, input: NewAuditLog) -> anyhow::Result<AuditLog> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next_append.take() {
            anyhow::bail!(message);
        }
        let row = materialize(&mut state, input);
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn find_with_filters(&self, filter: AuditLogFilter) -> anyhow::Result<Vec<AuditLog>> {
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == Some(s)))
            .filter(|r| {
                filter
                    .operation
                    .is_none_or(|op| r.operation == op.to_string())
            })
            .filter(|r| filter.chaos_active.is_none_or(|c| r.chaos_active == c))
            .filter(|r| filter.start_time.is_none_or(|t| r.request_timestamp >= t))
            .filter(|r| filter.end_time.is_none_or(|t| r.request_timestamp <= t))
            .cloned()
            .collect())
    }

    async fn find_by_entity_id(&self, entity_id: i64) -> anyhow::Result<Vec<AuditLog>> {
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|r| r.entity_id == Some(entity_id))
            .cloned()
            .collect())
    }

    async fn find_failed(&self) -> anyhow::Result<Vec<AuditLog>> {
        let mut rows: Vec<AuditLog> = self
            .lock()
            .rows
            .iter()
            .filter(|r| r.status == Some(AuditStatus::Failed))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.request_timestamp.cmp(&a.request_timestamp));
        Ok(rows)
    }

    async fn count_by_status(&self, status: AuditStatus) -> anyhow::Result<u64> {
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|r| r.status == Some(status))
            .count() as u64)
    }

    async fn count_chaos_impacted(&self) -> anyhow::Result<u64> {
        Ok(self.lock().rows.iter().filter(|r| r.chaos_active).count() as u64)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut state = self.lock();
        let kept: Vec<AuditLog> = state
            .rows
            .iter()
            .filter(|r| r.request_timestamp >= before)
            .cloned()
            .collect();
        let deleted = (state.rows.len() - kept.len()) as u64;
        state.rows = kept;
        Ok(deleted)
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let mut state = self.lock();
        let deleted = state.rows.len() as u64;
        state.rows.clear();
        Ok(deleted)
    }
}

/// A trail row fixture for seeding query tests.
pub fn log_row(
    status: Option<AuditStatus>,
    chaos_active: bool,
    request_timestamp: DateTime<Utc>,
) -> NewAuditLog {
    NewAuditLog {
        event_id: uuid::Uuid::new_v4().to_string(),
        event_type: "ProductCreateSUCCEEDED".to_string(),
        entity_type: "Product".to_string(),
        entity_id: Some(1),
        operation: "CREATE".to_string(),
        status,
        user_id: None,
        request_payload: None,
        response_payload: None,
        error_message: None,
        http_status_code: None,
        request_timestamp,
        completion_timestamp: None,
        duration_ms: None,
        source_ip: None,
        pod_name: None,
        chaos_active,
    }
}

/// Poll `condition` until it holds or a short deadline passes.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within deadline");
}
