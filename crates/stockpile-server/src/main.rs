use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use stockpile_bus::AuditBus;
use stockpile_db::{PgAuditLogStore, PgProductStore};
use stockpile_server::audit::Auditor;
use stockpile_server::audit_logs::AuditLogService;
use stockpile_server::config::Config;
use stockpile_server::consumer::AuditConsumer;
use stockpile_server::products::ProductService;
use stockpile_server::routes;
use stockpile_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let db = stockpile_db::connect(&config.database_url).await?;

    // Apply migrations on boot (idempotent).
    stockpile_migration::Migrator::up(&db, None).await?;
    let db = Arc::new(db);

    let bus = AuditBus::new(config.bus_partitions, config.bus_capacity);

    // The consumer group must exist before the first request publishes;
    // events emitted into an unsubscribed topic are dropped.
    AuditConsumer::new(PgAuditLogStore::new(db.clone())).spawn(&bus);

    let state = AppState {
        products: ProductService::new(PgProductStore::new(db.clone())),
        audit_logs: AuditLogService::new(PgAuditLogStore::new(db.clone())),
        auditor: Auditor::new(bus, config.pod_name.clone(), config.chaos_active),
    };

    let app = routes::router(state);
    tracing::info!(addr = %config.bind_addr, "stockpile HTTP listening");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
