use stockpile_db::{PgAuditLogStore, PgProductStore};

use crate::audit::Auditor;
use crate::audit_logs::AuditLogService;
use crate::products::ProductService;

#[derive(Clone)]
pub struct AppState {
    pub products: ProductService<PgProductStore>,
    pub audit_logs: AuditLogService<PgAuditLogStore>,
    pub auditor: Auditor,
}
