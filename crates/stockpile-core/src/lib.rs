pub mod audit;
pub mod error;
pub mod product;
pub mod store;

pub use audit::{
    AuditEvent, AuditLog, AuditLogFilter, AuditStatus, ChaosStats, NewAuditLog, Operation,
};
pub use error::ProductError;
pub use product::{NewProduct, Product};
pub use store::{AuditLogStore, InsertOutcome, ProductStore};
