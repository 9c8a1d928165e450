//! CRM backend surface — in-memory store and the REST API over customers,
//! orders, campaigns, delivery logs and the AI helpers.

pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

pub use handlers::{ApiError, CrmState};
pub use router::crm_router;
pub use store::CrmStore;
