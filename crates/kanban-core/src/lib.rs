pub mod audit;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use audit::{AuditInfo, AuditStamper, Removal};
pub use config::AppConfig;
pub use error::KanbanError;
pub use result::KanbanResult;
pub use traits::Record;
