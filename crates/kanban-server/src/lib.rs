pub mod api;
pub mod error;
pub mod extract;
pub mod files;
pub mod hub;
pub mod identity;
pub mod notifier;
pub mod server;
pub mod service;
pub mod ws;

pub use api::{AppState, SharedState};
pub use error::{ApiError, ApiResult};
pub use files::{FileContent, FileStorage, LocalFileStorage};
pub use hub::BoardHub;
pub use identity::Identity;
pub use notifier::{ChangeNotifier, NoopNotifier};
pub use server::{build_router, build_state, serve};
pub use service::KanbanService;
