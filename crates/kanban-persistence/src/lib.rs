pub mod database;
pub mod store;
pub mod table;
pub mod tables;
pub mod traits;
pub mod unit_of_work;

pub use database::{Committed, Database};
pub use store::*;
pub use table::Table;
pub use tables::Tables;
pub use traits::*;
pub use unit_of_work::{Change, ChangeKind, Entity, UnitOfWork};
