pub mod db;
pub mod query;
pub mod schema;
pub mod write;

pub use db::{Store, StoreWriter};
pub use query::AttributeDefinition;
