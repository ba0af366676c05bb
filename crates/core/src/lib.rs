pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod store;

pub use error::{Result, XesError};
pub use handler::LogHandler;
pub use store::{RowStore, Sequence};
