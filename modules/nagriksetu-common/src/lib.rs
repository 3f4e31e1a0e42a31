pub mod config;
pub mod geo;
pub mod types;

pub use config::{Config, DatabaseConfig, LogFormat, StoreBackend};
pub use geo::*;
pub use types::*;
