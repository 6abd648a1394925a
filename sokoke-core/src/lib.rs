pub mod config;
pub mod database;
pub mod logging;

pub use config::{ConfigError, ConfigValue, FromConfigValue, SokokeConfig};
pub use database::{BackendFamily, DatabaseSettings, Persistence};
pub use logging::init_tracing;
