mod core;
mod database;
mod gateway;
mod janitor;

pub use core::Config;
pub use database::DatabaseConfig;
pub use gateway::GatewayConfig;
pub use janitor::JanitorConfig;
