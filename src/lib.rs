pub mod classifier;
pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod observability;
pub mod parser;
pub mod storage;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
