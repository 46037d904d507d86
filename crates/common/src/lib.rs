//! Shared building blocks for the Courier pipeline: configuration, database
//! and Redis pools, the common error type, domain types, payload validation,
//! and the broadcast channel wire format.

pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod payload;
pub mod redis_pool;
pub mod types;
