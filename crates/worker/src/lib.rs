//! Worker pool — consumes jobs from the durable queue, persists notification
//! records, and publishes events on the broadcast channel.

pub mod handler;
pub mod runner;
