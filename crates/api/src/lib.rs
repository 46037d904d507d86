//! Submission API — validates notification requests, enqueues jobs, and
//! serves the persisted notification history.

pub mod routes;
pub mod state;
