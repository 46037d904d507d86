//! Gateway — terminates client WebSocket connections, subscribes to the
//! broadcast channel, and forwards matching events to registered connections.

pub mod registry;
pub mod routes;
pub mod state;
pub mod subscriber;
pub mod ws;
