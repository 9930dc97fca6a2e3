//! HTTP API: the catalog and inventory services (routing, wiring, startup).

pub mod app;
pub mod middleware;
pub mod server;
