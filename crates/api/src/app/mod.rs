//! HTTP application wiring (Axum routers + service wiring).
//!
//! - `services.rs`: infrastructure wiring (stores, broker, dispatcher, worker)
//! - `routes/`: HTTP routes + handlers (one file per service area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{CatalogServices, InventoryServices};

/// Router of the catalog service.
pub fn build_catalog_app(services: Arc<CatalogServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::catalog::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(services)),
        )
}

/// Router of the inventory service.
pub fn build_inventory_app(services: Arc<InventoryServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::inventory::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(services)),
        )
}
