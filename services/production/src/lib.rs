//! Bomforge production service
//!
//! Maintains the flattened tree cache of bill of material structures and the
//! version lineage of BOM copies.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use bomforge_database::Stores;
use bomforge_utils::AppConfig;

pub mod handlers;
pub mod routes;
pub mod service;
pub mod tree;
pub mod version;

pub use service::BillOfMaterialService;

#[derive(Clone)]
pub struct AppState {
    pub service: BillOfMaterialService,
}

pub fn create_app(stores: Stores, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::create_api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout_seconds)))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
                )
                .layer(DefaultBodyLimit::max(config.server.max_request_size)),
        )
        .with_state(AppState {
            service: BillOfMaterialService::new(stores, config.tree.clone()),
        })
}
