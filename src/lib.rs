//! Mobile-data bundle storefront
//!
//! Sells data plans for the supported networks, takes payment through
//! Paystack and settles orders only after server-side verification.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::services::GatewayHandle;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub gateway: GatewayHandle,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the state, resolving the gateway client from configuration.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let gateway = GatewayHandle::from_config(&config.paystack);
        Self::with_gateway(db, config, gateway)
    }

    pub fn with_gateway(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        gateway: GatewayHandle,
    ) -> Self {
        let services =
            handlers::AppServices::new(db.clone(), gateway.clone(), &config.paystack.currency);
        Self {
            db,
            config,
            gateway,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Storefront routes, without state
pub fn storefront_routes() -> Router<AppState> {
    use handlers::{checkout, orders, payments, storefront};

    Router::new()
        .route("/", get(storefront::dashboard))
        .route("/buy", get(storefront::buy))
        .route("/buy/:network", get(storefront::buy_network))
        .route(
            "/checkout/:network/:plan",
            get(storefront::checkout_form).post(checkout::submit_checkout),
        )
        .route(handlers::common::CALLBACK_PATH, get(payments::paystack_callback))
        .route("/order/:order_id", get(orders::receipt))
}

/// Full application router with tracing and request-id layers applied
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(storefront_routes())
        .route("/health", get(handlers::health::health_check))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
