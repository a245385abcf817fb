//! Storefront API library
//!
//! Cart management, checkout with payment authorization, and order tracking.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use services::commerce::{
    CartService, CheckoutService, OrderService, PaymentAuthorizer, PricingEngine,
    PricingPolicy, ProductService, SeaOrmCheckoutStore, UserLocks,
};
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service around one connection pool and one lock registry.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        payments: Arc<dyn PaymentAuthorizer>,
    ) -> Self {
        let sender = Arc::new(event_sender.clone());
        let locks = UserLocks::new();

        let products = ProductService::new(db.clone());
        let cart = CartService::new(db.clone(), sender.clone(), locks.clone());
        let orders = OrderService::new(db.clone(), sender.clone());
        let store = Arc::new(SeaOrmCheckoutStore::new(cart.clone(), orders.clone()));
        let checkout = CheckoutService::new(
            store,
            payments,
            PricingEngine::new(PricingPolicy::from(&config)),
            locks,
            sender,
            config.currency.clone(),
        );

        Self {
            db,
            config,
            event_sender,
            services: handlers::AppServices {
                products: Arc::new(products),
                cart: Arc::new(cart),
                orders: Arc::new(orders),
                checkout: Arc::new(checkout),
            },
        }
    }
}

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(handlers::commerce::products_routes())
        .merge(handlers::commerce::carts_routes())
        .merge(handlers::commerce::checkout_routes())
        .merge(handlers::commerce::orders_routes())
        .merge(handlers::commerce::admin_order_routes())
}

/// Full application router with tracing and timeout layers.
pub fn app_router(state: Arc<AppState>) -> Router {
    let request_timeout = state.config.request_timeout();
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let db_healthy = db::check_connection(&state.db).await.is_ok();
    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": if db_healthy { "healthy" } else { "unhealthy" },
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status, Json(body)).into_response()
}
