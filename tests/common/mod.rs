#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::commerce::{product, Product},
    events::{self, EventSender},
    services::commerce::{
        AuthorizationError, AuthorizationRequest, CartService, OrderService, PaymentAuthorization,
        PaymentAuthorizer, UserLocks,
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

/// Fresh in-memory SQLite with the schema applied. One connection keeps
/// the database alive for the pool's lifetime.
pub async fn memory_db() -> Arc<DatabaseConnection> {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("in-memory sqlite");
    db::run_migrations(&pool).await.expect("migrations");
    Arc::new(pool)
}

pub fn event_sender() -> (Arc<EventSender>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(256);
    let task = tokio::spawn(events::process_events(rx));
    (Arc::new(EventSender::new(tx)), task)
}

pub async fn seed_product(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
    stock: i32,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(format!("{} for tests", name)),
        price: Set(price),
        stock: Set(stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed product")
}

pub async fn set_product(db: &DatabaseConnection, id: i32, name: &str, price: Decimal, stock: i32) {
    let existing = Product::find_by_id(id)
        .one(db)
        .await
        .expect("load product")
        .expect("product exists");
    let mut active: product::ActiveModel = existing.into();
    active.name = Set(name.to_string());
    active.price = Set(price);
    active.stock = Set(stock);
    active.update(db).await.expect("update product");
}

/// Authorizer that always succeeds and remembers what it was asked.
#[derive(Default)]
pub struct RecordingAuthorizer {
    calls: Mutex<Vec<AuthorizationRequest>>,
}

impl RecordingAuthorizer {
    pub fn calls(&self) -> Vec<AuthorizationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentAuthorizer for RecordingAuthorizer {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<PaymentAuthorization, AuthorizationError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(request.clone());
        let id = format!("pi_test_{}", calls.len());
        Ok(PaymentAuthorization {
            client_secret: format!("{}_secret", id),
            id,
            amount_cents: request.amount_cents,
            currency: request.currency.clone(),
        })
    }
}

/// Services over one in-memory database, without HTTP.
pub struct TestServices {
    pub db: Arc<DatabaseConnection>,
    pub cart: CartService,
    pub orders: OrderService,
    pub locks: UserLocks,
    pub events: Arc<EventSender>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestServices {
    pub async fn new() -> Self {
        let db = memory_db().await;
        let (events, task) = event_sender();
        let locks = UserLocks::new();
        Self {
            cart: CartService::new(db.clone(), events.clone(), locks.clone()),
            orders: OrderService::new(db.clone(), events.clone()),
            db,
            locks,
            events,
            _event_task: task,
        }
    }
}

impl Drop for TestServices {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Helper harness for driving the router with in-memory SQLite.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    pub payments: Arc<RecordingAuthorizer>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = memory_db().await;
        let (tx, rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(rx));
        let payments = Arc::new(RecordingAuthorizer::default());

        let state = Arc::new(AppState::new(
            db,
            test_config(),
            EventSender::new(tx),
            payments.clone(),
        ));

        Self {
            router: storefront_api::app_router(state.clone()),
            state,
            payments,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
