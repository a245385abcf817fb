use crate::handlers::common::{json_body, path_param, success_response, UserQuery};
use crate::{
    entities::commerce::OrderStatus, errors::ServiceError, AppState,
};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order history endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
}

/// Creates the router for administrative order endpoints
pub fn admin_order_routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/orders/:id", patch(update_order_status))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// List the user's orders, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let orders = state.services.orders.list_for_user(user_id).await?;
    Ok(success_response(orders))
}

/// Get order by ID
async fn get_order(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ServiceError> {
    let order_id = path_param(id)?;
    let order = state.services.orders.get(order_id).await?;
    Ok(success_response(order))
}

/// Move an order to a new status
async fn update_order_status(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let order_id = path_param(id)?;
    let payload = json_body(body)?;

    let order = state
        .services
        .orders
        .update_status(order_id, payload.status)
        .await?;

    Ok(success_response(order))
}
