use crate::handlers::common::{
    json_body, no_content_response, path_param, success_response, validate_input,
    MessageResponse, UserQuery,
};
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(get_cart).post(add_to_cart))
        .route("/cart/:id", patch(update_cart_item).delete(remove_cart_item))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddItemRequest {
    #[validate(range(min = 1))]
    pub product_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItems<T> {
    cart_items: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleCartItem<T> {
    cart_item: T,
}

/// Get the user's cart
async fn get_cart(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let items = state.services.cart.get_cart(user_id).await?;

    Ok(success_response(MessageResponse::new(
        "Cart retrieved successfully",
        CartItems { cart_items: items },
    )))
}

/// Add a product, or raise its quantity if already present
async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let payload = json_body(body)?;
    validate_input(&payload)?;

    let item = state
        .services
        .cart
        .add_item(user_id, payload.product_id, payload.quantity)
        .await?;

    Ok(success_response(MessageResponse::new(
        "Product added to cart",
        SingleCartItem { cart_item: item },
    )))
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let cart_item_id = path_param(id)?;
    let payload = json_body(body)?;
    validate_input(&payload)?;

    let item = state
        .services
        .cart
        .update_item(user_id, cart_item_id, payload.quantity)
        .await?;

    Ok(success_response(MessageResponse::new(
        "Cart item updated",
        SingleCartItem { cart_item: item },
    )))
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let cart_item_id = path_param(id)?;

    state
        .services
        .cart
        .remove_item(user_id, cart_item_id)
        .await?;

    Ok(no_content_response())
}
