use crate::handlers::common::{
    path_param, query_params, success_response, validate_input, MessageResponse,
};
use crate::{errors::ServiceError, services::commerce::ProductQuery, AppState};
use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

/// Creates the router for catalog endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

/// List products with optional search, price range and paging
async fn list_products(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let query = query_params(query)?;
    validate_input(&query)?;

    let page = state.services.products.list(query).await?;
    Ok(success_response(MessageResponse::new(
        "Products retrieved successfully",
        page,
    )))
}

/// Get product by ID
async fn get_product(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let product_id = path_param(id)?;
    let product = state.services.products.get(product_id).await?;
    Ok(success_response(MessageResponse::new(
        "Product retrieved successfully",
        json!({ "product": product }),
    )))
}
