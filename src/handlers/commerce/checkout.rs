use crate::handlers::common::{json_body, success_response, UserQuery};
use crate::{errors::ServiceError, services::commerce::CheckoutRequest, AppState};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Json, Query, State},
    response::Response,
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/checkout", post(checkout))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub client_secret: String,
}

/// Checks out the user's cart and returns the payment client secret
async fn checkout(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let user_id = UserQuery::from_request(query)?;
    let request = json_body(body)?;

    let outcome = state.services.checkout.checkout(user_id, request).await?;

    Ok(success_response(CheckoutResponse {
        message: "Payment intent created",
        client_secret: outcome.client_secret,
    }))
}
