use super::cart_service::CartLine;
use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One line of the cart as the client believes it to be. Never used for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientCheckoutLine {
    pub product_id: i32,
    pub quantity: i32,
}

/// Cart lines that matched the client's view and fit current stock.
///
/// Only [`validate`] can build one, so holding a `ValidatedLines` proves
/// the check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLines(Vec<CartLine>);

impl ValidatedLines {
    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CartLine] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ValidatedLines {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compares the client's cart description against the server snapshot.
///
/// Lines must agree position by position on product and quantity. An empty
/// snapshot is rejected before anything else.
pub fn validate(
    user_id: i32,
    client_lines: &[ClientCheckoutLine],
    snapshot: Vec<CartLine>,
) -> Result<ValidatedLines, ServiceError> {
    if snapshot.is_empty() {
        warn!(user_id, "Checkout rejected: cart is empty");
        return Err(ServiceError::EmptyCart);
    }

    if client_lines.len() != snapshot.len() {
        warn!(
            user_id,
            client_lines = client_lines.len(),
            cart_lines = snapshot.len(),
            "Checkout rejected: line count differs"
        );
        return Err(ServiceError::CartMismatch(format!(
            "expected {} items, got {}",
            snapshot.len(),
            client_lines.len()
        )));
    }

    for (position, (client, server)) in client_lines.iter().zip(&snapshot).enumerate() {
        if client.product_id != server.product_id || client.quantity != server.quantity {
            warn!(user_id, position, "Checkout rejected: line differs from cart");
            return Err(ServiceError::CartMismatch(format!(
                "item {} does not match the cart",
                position
            )));
        }
    }

    if let Some(short) = snapshot
        .iter()
        .find(|line| line.quantity > line.available_stock)
    {
        warn!(
            user_id,
            product_id = short.product_id,
            requested = short.quantity,
            available = short.available_stock,
            "Checkout rejected: insufficient stock"
        );
        return Err(ServiceError::InsufficientStock(format!(
            "only {} of '{}' available",
            short.available_stock.max(0),
            short.product_name
        )));
    }

    Ok(ValidatedLines(snapshot))
}
