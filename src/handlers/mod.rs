pub mod commerce;
pub mod common;

use crate::services::commerce::{CartService, CheckoutService, OrderService, ProductService};
use std::sync::Arc;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
}
