pub mod carts;
pub mod checkout;
pub mod orders;
pub mod products;

pub use carts::carts_routes;
pub use checkout::checkout_routes;
pub use orders::{admin_order_routes, orders_routes};
pub use products::products_routes;
