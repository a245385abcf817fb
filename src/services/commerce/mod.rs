/// Storefront services: catalog, cart, checkout and orders
pub mod cart_service;
pub mod checkout_service;
pub mod checkout_validator;
pub mod money;
pub mod order_service;
pub mod payment_gateway;
pub mod pricing_service;
pub mod product_service;
pub mod user_locks;

// Re-export services for convenience
pub use cart_service::{CartItemView, CartLine, CartService};
pub use checkout_service::{
    CheckoutOutcome, CheckoutRequest, CheckoutService, CheckoutStage, CheckoutStore,
    SeaOrmCheckoutStore,
};
pub use checkout_validator::{ClientCheckoutLine, ValidatedLines};
pub use order_service::{OrderDraft, OrderLineView, OrderService, OrderView, ShippingAddress};
pub use payment_gateway::{
    AuthorizationError, AuthorizationRequest, PaymentAuthorization, PaymentAuthorizer,
    StripePaymentAuthorizer,
};
pub use pricing_service::{PricingEngine, PricingPolicy, PricingResult};
pub use product_service::{ProductPage, ProductQuery, ProductService, ProductView};
pub use user_locks::UserLocks;
