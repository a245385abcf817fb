use super::{
    cart_service::{CartLine, CartService},
    checkout_validator::{self, ClientCheckoutLine},
    order_service::{OrderDraft, OrderService, OrderView, ShippingAddress},
    payment_gateway::{AuthorizationRequest, PaymentAuthorizer},
    pricing_service::PricingEngine,
    user_locks::UserLocks,
};
use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};
use validator::Validate;

/// Data-store operations checkout depends on.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn snapshot(&self, user_id: i32) -> Result<Vec<CartLine>, ServiceError>;

    /// Must write the whole order or nothing.
    async fn materialize(&self, draft: OrderDraft) -> Result<OrderView, ServiceError>;

    async fn clear_cart(&self, user_id: i32) -> Result<u64, ServiceError>;
}

/// `CheckoutStore` backed by the cart and order services.
#[derive(Clone)]
pub struct SeaOrmCheckoutStore {
    carts: CartService,
    orders: OrderService,
}

impl SeaOrmCheckoutStore {
    pub fn new(carts: CartService, orders: OrderService) -> Self {
        Self { carts, orders }
    }
}

#[async_trait]
impl CheckoutStore for SeaOrmCheckoutStore {
    async fn snapshot(&self, user_id: i32) -> Result<Vec<CartLine>, ServiceError> {
        self.carts.snapshot(user_id).await
    }

    async fn materialize(&self, draft: OrderDraft) -> Result<OrderView, ServiceError> {
        self.orders.materialize(draft).await
    }

    async fn clear_cart(&self, user_id: i32) -> Result<u64, ServiceError> {
        self.carts.clear(user_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutRequest {
    pub cart_items: Vec<ClientCheckoutLine>,
    #[validate]
    pub address: ShippingAddress,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderView,
    pub client_secret: String,
    /// False when the order exists but the cart rows could not be removed.
    pub cart_cleared: bool,
}

/// Where a checkout is in its sequence; reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Validating,
    Pricing,
    Authorizing,
    Materializing,
    ClearingCart,
    Done,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStage::Validating => "validating",
            CheckoutStage::Pricing => "pricing",
            CheckoutStage::Authorizing => "authorizing",
            CheckoutStage::Materializing => "materializing",
            CheckoutStage::ClearingCart => "clearing_cart",
            CheckoutStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Turns a user's cart into an authorized payment and a pending order.
///
/// Sequence per user, under that user's lock: snapshot, validate, price,
/// authorize, materialize, clear cart. The sequence runs on its own task, so
/// a dropped request cannot cancel it halfway. Authorization is never retried
/// here; a timeout is reported as ambiguous so an operator can reconcile. A
/// failed write after authorization is reported with the authorization id. A
/// failed cart clear is logged and the checkout still succeeds.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    payments: Arc<dyn PaymentAuthorizer>,
    pricing: PricingEngine,
    locks: UserLocks,
    event_sender: Arc<EventSender>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn CheckoutStore>,
        payments: Arc<dyn PaymentAuthorizer>,
        pricing: PricingEngine,
        locks: UserLocks,
        event_sender: Arc<EventSender>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            payments,
            pricing,
            locks,
            event_sender,
            currency: currency.into(),
        }
    }

    #[instrument(skip(self, request), fields(lines = request.cart_items.len()))]
    pub async fn checkout(
        &self,
        user_id: i32,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        if let Err(e) = request.validate() {
            warn!(user_id, error = %e, "Checkout rejected: invalid request");
            counter!("storefront.checkout.failed", 1, "reason" => "invalid_input");
            return Err(e.into());
        }

        // Runs detached: once a payment is authorized, the order write, cart
        // clear and reconciliation logging finish even if the caller is dropped.
        let service = self.clone();
        let task = tokio::spawn(
            async move { service.run_locked(user_id, request).await }.in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    user_id,
                    error = %e,
                    reconciliation_required = true,
                    "Checkout task did not complete"
                );
                counter!("storefront.checkout.failed", 1, "reason" => "internal_error");
                Err(ServiceError::InternalError(format!(
                    "checkout task failed: {}",
                    e
                )))
            }
        }
    }

    async fn run_locked(
        &self,
        user_id: i32,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let result = self
            .locks
            .with_lock(user_id, || async move { self.run(user_id, request).await })
            .await;

        match &result {
            Ok(outcome) => {
                counter!("storefront.checkout.completed", 1);
                info!(
                    user_id,
                    order_id = %outcome.order.id,
                    total_cents = outcome.order.total_cents,
                    cart_cleared = outcome.cart_cleared,
                    "Checkout completed"
                );
            }
            Err((stage, err)) => {
                counter!("storefront.checkout.failed", 1, "reason" => err.code());
                match err {
                    ServiceError::OrderPersistenceFailed { .. }
                    | ServiceError::AuthorizationAmbiguous(_) => {}
                    _ => warn!(user_id, stage = %stage, error = %err, "Checkout failed"),
                }
            }
        }

        result.map_err(|(_, err)| err)
    }

    async fn run(
        &self,
        user_id: i32,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, (CheckoutStage, ServiceError)> {
        let stage = CheckoutStage::Validating;
        debug!(user_id, stage = %stage, "Checkout stage");
        let snapshot = self.store.snapshot(user_id).await.map_err(|e| (stage, e))?;
        let lines = checkout_validator::validate(user_id, &request.cart_items, snapshot)
            .map_err(|e| (stage, e))?;

        let stage = CheckoutStage::Pricing;
        debug!(user_id, stage = %stage, "Checkout stage");
        let pricing = self.pricing.price(&lines).map_err(|e| (stage, e))?;

        let stage = CheckoutStage::Authorizing;
        debug!(user_id, stage = %stage, amount_cents = pricing.total_cents, "Checkout stage");
        let authorization = self
            .payments
            .authorize(&AuthorizationRequest {
                amount_cents: pricing.total_cents,
                currency: self.currency.clone(),
                user_id,
            })
            .await
            .map_err(|e| {
                let err = ServiceError::from(e);
                if let ServiceError::AuthorizationAmbiguous(reason) = &err {
                    error!(
                        user_id,
                        amount_cents = pricing.total_cents,
                        reason = %reason,
                        reconciliation_required = true,
                        "Payment authorization outcome unknown; not retrying"
                    );
                }
                (stage, err)
            })?;

        self.event_sender
            .send_or_log(Event::PaymentAuthorized {
                user_id,
                authorization_id: authorization.id.clone(),
                amount_cents: authorization.amount_cents,
            })
            .await;

        let stage = CheckoutStage::Materializing;
        debug!(user_id, stage = %stage, "Checkout stage");
        let draft = OrderDraft {
            user_id,
            lines,
            pricing,
            address: request.address,
            currency: self.currency.clone(),
            payment_reference: authorization.id.clone(),
        };
        let order = match self.store.materialize(draft).await {
            Ok(order) => order,
            Err(e) => {
                error!(
                    user_id,
                    authorization_id = %authorization.id,
                    amount_cents = authorization.amount_cents,
                    error = %e,
                    reconciliation_required = true,
                    "Order write failed after payment authorization"
                );
                self.event_sender
                    .send_or_log(Event::OrderReconciliationRequired {
                        user_id,
                        authorization_id: authorization.id.clone(),
                        amount_cents: authorization.amount_cents,
                    })
                    .await;
                return Err((
                    stage,
                    ServiceError::OrderPersistenceFailed {
                        authorization_id: authorization.id,
                        reason: e.to_string(),
                    },
                ));
            }
        };

        let stage = CheckoutStage::ClearingCart;
        debug!(user_id, stage = %stage, order_id = %order.id, "Checkout stage");
        let cart_cleared = match self.store.clear_cart(user_id).await {
            Ok(_) => true,
            Err(e) => {
                let err = ServiceError::CartClearFailed(e.to_string());
                error!(user_id, order_id = %order.id, error = %err, "Cart not cleared after order");
                false
            }
        };

        debug!(user_id, stage = %CheckoutStage::Done, "Checkout stage");
        Ok(CheckoutOutcome {
            order,
            client_secret: authorization.client_secret,
            cart_cleared,
        })
    }
}
