use super::{checkout_validator::ValidatedLines, pricing_service::PricingResult};
use crate::{
    entities::commerce::{order, order_item, product, Order, OrderItem, OrderStatus, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Delivery address captured on the order. Immutable once the order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 255))]
    pub line1: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

/// Everything needed to write an order once payment is authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: i32,
    pub lines: ValidatedLines,
    pub pricing: PricingResult,
    pub address: ShippingAddress,
    pub currency: String,
    pub payment_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub position: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub price_cents: i64,
}

impl From<order_item::Model> for OrderLineView {
    fn from(item: order_item::Model) -> Self {
        Self {
            position: item.position,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price_cents: item.price_cents,
        }
    }
}

/// Order header with its lines, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: i32,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub address: ShippingAddress,
    pub payment_reference: String,
    pub items: Vec<OrderLineView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    fn assemble(header: order::Model, mut items: Vec<order_item::Model>) -> Self {
        items.sort_by_key(|item| item.position);
        Self {
            id: header.id,
            user_id: header.user_id,
            status: header.status,
            subtotal_cents: header.subtotal_cents,
            shipping_cents: header.shipping_cents,
            tax_cents: header.tax_cents,
            total_cents: header.total_cents,
            currency: header.currency,
            address: ShippingAddress {
                line1: header.address_line1,
                line2: header.address_line2,
                city: header.city,
                state: header.state,
                postal_code: header.postal_code,
                country: header.country,
            },
            payment_reference: header.payment_reference,
            items: items.into_iter().map(OrderLineView::from).collect(),
            created_at: header.created_at,
            updated_at: header.updated_at,
        }
    }
}

/// Order creation, history and status changes.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Writes the header, its lines and the stock decrements in one transaction.
    ///
    /// Name and price are copied from the validated lines, never re-read from
    /// the catalog. Nothing is visible unless every row was written.
    #[instrument(skip(self, draft), fields(user_id = draft.user_id, lines = draft.lines.len()))]
    pub async fn materialize(&self, draft: OrderDraft) -> Result<OrderView, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let header = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(draft.user_id),
            subtotal_cents: Set(draft.pricing.subtotal_cents),
            shipping_cents: Set(draft.pricing.shipping_cents),
            tax_cents: Set(draft.pricing.tax_cents),
            total_cents: Set(draft.pricing.total_cents),
            currency: Set(draft.currency.clone()),
            status: Set(OrderStatus::Pending),
            address_line1: Set(draft.address.line1.clone()),
            address_line2: Set(draft.address.line2.clone()),
            city: Set(draft.address.city.clone()),
            state: Set(draft.address.state.clone()),
            postal_code: Set(draft.address.postal_code.clone()),
            country: Set(draft.address.country.clone()),
            payment_reference: Set(draft.payment_reference.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for (position, line) in draft.lines.iter().enumerate() {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                position: Set(position as i32),
                product_id: Set(line.product_id),
                product_name: Set(line.product_name.clone()),
                quantity: Set(line.quantity),
                price_cents: Set(line.unit_price_cents),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);

            let decremented = Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;

            if decremented.rows_affected != 1 {
                warn!(
                    product_id = line.product_id,
                    quantity = line.quantity,
                    "Stock ran out while writing order; rolling back"
                );
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(format!(
                    "'{}' sold out while the order was being placed",
                    line.product_name
                )));
            }
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                user_id: draft.user_id,
                total_cents: header.total_cents,
            })
            .await;

        info!(order_id = %order_id, total_cents = header.total_cents, "Order created");
        Ok(OrderView::assemble(header, items))
    }

    /// Orders for a user, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderView>, ServiceError> {
        let headers = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        for item in OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(ids))
            .all(&*self.db)
            .await?
        {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let items = items_by_order.remove(&header.id).unwrap_or_default();
                OrderView::assemble(header, items)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let header = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Position)
            .all(&*self.db)
            .await?;

        Ok(OrderView::assemble(header, items))
    }

    /// Moves an order along its lifecycle. The only mutation allowed after creation.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        let current = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !current.status.can_transition_to(next) {
            warn!(
                from = %current.status,
                to = %next,
                terminal = current.status.is_terminal(),
                "Rejected order status change"
            );
            return Err(ServiceError::InvalidStatusTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        // Guard on the status we read so concurrent changes cannot both win.
        let updated = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(next.as_str()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current.status))
            .exec(&*self.db)
            .await?;

        if updated.rows_affected != 1 {
            error!(order_id = %order_id, "Order status changed concurrently");
            return Err(ServiceError::InvalidStatusTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.status.to_string(),
                new_status: next.to_string(),
            })
            .await;

        self.get(order_id).await
    }
}
