use super::{money, user_locks::UserLocks};
use crate::{
    entities::commerce::{cart_item, product, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Authoritative cart line as read at checkout time.
///
/// `unit_price_cents` is the catalog price converted once, at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub cart_item_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub available_stock: i32,
}

/// Cart row as shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl TryFrom<&CartLine> for CartItemView {
    type Error = ServiceError;

    fn try_from(line: &CartLine) -> Result<Self, Self::Error> {
        Ok(Self {
            id: line.cart_item_id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            line_total_cents: money::line_total(line.unit_price_cents, line.quantity)
                .ok_or(ServiceError::PricingOverflow)?,
        })
    }
}

/// Shopping cart service: one row per (user, product), quantities always positive.
///
/// Mutations run under the same per-user lock as checkout.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    locks: UserLocks,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        locks: UserLocks,
    ) -> Self {
        Self {
            db,
            event_sender,
            locks,
        }
    }

    /// Lists the user's cart in insertion order.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i32) -> Result<Vec<CartItemView>, ServiceError> {
        self.snapshot(user_id)
            .await?
            .iter()
            .map(CartItemView::try_from)
            .collect()
    }

    /// Adds a product, merging into the existing row for the same product.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        ensure_positive(quantity)?;

        self.locks
            .with_lock(user_id, || async move {
                let product = self.find_product(product_id).await?;

                let existing = CartItem::find()
                    .filter(cart_item::Column::UserId.eq(user_id))
                    .filter(cart_item::Column::ProductId.eq(product_id))
                    .one(&*self.db)
                    .await?;

                let new_quantity = match &existing {
                    Some(row) => row.quantity.checked_add(quantity).ok_or_else(|| {
                        ServiceError::InvalidInput("quantity is too large".to_string())
                    })?,
                    None => quantity,
                };
                ensure_stock(&product, new_quantity)?;

                let saved = match existing {
                    Some(row) => {
                        let mut active: cart_item::ActiveModel = row.into();
                        active.quantity = Set(new_quantity);
                        active.update(&*self.db).await?
                    }
                    None => {
                        cart_item::ActiveModel {
                            user_id: Set(user_id),
                            product_id: Set(product_id),
                            quantity: Set(new_quantity),
                            added_at: Set(Utc::now()),
                            ..Default::default()
                        }
                        .insert(&*self.db)
                        .await?
                    }
                };

                self.event_sender
                    .send_or_log(Event::CartItemAdded {
                        user_id,
                        product_id,
                        quantity,
                    })
                    .await;

                info!(cart_item_id = saved.id, quantity = saved.quantity, "Cart item added");
                Ok(saved)
            })
            .await
    }

    /// Sets the quantity of one of the user's cart rows.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: i32,
        cart_item_id: i32,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        ensure_positive(quantity)?;

        self.locks
            .with_lock(user_id, || async move {
                let row = self.find_owned_item(user_id, cart_item_id).await?;
                let product = self.find_product(row.product_id).await?;
                ensure_stock(&product, quantity)?;

                let mut active: cart_item::ActiveModel = row.into();
                active.quantity = Set(quantity);
                let saved = active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::CartItemUpdated {
                        user_id,
                        cart_item_id,
                        quantity,
                    })
                    .await;

                Ok(saved)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: i32, cart_item_id: i32) -> Result<(), ServiceError> {
        self.locks
            .with_lock(user_id, || async move {
                let result = CartItem::delete_many()
                    .filter(cart_item::Column::Id.eq(cart_item_id))
                    .filter(cart_item::Column::UserId.eq(user_id))
                    .exec(&*self.db)
                    .await?;

                if result.rows_affected == 0 {
                    return Err(ServiceError::NotFound(format!(
                        "Cart item {} not found",
                        cart_item_id
                    )));
                }

                self.event_sender
                    .send_or_log(Event::CartItemRemoved {
                        user_id,
                        cart_item_id,
                    })
                    .await;

                Ok(())
            })
            .await
    }

    /// Reads the authoritative cart. Callers that need it consistent with a
    /// later write must hold the user's lock.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, user_id: i32) -> Result<Vec<CartLine>, ServiceError> {
        snapshot_with(&*self.db, user_id).await
    }

    /// Deletes every cart row for the user, returning how many went away.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: i32) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared { user_id })
            .await;

        Ok(result.rows_affected)
    }

    async fn find_product(&self, product_id: i32) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn find_owned_item(
        &self,
        user_id: i32,
        cart_item_id: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        CartItem::find_by_id(cart_item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", cart_item_id)))
    }
}

/// Loads cart rows joined with their products, ordered by row id.
pub async fn snapshot_with<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<CartLine>, ServiceError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::Id)
        .find_also_related(Product)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(item, product)| {
            let product = product.ok_or_else(|| {
                warn!(cart_item_id = item.id, "Cart row references a missing product");
                ServiceError::InternalError(format!(
                    "cart item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            let unit_price_cents = money::decimal_to_cents(product.price).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "product {} has an unusable price {}",
                    product.id, product.price
                ))
            })?;

            Ok(CartLine {
                cart_item_id: item.id,
                product_id: item.product_id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price_cents,
                available_stock: product.stock,
            })
        })
        .collect()
}

fn ensure_positive(quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        warn!(quantity, "Rejected non-positive cart quantity");
        return Err(ServiceError::InvalidInput(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn ensure_stock(product: &product::Model, quantity: i32) -> Result<(), ServiceError> {
    if quantity > product.stock {
        warn!(
            product_id = product.id,
            requested = quantity,
            available = product.stock,
            "Insufficient stock for cart"
        );
        return Err(ServiceError::InsufficientStock(format!(
            "only {} of '{}' available",
            product.stock.max(0),
            product.name
        )));
    }
    Ok(())
}
