use super::money;
use crate::{
    entities::commerce::{product, Product},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 8;
const MAX_PAGE_SIZE: u64 = 100;

/// Catalog entry as shown to the shopper, priced in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i32,
}

impl TryFrom<product::Model> for ProductView {
    type Error = ServiceError;

    fn try_from(model: product::Model) -> Result<Self, Self::Error> {
        let price_cents = money::decimal_to_cents(model.price).ok_or_else(|| {
            ServiceError::InternalError(format!("product {} has an invalid price", model.id))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price_cents,
            stock: model.stock,
        })
    }
}

/// Catalog filters. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[validate(length(max = 100))]
    pub search: Option<String>,
    #[validate(range(min = 0))]
    pub min_price_cents: Option<i64>,
    #[validate(range(min = 0))]
    pub max_price_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
}

/// One page of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total_items: u64,
}

/// Read-only access to the product catalog.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists products matching `query`, ordered by id.
    #[instrument(skip(self))]
    pub async fn list(&self, query: ProductQuery) -> Result<ProductPage, ServiceError> {
        let mut select = Product::find();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                product::Column::Name
                    .contains(search)
                    .or(product::Column::Description.contains(search)),
            );
        }
        if let Some(min) = query.min_price_cents {
            select = select.filter(product::Column::Price.gte(Decimal::new(min, 2)));
        }
        if let Some(max) = query.max_price_cents {
            select = select.filter(product::Column::Price.lte(Decimal::new(max, 2)));
        }

        let total_items = select.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1);
        let offset = (page - 1).saturating_mul(limit);

        let products = select
            .order_by_asc(product::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(ProductView::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(total_items, page, returned = products.len(), "Listed products");

        Ok(ProductPage {
            products,
            total_pages: total_items.div_ceil(limit),
            current_page: page,
            total_items,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: i32) -> Result<ProductView, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
            .and_then(ProductView::try_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn view_prices_in_cents() {
        let now = Utc::now();
        let view = ProductView::try_from(product::Model {
            id: 3,
            name: "Kettle".into(),
            description: "Stovetop".into(),
            price: dec!(24.50),
            stock: 4,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
        assert_eq!(view.price_cents, 2450);
        assert_eq!(view.stock, 4);
    }

    #[test]
    fn zero_page_is_rejected() {
        let query = ProductQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(query.validate().is_err());
        assert!(ProductQuery::default().validate().is_ok());
    }
}
