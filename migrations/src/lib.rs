pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_products_table;
mod m20240601_000002_create_cart_items_table;
mod m20240601_000003_create_orders_table;
mod m20240601_000004_create_order_items_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_products_table::Migration),
            Box::new(m20240601_000002_create_cart_items_table::Migration),
            Box::new(m20240601_000003_create_orders_table::Migration),
            Box::new(m20240601_000004_create_order_items_table::Migration),
        ]
    }
}
