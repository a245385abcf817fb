use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Amounts are stored in integer minor units; no decimal money columns on orders.
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::UserId).integer().not_null())
                    .col(ColumnDef::new(Orders::SubtotalCents).big_integer().not_null())
                    .col(ColumnDef::new(Orders::ShippingCents).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TaxCents).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalCents).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::AddressLine1).string().not_null())
                    .col(ColumnDef::new(Orders::AddressLine2).string().null())
                    .col(ColumnDef::new(Orders::City).string().not_null())
                    .col(ColumnDef::new(Orders::State).string().not_null())
                    .col(ColumnDef::new(Orders::PostalCode).string().not_null())
                    .col(ColumnDef::new(Orders::Country).string().not_null())
                    .col(ColumnDef::new(Orders::PaymentReference).string().not_null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    SubtotalCents,
    ShippingCents,
    TaxCents,
    TotalCents,
    Currency,
    Status,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Country,
    PaymentReference,
    CreatedAt,
    UpdatedAt,
}
