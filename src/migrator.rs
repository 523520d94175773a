use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_events_table::Migration),
            Box::new(m20240101_000002_create_ticket_types_table::Migration),
            Box::new(m20240101_000003_create_profiles_table::Migration),
            Box::new(m20240101_000004_create_orders_table::Migration),
            Box::new(m20240101_000005_create_order_items_table::Migration),
            Box::new(m20240101_000006_create_tickets_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_events_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Events::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Events::Title).string().not_null())
                        .col(ColumnDef::new(Events::Description).text().not_null())
                        .col(ColumnDef::new(Events::Category).string().not_null())
                        .col(
                            ColumnDef::new(Events::EventDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Events::Location).string().not_null())
                        .col(ColumnDef::new(Events::ImageUrl).string().not_null())
                        .col(
                            ColumnDef::new(Events::BasePrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Events::TotalTickets).integer().not_null())
                        .col(
                            ColumnDef::new(Events::AvailableTickets)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_events_category")
                        .table(Events::Table)
                        .col(Events::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Events {
        Table,
        Id,
        Title,
        Description,
        Category,
        EventDate,
        Location,
        ImageUrl,
        BasePrice,
        TotalTickets,
        AvailableTickets,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_ticket_types_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_ticket_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TicketTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketTypes::EventId).uuid().not_null())
                        .col(ColumnDef::new(TicketTypes::Name).string().not_null())
                        .col(
                            ColumnDef::new(TicketTypes::BasePrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(TicketTypes::Capacity).integer().not_null())
                        .col(ColumnDef::new(TicketTypes::PriceRef).string().null())
                        .col(
                            ColumnDef::new(TicketTypes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_types_event_id")
                        .table(TicketTypes::Table)
                        .col(TicketTypes::EventId)
                        .to_owned(),
                )
                .await?;

            // Provider price references resolve checkout variant (b); one ref
            // maps to exactly one ticket type
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_types_price_ref")
                        .table(TicketTypes::Table)
                        .col(TicketTypes::PriceRef)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TicketTypes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum TicketTypes {
        Table,
        Id,
        EventId,
        Name,
        BasePrice,
        Capacity,
        PriceRef,
        CreatedAt,
    }
}

mod m20240101_000003_create_profiles_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_profiles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Profiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Profiles::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Profiles::DisplayName).string().not_null())
                        .col(ColumnDef::new(Profiles::Email).string().not_null())
                        .col(
                            ColumnDef::new(Profiles::ProfileCategory)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Profiles::VerificationStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Profiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Profiles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_profiles_email")
                        .table(Profiles::Table)
                        .col(Profiles::Email)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Profiles::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Profiles {
        Table,
        Id,
        DisplayName,
        Email,
        ProfileCategory,
        VerificationStatus,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::ProfileId).uuid().null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CheckoutSessionId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Version).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // One order per provider session; the store-level half of the
            // webhook idempotency guarantee
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_checkout_session_id")
                        .table(Orders::Table)
                        .col(Orders::CheckoutSessionId)
                        .unique()
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

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        ProfileId,
        CustomerEmail,
        CheckoutSessionId,
        Status,
        TotalAmount,
        Currency,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240101_000005_create_order_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::TicketTypeId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        TicketTypeId,
        Name,
        UnitPrice,
        Quantity,
    }
}

mod m20240101_000006_create_tickets_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_tickets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tickets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tickets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tickets::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::EventId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::TicketTypeId).uuid().null())
                        .col(ColumnDef::new(Tickets::QrToken).string().not_null())
                        .col(ColumnDef::new(Tickets::HolderName).string().not_null())
                        .col(ColumnDef::new(Tickets::HolderEmail).string().not_null())
                        .col(
                            ColumnDef::new(Tickets::FinalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Tickets::Status).string().not_null())
                        .col(
                            ColumnDef::new(Tickets::CheckoutSessionId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::IssuedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::RedeemedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_qr_token")
                        .table(Tickets::Table)
                        .col(Tickets::QrToken)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_checkout_session_id")
                        .table(Tickets::Table)
                        .col(Tickets::CheckoutSessionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_order_id")
                        .table(Tickets::Table)
                        .col(Tickets::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tickets::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Tickets {
        Table,
        Id,
        OrderId,
        EventId,
        TicketTypeId,
        QrToken,
        HolderName,
        HolderEmail,
        FinalPrice,
        Status,
        CheckoutSessionId,
        IssuedAt,
        RedeemedAt,
    }
}
