use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use super::m00003_create_ticket_granting_ticket::ticket_granting_ticket as TicketGrantingTicket;

pub mod service_ticket {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;
    use sea_orm::sea_query::ForeignKeyAction;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "service_tickets")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub ticket: String,
        pub ticket_granting_ticket_id: Uuid,
        pub service: String,
        pub consumed: bool,
        pub created: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter)]
    pub enum Relation {
        TicketGrantingTicket,
    }

    impl RelationTrait for Relation {
        fn def(&self) -> RelationDef {
            match self {
                Self::TicketGrantingTicket => {
                    Entity::belongs_to(super::TicketGrantingTicket::Entity)
                        .from(Column::TicketGrantingTicketId)
                        .to(super::TicketGrantingTicket::Column::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .into()
                }
            }
        }
    }

    impl Related<super::TicketGrantingTicket::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::TicketGrantingTicket.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m00004_create_service_ticket"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let builder = manager.get_database_backend();
        let schema = Schema::new(builder);

        manager
            .create_table(schema.create_table_from_entity(service_ticket::Entity))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(service_ticket::Entity).to_owned())
            .await
    }
}
