use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "service_tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub ticket: String,

    pub ticket_granting_ticket_id: Uuid,

    /// Normalized target service URL
    pub service: String,

    /// Service tickets are single-use
    pub consumed: bool,

    pub created: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::TicketGrantingTicket::Entity",
        from = "Column::TicketGrantingTicketId",
        to = "super::TicketGrantingTicket::Column::Id",
        on_delete = "Cascade"
    )]
    TicketGrantingTicket,
}

impl Related<super::TicketGrantingTicket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketGrantingTicket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
