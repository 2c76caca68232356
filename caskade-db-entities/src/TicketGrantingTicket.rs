use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "ticket_granting_tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque unguessable ticket value, the caller-visible session handle
    #[sea_orm(unique)]
    pub ticket: String,

    pub user_id: Uuid,

    /// User agent captured at creation; presented tickets must match it
    /// exactly
    pub user_agent: String,

    /// Remote IP address at creation, kept for auditing
    pub remote_ip: String,

    /// "Remember me" sessions get the long-term lifetime
    pub long_term: bool,

    pub awaiting_two_factor_authentication: bool,

    pub created: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::User::Entity",
        from = "Column::UserId",
        to = "super::User::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::ServiceTicket::Entity")]
    ServiceTickets,
}

impl Related<super::User::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::ServiceTicket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceTickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Expiry is evaluated lazily at lookup time against the lifetime class
    /// of the ticket.
    pub fn expires_at(&self, lifetime: TimeDelta, lifetime_long_term: TimeDelta) -> DateTime<Utc> {
        self.created
            + if self.long_term {
                lifetime_long_term
            } else {
                lifetime
            }
    }
}
