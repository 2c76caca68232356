use caskade_common::CaskadeError;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Not unique on its own: several identity sources may know the same
    /// username.
    pub username: String,

    /// Name of the identity source this record belongs to.
    pub authenticator: String,

    pub locked_until: Option<DateTime<Utc>>,

    pub extra_attributes: serde_json::Value,

    pub created: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::LoginAttempt::Entity")]
    LoginAttempts,
    #[sea_orm(has_many = "super::TicketGrantingTicket::Entity")]
    TicketGrantingTickets,
    #[sea_orm(has_many = "super::TwoFactorAuthenticator::Entity")]
    TwoFactorAuthenticators,
}

impl Related<super::LoginAttempt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginAttempts.def()
    }
}

impl Related<super::TicketGrantingTicket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketGrantingTickets.def()
    }
}

impl Related<super::TwoFactorAuthenticator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TwoFactorAuthenticators.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Locked state is always recomputed from `locked_until`, never cached.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            Some(until) => until > now,
            None => false,
        }
    }

    pub async fn active_two_factor_authenticator<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Option<super::TwoFactorAuthenticator::Model>, CaskadeError> {
        Ok(self
            .find_related(super::TwoFactorAuthenticator::Entity)
            .filter(super::TwoFactorAuthenticator::Column::Active.eq(true))
            .one(db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn user(locked_until: Option<DateTime<Utc>>) -> Model {
        Model {
            id: Uuid::new_v4(),
            username: "alice".into(),
            authenticator: "static".into(),
            locked_until,
            extra_attributes: serde_json::json!({}),
            created: Utc::now(),
        }
    }

    #[test]
    fn locked_when_locked_until_is_in_the_future() {
        let now = Utc::now();
        assert!(user(Some(now + TimeDelta::hours(1))).is_locked(now));
    }

    #[test]
    fn not_locked_when_locked_until_is_in_the_past() {
        let now = Utc::now();
        assert!(!user(Some(now - TimeDelta::hours(1))).is_locked(now));
    }

    #[test]
    fn not_locked_when_locked_until_is_unset() {
        assert!(!user(None).is_locked(Utc::now()));
    }
}
