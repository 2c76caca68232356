use std::sync::Arc;

use caskade_common::helpers::rng::get_crypto_rng;
use caskade_common::{CaskadeError, Clock, ServiceTicketConfig, TicketGrantingTicketConfig};
use caskade_db_entities::{ServiceTicket, TicketGrantingTicket, User};
use data_encoding::HEXLOWER;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::consts::{SERVICE_TICKET_PREFIX, TICKET_GRANTING_TICKET_PREFIX};
use crate::helpers::to_chrono_duration;
use crate::SessionContext;

#[derive(Clone, Debug, Default)]
pub struct TicketOptions {
    pub long_term: bool,
}

#[derive(Clone, Debug)]
pub struct CleanupStats {
    pub expired_ticket_granting_tickets: u64,
    pub expired_service_tickets: u64,
}

/// 256 bits from a CSPRNG; global uniqueness is additionally backed by the
/// unique column constraint.
pub fn generate_ticket(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        HEXLOWER.encode(&get_crypto_rng().gen::<[u8; 32]>())
    )
}

pub struct TicketStore {
    db: Arc<Mutex<DatabaseConnection>>,
    tgt_config: TicketGrantingTicketConfig,
    st_config: ServiceTicketConfig,
    clock: Arc<dyn Clock>,
}

impl TicketStore {
    pub fn new(
        db: Arc<Mutex<DatabaseConnection>>,
        tgt_config: TicketGrantingTicketConfig,
        st_config: ServiceTicketConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            tgt_config,
            st_config,
            clock,
        }
    }

    pub async fn mint_ticket_granting_ticket(
        &self,
        user: &User::Model,
        ctx: &SessionContext,
        options: &TicketOptions,
    ) -> Result<TicketGrantingTicket::Model, CaskadeError> {
        let db = self.db.lock().await;
        let awaiting_two_factor = user
            .active_two_factor_authenticator(&*db)
            .await?
            .is_some();
        let tgt = TicketGrantingTicket::ActiveModel {
            id: Set(Uuid::new_v4()),
            ticket: Set(generate_ticket(TICKET_GRANTING_TICKET_PREFIX)),
            user_id: Set(user.id),
            user_agent: Set(ctx.user_agent.clone()),
            remote_ip: Set(ctx.remote_ip.clone()),
            long_term: Set(options.long_term),
            awaiting_two_factor_authentication: Set(awaiting_two_factor),
            created: Set(self.clock.now()),
        }
        .insert(&*db)
        .await?;
        info!(
            username = %user.username,
            long_term = options.long_term,
            awaiting_two_factor,
            "Issued ticket granting ticket"
        );
        Ok(tgt)
    }

    /// The sole session read path. A missing, revoked, expired or
    /// fingerprint-mismatched ticket all come back as `None`; callers must
    /// not be able to tell which.
    pub async fn find_valid_ticket_granting_ticket(
        &self,
        ticket: &str,
        user_agent: &str,
    ) -> Result<Option<TicketGrantingTicket::Model>, CaskadeError> {
        let db = self.db.lock().await;
        let Some(tgt) = TicketGrantingTicket::Entity::find()
            .filter(TicketGrantingTicket::Column::Ticket.eq(ticket))
            .one(&*db)
            .await?
        else {
            debug!("Ticket granting ticket not found");
            return Ok(None);
        };
        if tgt.user_agent != user_agent {
            debug!(id = %tgt.id, "Ticket granting ticket fingerprint mismatch");
            return Ok(None);
        }
        let expires_at = tgt.expires_at(
            to_chrono_duration(self.tgt_config.lifetime),
            to_chrono_duration(self.tgt_config.lifetime_long_term),
        );
        if expires_at <= self.clock.now() {
            debug!(id = %tgt.id, "Ticket granting ticket expired");
            return Ok(None);
        }
        Ok(Some(tgt))
    }

    /// Idempotent: revoking an unknown or mismatched ticket is a no-op.
    pub async fn revoke_ticket_granting_ticket(
        &self,
        ticket: &str,
        user_agent: &str,
    ) -> Result<(), CaskadeError> {
        let db = self.db.lock().await;
        let result = TicketGrantingTicket::Entity::delete_many()
            .filter(TicketGrantingTicket::Column::Ticket.eq(ticket))
            .filter(TicketGrantingTicket::Column::UserAgent.eq(user_agent))
            .exec(&*db)
            .await?;
        if result.rows_affected > 0 {
            info!("Revoked ticket granting ticket");
        }
        Ok(())
    }

    pub async fn complete_second_factor(
        &self,
        tgt: TicketGrantingTicket::Model,
    ) -> Result<TicketGrantingTicket::Model, CaskadeError> {
        let db = self.db.lock().await;
        let tgt = TicketGrantingTicket::ActiveModel {
            id: Set(tgt.id),
            awaiting_two_factor_authentication: Set(false),
            ..Default::default()
        }
        .update(&*db)
        .await?;
        info!(id = %tgt.id, "Second factor confirmed for ticket granting ticket");
        Ok(tgt)
    }

    pub async fn mint_service_ticket(
        &self,
        tgt: &TicketGrantingTicket::Model,
        service: &str,
    ) -> Result<ServiceTicket::Model, CaskadeError> {
        let url = Url::parse(service)?;
        let db = self.db.lock().await;
        let st = ServiceTicket::ActiveModel {
            id: Set(Uuid::new_v4()),
            ticket: Set(generate_ticket(SERVICE_TICKET_PREFIX)),
            ticket_granting_ticket_id: Set(tgt.id),
            service: Set(url.to_string()),
            consumed: Set(false),
            created: Set(self.clock.now()),
        }
        .insert(&*db)
        .await?;
        info!(service = %st.service, "Issued service ticket");
        Ok(st)
    }

    /// Single-use claim: only the first call for a ticket returns it.
    pub async fn consume_service_ticket(
        &self,
        ticket: &str,
    ) -> Result<Option<ServiceTicket::Model>, CaskadeError> {
        let db = self.db.lock().await;
        let txn = db.begin().await?;
        let Some(st) = ServiceTicket::Entity::find()
            .filter(ServiceTicket::Column::Ticket.eq(ticket))
            .one(&txn)
            .await?
        else {
            debug!("Service ticket not found");
            return Ok(None);
        };
        if st.consumed {
            debug!(id = %st.id, "Service ticket already consumed");
            return Ok(None);
        }
        if st.created + to_chrono_duration(self.st_config.lifetime_unconsumed) <= self.clock.now()
        {
            debug!(id = %st.id, "Service ticket expired");
            return Ok(None);
        }
        let st = ServiceTicket::ActiveModel {
            id: Set(st.id),
            consumed: Set(true),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        txn.commit().await?;
        Ok(Some(st))
    }

    /// Redirect target for the CAS client: the service URL with the ticket
    /// appended as a query parameter.
    pub fn service_url_with_ticket(
        &self,
        st: &ServiceTicket::Model,
    ) -> Result<String, CaskadeError> {
        let mut url = Url::parse(&st.service)?;
        url.query_pairs_mut().append_pair("ticket", &st.ticket);
        Ok(url.to_string())
    }

    /// Expiry is lazy at lookup time; this housekeeping pass only reclaims
    /// storage.
    pub async fn cleanup_expired(&self) -> Result<CleanupStats, CaskadeError> {
        let db = self.db.lock().await;
        let now = self.clock.now();

        let expired_tgts = TicketGrantingTicket::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(TicketGrantingTicket::Column::LongTerm.eq(false))
                            .add(
                                TicketGrantingTicket::Column::Created
                                    .lt(now - to_chrono_duration(self.tgt_config.lifetime)),
                            ),
                    )
                    .add(
                        Condition::all()
                            .add(TicketGrantingTicket::Column::LongTerm.eq(true))
                            .add(TicketGrantingTicket::Column::Created.lt(
                                now - to_chrono_duration(self.tgt_config.lifetime_long_term),
                            )),
                    ),
            )
            .exec(&*db)
            .await?;

        let expired_sts = ServiceTicket::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(ServiceTicket::Column::Consumed.eq(false))
                            .add(
                                ServiceTicket::Column::Created.lt(
                                    now - to_chrono_duration(self.st_config.lifetime_unconsumed),
                                ),
                            ),
                    )
                    .add(
                        Condition::all()
                            .add(ServiceTicket::Column::Consumed.eq(true))
                            .add(
                                ServiceTicket::Column::Created.lt(
                                    now - to_chrono_duration(self.st_config.lifetime_consumed),
                                ),
                            ),
                    ),
            )
            .exec(&*db)
            .await?;

        let stats = CleanupStats {
            expired_ticket_granting_tickets: expired_tgts.rows_affected,
            expired_service_tickets: expired_sts.rows_affected,
        };
        if stats.expired_ticket_granting_tickets > 0 || stats.expired_service_tickets > 0 {
            info!(
                ticket_granting_tickets = stats.expired_ticket_granting_tickets,
                service_tickets = stats.expired_service_tickets,
                "Ticket cleanup completed"
            );
        }
        Ok(stats)
    }
}
