use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use caskade_common::{CaskadeConfig, Clock, SystemClock};
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tracing::warn;

use crate::attempts::LoginAttemptRecorder;
use crate::db::connect_to_db;
use crate::lockout::LockoutService;
use crate::providers::ServiceAccessPolicy;
use crate::sessions::SessionService;
use crate::tickets::TicketStore;

#[derive(Clone)]
pub struct Services {
    pub db: Arc<Mutex<DatabaseConnection>>,
    pub config: Arc<Mutex<CaskadeConfig>>,
    pub clock: Arc<dyn Clock>,
    pub tickets: Arc<TicketStore>,
    pub login_attempts: Arc<LoginAttemptRecorder>,
    pub lockout: Arc<LockoutService>,
    pub sessions: Arc<SessionService>,
}

impl Services {
    pub async fn new(
        config: CaskadeConfig,
        service_access: Arc<dyn ServiceAccessPolicy>,
    ) -> Result<Self> {
        Self::new_with_clock(config, service_access, Arc::new(SystemClock)).await
    }

    pub async fn new_with_clock(
        config: CaskadeConfig,
        service_access: Arc<dyn ServiceAccessPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let db = connect_to_db(&config).await?;
        let db = Arc::new(Mutex::new(db));

        let tickets = Arc::new(TicketStore::new(
            db.clone(),
            config.store.ticket_granting_ticket.clone(),
            config.store.service_ticket.clone(),
            clock.clone(),
        ));
        let login_attempts = Arc::new(LoginAttemptRecorder::new(db.clone(), clock.clone()));
        let lockout = Arc::new(LockoutService::new(
            db.clone(),
            config.store.login_attempts.clone(),
            clock.clone(),
        ));
        let sessions = Arc::new(SessionService::new(
            db.clone(),
            tickets.clone(),
            login_attempts.clone(),
            lockout.clone(),
            service_access,
            config.store.login_attempts.clone(),
        ));

        // Hourly housekeeping: expired tickets and attempt rows past
        // retention. Validity never depends on it; expiry is lazy at lookup.
        tokio::spawn({
            let tickets = tickets.clone();
            let login_attempts = login_attempts.clone();
            let retention = config.store.log.retention;
            async move {
                let mut interval = tokio::time::interval(Duration::from_secs(3600));
                loop {
                    interval.tick().await;
                    if let Err(error) = tickets.cleanup_expired().await {
                        warn!(%error, "Ticket cleanup failed");
                    }
                    if let Err(error) = login_attempts.cleanup_old_attempts(retention).await {
                        warn!(%error, "Login attempt cleanup failed");
                    }
                }
            }
        });

        Ok(Self {
            db,
            config: Arc::new(Mutex::new(config)),
            clock,
            tickets,
            login_attempts,
            lockout,
            sessions,
        })
    }
}
