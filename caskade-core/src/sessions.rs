use std::sync::Arc;

use caskade_common::{CaskadeError, LoginAttemptsConfig};
use caskade_db_entities::{ServiceTicket, TicketGrantingTicket, User};
use sea_orm::{DatabaseConnection, EntityTrait};
use tokio::sync::Mutex;
use tracing::warn;
use url::Url;

use crate::attempts::LoginAttemptRecorder;
use crate::lockout::{find_all_by_username, LockoutService};
use crate::providers::{AuthenticationResult, ServiceAccessPolicy};
use crate::tickets::{TicketOptions, TicketStore};

/// Client identity for one request, threaded explicitly through the session
/// path instead of living in ambient request state.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub user_agent: String,
    pub remote_ip: String,
}

#[derive(Clone, Debug, Default)]
pub struct SignInOptions {
    pub long_term: bool,
    pub service: Option<String>,
}

#[derive(Clone, Debug)]
pub enum SignInOutcome {
    /// Primary factor verified; the session stays unusable until the second
    /// factor is confirmed.
    AwaitingSecondFactor {
        ticket_granting_ticket: TicketGrantingTicket::Model,
    },
    Established {
        ticket_granting_ticket: TicketGrantingTicket::Model,
    },
    ServiceTicketIssued {
        ticket_granting_ticket: TicketGrantingTicket::Model,
        service_ticket: ServiceTicket::Model,
        redirect_url: String,
    },
}

impl SignInOutcome {
    pub fn ticket_granting_ticket(&self) -> &TicketGrantingTicket::Model {
        match self {
            Self::AwaitingSecondFactor {
                ticket_granting_ticket,
            }
            | Self::Established {
                ticket_granting_ticket,
            }
            | Self::ServiceTicketIssued {
                ticket_granting_ticket,
                ..
            } => ticket_granting_ticket,
        }
    }
}

pub struct SessionService {
    db: Arc<Mutex<DatabaseConnection>>,
    tickets: Arc<TicketStore>,
    login_attempts: Arc<LoginAttemptRecorder>,
    lockout: Arc<LockoutService>,
    service_access: Arc<dyn ServiceAccessPolicy>,
    config: LoginAttemptsConfig,
}

impl SessionService {
    pub fn new(
        db: Arc<Mutex<DatabaseConnection>>,
        tickets: Arc<TicketStore>,
        login_attempts: Arc<LoginAttemptRecorder>,
        lockout: Arc<LockoutService>,
        service_access: Arc<dyn ServiceAccessPolicy>,
        config: LoginAttemptsConfig,
    ) -> Self {
        Self {
            db,
            tickets,
            login_attempts,
            lockout,
            service_access,
            config,
        }
    }

    pub async fn sign_in(
        &self,
        auth: AuthenticationResult,
        ctx: &SessionContext,
        options: SignInOptions,
    ) -> Result<SignInOutcome, CaskadeError> {
        let AuthenticationResult::Accepted { user } = auth else {
            return Err(CaskadeError::InconsistentState);
        };
        if self.lockout.is_locked(&user.username).await? {
            return Err(CaskadeError::AccountLocked(user.username.clone()));
        }

        let tgt = self
            .tickets
            .mint_ticket_granting_ticket(
                &user,
                ctx,
                &TicketOptions {
                    long_term: options.long_term,
                },
            )
            .await?;
        self.login_attempts.record(&user, true, ctx).await;

        if tgt.awaiting_two_factor_authentication {
            return Ok(SignInOutcome::AwaitingSecondFactor {
                ticket_granting_ticket: tgt,
            });
        }

        self.issue_service_ticket_if_requested(tgt, options.service.as_deref())
            .await
    }

    async fn issue_service_ticket_if_requested(
        &self,
        tgt: TicketGrantingTicket::Model,
        service: Option<&str>,
    ) -> Result<SignInOutcome, CaskadeError> {
        let Some(service) = service else {
            return Ok(SignInOutcome::Established {
                ticket_granting_ticket: tgt,
            });
        };

        // A malformed service target degrades to a plain session instead of
        // failing the sign-in.
        let url = match Url::parse(service) {
            Ok(url) => url,
            Err(error) => {
                warn!(%error, service, "Service URL not valid");
                return Ok(SignInOutcome::Established {
                    ticket_granting_ticket: tgt,
                });
            }
        };

        if !self.service_access.allowed(&url).await? {
            return Err(CaskadeError::ServiceNotAllowed(service.to_owned()));
        }

        let service_ticket = self.tickets.mint_service_ticket(&tgt, url.as_str()).await?;
        let redirect_url = self.tickets.service_url_with_ticket(&service_ticket)?;
        Ok(SignInOutcome::ServiceTicketIssued {
            ticket_granting_ticket: tgt,
            service_ticket,
            redirect_url,
        })
    }

    /// Always succeeds, whether or not the ticket existed.
    pub async fn sign_out(&self, ticket: &str, ctx: &SessionContext) -> Result<(), CaskadeError> {
        self.tickets
            .revoke_ticket_granting_ticket(ticket, &ctx.user_agent)
            .await
    }

    /// Records a failure and re-evaluates lockout independently for every
    /// identity source that knows this username.
    pub async fn handle_failed_login(
        &self,
        username: &str,
        ctx: &SessionContext,
    ) -> Result<(), CaskadeError> {
        let users = {
            let db = self.db.lock().await;
            find_all_by_username(&*db, username).await?
        };
        for user in users {
            self.lockout.record_failure_and_maybe_lock(&user, ctx).await?;
        }
        Ok(())
    }

    /// Whether a failed OTP check feeds the lockout window is a configured
    /// policy, off by default.
    pub async fn handle_failed_second_factor(
        &self,
        tgt: &TicketGrantingTicket::Model,
        ctx: &SessionContext,
    ) -> Result<(), CaskadeError> {
        if !self.config.count_second_factor_failures {
            return Ok(());
        }
        let user = {
            let db = self.db.lock().await;
            User::Entity::find_by_id(tgt.user_id).one(&*db).await?
        }
        .ok_or(CaskadeError::InconsistentState)?;
        self.lockout.record_failure_and_maybe_lock(&user, ctx).await
    }

    /// The actual OTP verification is external; this only clears the flag.
    pub async fn confirm_second_factor(
        &self,
        tgt: TicketGrantingTicket::Model,
    ) -> Result<TicketGrantingTicket::Model, CaskadeError> {
        self.tickets.complete_second_factor(tgt).await
    }

    /// Session lookup for a presented handle. Sessions still awaiting their
    /// second factor resolve to no user.
    pub async fn current_user(
        &self,
        ticket: &str,
        ctx: &SessionContext,
    ) -> Result<Option<User::Model>, CaskadeError> {
        let Some(tgt) = self
            .tickets
            .find_valid_ticket_granting_ticket(ticket, &ctx.user_agent)
            .await?
        else {
            return Ok(None);
        };
        if tgt.awaiting_two_factor_authentication {
            return Ok(None);
        }
        let db = self.db.lock().await;
        Ok(User::Entity::find_by_id(tgt.user_id).one(&*db).await?)
    }
}
