use std::sync::Arc;

use caskade_common::{CaskadeError, Clock, LoginAttemptsConfig};
use caskade_db_entities::{LoginAttempt, User};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::attempts::record_login_attempt;
use crate::helpers::to_chrono_duration;
use crate::SessionContext;

/// All identity-source records sharing a username, as an explicit repository
/// query.
pub async fn find_all_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Vec<User::Model>, CaskadeError> {
    Ok(User::Entity::find()
        .filter(User::Column::Username.eq(username))
        .all(conn)
        .await?)
}

pub struct LockoutService {
    db: Arc<Mutex<DatabaseConnection>>,
    config: LoginAttemptsConfig,
    clock: Arc<dyn Clock>,
}

impl LockoutService {
    pub fn new(
        db: Arc<Mutex<DatabaseConnection>>,
        config: LoginAttemptsConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, config, clock }
    }

    /// A username counts as locked only when every identity source that
    /// knows it is individually locked. A user locked under one source may
    /// still authenticate under another, and an unknown username fails open.
    pub async fn is_locked(&self, username: &str) -> Result<bool, CaskadeError> {
        let users = {
            let db = self.db.lock().await;
            find_all_by_username(&*db, username).await?
        };
        if users.is_empty() {
            return Ok(false);
        }
        let now = self.clock.now();
        Ok(users.iter().all(|user| user.is_locked(now)))
    }

    /// True iff the user has at least `max` attempts and the `max` most
    /// recent ones all failed. `max <= 0` disables lockouts.
    pub async fn max_failed_logins_reached<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &User::Model,
        max: i32,
    ) -> Result<bool, CaskadeError> {
        if max <= 0 {
            return Ok(false);
        }
        let recent = LoginAttempt::Entity::find()
            .filter(LoginAttempt::Column::UserId.eq(user.id))
            .order_by_desc(LoginAttempt::Column::Created)
            .limit(max as u64)
            .all(conn)
            .await?;
        Ok(recent.len() == max as usize && recent.iter().all(|attempt| attempt.failed()))
    }

    /// Appends the failed attempt and evaluates the trailing window in one
    /// transaction, so two concurrent failures for the same user cannot both
    /// observe "not yet locked" and skip the lock.
    pub async fn record_failure_and_maybe_lock(
        &self,
        user: &User::Model,
        ctx: &SessionContext,
    ) -> Result<(), CaskadeError> {
        let db = self.db.lock().await;
        let txn = db.begin().await?;
        let now = self.clock.now();

        record_login_attempt(&txn, now, user, false, ctx).await?;

        let max = self.config.max_failed_login_attempts;
        if self.max_failed_logins_reached(&txn, user, max).await? {
            let locked_until = now + to_chrono_duration(self.config.lock_timeout);
            User::ActiveModel {
                id: Set(user.id),
                locked_until: Set(Some(locked_until)),
                ..Default::default()
            }
            .update(&txn)
            .await?;
            info!(
                username = %user.username,
                authenticator = %user.authenticator,
                %locked_until,
                "Account locked after too many failed login attempts"
            );
        }

        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::test_support::*;

    async fn record_attempts(
        service: &LockoutService,
        recorder: &crate::LoginAttemptRecorder,
        clock: &Arc<TestClock>,
        user: &User::Model,
        outcomes: &[bool],
    ) {
        for successful in outcomes {
            clock.advance(TimeDelta::seconds(1));
            if *successful {
                recorder.record(user, true, &test_context()).await;
            } else {
                service
                    .record_failure_and_maybe_lock(user, &test_context())
                    .await
                    .unwrap();
            }
        }
    }

    fn lockout_config(max: i32) -> LoginAttemptsConfig {
        LoginAttemptsConfig {
            max_failed_login_attempts: max,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_username_fails_open() {
        let db = test_db().await;
        let service = LockoutService::new(db, lockout_config(3), test_clock());
        assert!(!service.is_locked("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn no_attempts_never_reaches_threshold() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(2), clock);

        let conn = db.lock().await;
        assert!(!service
            .max_failed_logins_reached(&*conn, &user, 2)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn threshold_disabled_when_max_is_not_positive() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(0), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        record_attempts(&service, &recorder, &clock, &user, &[false; 5]).await;

        let conn = db.lock().await;
        assert!(!service
            .max_failed_logins_reached(&*conn, &user, 0)
            .await
            .unwrap());
        assert!(!service
            .max_failed_logins_reached(&*conn, &user, -1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn locks_after_unbroken_run_of_failures() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(3), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        record_attempts(&service, &recorder, &clock, &user, &[false, false]).await;
        assert!(!service.is_locked("alice").await.unwrap());

        record_attempts(&service, &recorder, &clock, &user, &[false]).await;
        assert!(service.is_locked("alice").await.unwrap());
    }

    #[tokio::test]
    async fn intervening_success_resets_the_window() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(3), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        record_attempts(
            &service,
            &recorder,
            &clock,
            &user,
            &[false, false, true, false, false],
        )
        .await;

        assert!(!service.is_locked("alice").await.unwrap());
        let conn = db.lock().await;
        assert!(!service
            .max_failed_logins_reached(&*conn, &user, 3)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn fewer_attempts_than_window_cannot_lock() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(5), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        record_attempts(&service, &recorder, &clock, &user, &[false, false, false]).await;
        assert!(!service.is_locked("alice").await.unwrap());
    }

    #[tokio::test]
    async fn lock_expires_once_locked_until_passes() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let service = LockoutService::new(db.clone(), lockout_config(2), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        record_attempts(&service, &recorder, &clock, &user, &[false, false]).await;
        assert!(service.is_locked("alice").await.unwrap());

        clock.advance(TimeDelta::hours(1));
        assert!(!service.is_locked("alice").await.unwrap());
    }

    #[tokio::test]
    async fn lockout_requires_unanimity_across_identity_sources() {
        let db = test_db().await;
        let clock = test_clock();
        let legacy = make_user(&db, "alice", "legacy").await;
        let _ldap = make_user(&db, "alice", "ldap").await;
        let service = LockoutService::new(db.clone(), lockout_config(2), clock.clone());
        let recorder = crate::LoginAttemptRecorder::new(db.clone(), clock.clone());

        // Lock only the legacy record; the ldap one can still sign in.
        record_attempts(&service, &recorder, &clock, &legacy, &[false, false]).await;
        assert!(!service.is_locked("alice").await.unwrap());
    }
}
