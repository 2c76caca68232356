use std::sync::Arc;

use caskade_common::{CaskadeError, Clock};
use caskade_db_entities::{LoginAttempt, User};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::helpers::to_chrono_duration;
use crate::SessionContext;

pub struct LoginAttemptRecorder {
    db: Arc<Mutex<DatabaseConnection>>,
    clock: Arc<dyn Clock>,
}

impl LoginAttemptRecorder {
    pub fn new(db: Arc<Mutex<DatabaseConnection>>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Appends an immutable attempt row. A persistence failure here is
    /// reported but must not lose an authentication outcome that has already
    /// been decided, so the error is logged and swallowed.
    pub async fn record(
        &self,
        user: &User::Model,
        successful: bool,
        ctx: &SessionContext,
    ) -> Option<LoginAttempt::Model> {
        let db = self.db.lock().await;
        match record_login_attempt(&*db, self.clock.now(), user, successful, ctx).await {
            Ok(attempt) => Some(attempt),
            Err(error) => {
                warn!(%error, username = %user.username, "Failed to record login attempt");
                None
            }
        }
    }

    pub async fn cleanup_old_attempts(
        &self,
        retention: std::time::Duration,
    ) -> Result<u64, CaskadeError> {
        let db = self.db.lock().await;
        let cutoff = self.clock.now() - to_chrono_duration(retention);
        let result = LoginAttempt::Entity::delete_many()
            .filter(LoginAttempt::Column::Created.lt(cutoff))
            .exec(&*db)
            .await?;
        if result.rows_affected > 0 {
            debug!(
                removed = result.rows_affected,
                "Removed login attempts past retention"
            );
        }
        Ok(result.rows_affected)
    }
}

pub(crate) async fn record_login_attempt<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
    user: &User::Model,
    successful: bool,
    ctx: &SessionContext,
) -> Result<LoginAttempt::Model, CaskadeError> {
    Ok(LoginAttempt::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        successful: Set(successful),
        remote_ip: Set(ctx.remote_ip.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        created: Set(now),
    }
    .insert(conn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn record_persists_an_attempt_row() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let recorder = LoginAttemptRecorder::new(db.clone(), clock);

        let attempt = recorder
            .record(&user, true, &test_context())
            .await
            .expect("attempt should be recorded");
        assert!(attempt.successful);
        assert!(!attempt.failed());
        assert_eq!(attempt.user_id, user.id);

        let conn = db.lock().await;
        let stored = LoginAttempt::Entity::find().all(&*conn).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_agent, test_context().user_agent);
    }

    #[tokio::test]
    async fn cleanup_removes_only_rows_past_retention() {
        let db = test_db().await;
        let clock = test_clock();
        let user = make_user(&db, "alice", "static").await;
        let recorder = LoginAttemptRecorder::new(db.clone(), clock.clone());

        recorder.record(&user, false, &test_context()).await;
        clock.advance(chrono::TimeDelta::days(10));
        recorder.record(&user, false, &test_context()).await;

        let removed = recorder
            .cleanup_old_attempts(std::time::Duration::from_secs(60 * 60 * 24 * 7))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
