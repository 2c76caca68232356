use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use caskade_common::Clock;
use caskade_db_entities::{TwoFactorAuthenticator, User};
use caskade_db_migrations::migrate_database;
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::SessionContext;

pub struct TestClock {
    now: StdMutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn test_clock() -> Arc<TestClock> {
    Arc::new(TestClock {
        now: StdMutex::new(Utc::now()),
    })
}

pub fn test_context() -> SessionContext {
    SessionContext {
        user_agent: "TestBrowser/1.0".into(),
        remote_ip: "10.0.0.1".into(),
    }
}

pub async fn test_db() -> Arc<Mutex<DatabaseConnection>> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1);
    let db = Database::connect(opt).await.unwrap();
    migrate_database(&db).await.unwrap();
    Arc::new(Mutex::new(db))
}

pub async fn make_user(
    db: &Arc<Mutex<DatabaseConnection>>,
    username: &str,
    authenticator: &str,
) -> User::Model {
    let conn = db.lock().await;
    User::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_owned()),
        authenticator: Set(authenticator.to_owned()),
        locked_until: Set(None),
        extra_attributes: Set(serde_json::json!({})),
        created: Set(Utc::now()),
    }
    .insert(&*conn)
    .await
    .unwrap()
}

pub async fn enroll_second_factor(db: &Arc<Mutex<DatabaseConnection>>, user: &User::Model) {
    let conn = db.lock().await;
    TwoFactorAuthenticator::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        secret: Set("otp-secret".to_owned()),
        active: Set(true),
        created: Set(Utc::now()),
    }
    .insert(&*conn)
    .await
    .unwrap();
}
