mod defaults;

use std::path::PathBuf;
use std::time::Duration;

use defaults::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Secret;

#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
pub struct TicketGrantingTicketConfig {
    #[serde(default = "_default_tgt_lifetime", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub lifetime: Duration,

    /// Lifetime for "remember me" sessions.
    #[serde(default = "_default_tgt_lifetime_long_term", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub lifetime_long_term: Duration,
}

impl Default for TicketGrantingTicketConfig {
    fn default() -> Self {
        Self {
            lifetime: _default_tgt_lifetime(),
            lifetime_long_term: _default_tgt_lifetime_long_term(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
pub struct ServiceTicketConfig {
    /// How long an issued service ticket stays valid until consumed.
    #[serde(default = "_default_st_lifetime_unconsumed", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub lifetime_unconsumed: Duration,

    /// How long consumed tickets are retained before cleanup.
    #[serde(default = "_default_st_lifetime_consumed", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub lifetime_consumed: Duration,
}

impl Default for ServiceTicketConfig {
    fn default() -> Self {
        Self {
            lifetime_unconsumed: _default_st_lifetime_unconsumed(),
            lifetime_consumed: _default_st_lifetime_consumed(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
pub struct LoginAttemptsConfig {
    /// Number of most recent attempts that must all fail to trigger a
    /// lockout. Zero or negative disables lockouts entirely.
    #[serde(default = "_default_max_failed_login_attempts")]
    pub max_failed_login_attempts: i32,

    #[serde(default = "_default_lock_timeout", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub lock_timeout: Duration,

    /// Whether failed second-factor checks feed the lockout window.
    #[serde(default = "_default_false")]
    pub count_second_factor_failures: bool,
}

impl Default for LoginAttemptsConfig {
    fn default() -> Self {
        Self {
            max_failed_login_attempts: _default_max_failed_login_attempts(),
            lock_timeout: _default_lock_timeout(),
            count_second_factor_failures: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
pub struct LogConfig {
    #[serde(default = "_default_retention", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub retention: Duration,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            retention: _default_retention(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
pub struct CaskadeConfigStore {
    #[serde(default = "_default_database_url")]
    #[schemars(with = "String")]
    pub database_url: Secret<String>,

    #[serde(default)]
    pub ticket_granting_ticket: TicketGrantingTicketConfig,

    #[serde(default)]
    pub service_ticket: ServiceTicketConfig,

    #[serde(default)]
    pub login_attempts: LoginAttemptsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for CaskadeConfigStore {
    fn default() -> Self {
        Self {
            database_url: _default_database_url(),
            ticket_granting_ticket: <_>::default(),
            service_ticket: <_>::default(),
            login_attempts: <_>::default(),
            log: <_>::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaskadeConfig {
    pub store: CaskadeConfigStore,
    pub paths_relative_to: PathBuf,
}

impl Default for CaskadeConfig {
    fn default() -> Self {
        Self {
            store: <_>::default(),
            paths_relative_to: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let store: CaskadeConfigStore = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(store.ticket_granting_ticket.lifetime, Duration::from_secs(86400));
        assert_eq!(
            store.ticket_granting_ticket.lifetime_long_term,
            Duration::from_secs(864000)
        );
        assert_eq!(store.login_attempts.max_failed_login_attempts, 5);
        assert!(!store.login_attempts.count_second_factor_failures);
    }

    #[test]
    fn durations_parse_from_humantime() {
        let store: CaskadeConfigStore = serde_json::from_value(serde_json::json!({
            "ticket_granting_ticket": { "lifetime": "2h" },
            "login_attempts": { "lock_timeout": "45m", "max_failed_login_attempts": 3 }
        }))
        .unwrap();
        assert_eq!(store.ticket_granting_ticket.lifetime, Duration::from_secs(7200));
        assert_eq!(store.login_attempts.lock_timeout, Duration::from_secs(2700));
        assert_eq!(store.login_attempts.max_failed_login_attempts, 3);
    }
}
