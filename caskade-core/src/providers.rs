use async_trait::async_trait;
use caskade_common::{CaskadeError, Secret};
use caskade_db_entities::User;
use url::Url;

/// Outcome of primary credential verification. The core never inspects the
/// credentials themselves.
#[derive(Debug, Clone)]
pub enum AuthenticationResult {
    Accepted { user: User::Model },
    Rejected,
}

/// Checks a username/password pair against some identity source and resolves
/// the matching user record. Implemented by the embedding application.
#[async_trait]
pub trait CredentialVerifier {
    async fn verify(
        &mut self,
        identifier: &str,
        secret: &Secret<String>,
    ) -> Result<AuthenticationResult, CaskadeError>;
}

/// Allow-list policy for service URLs. The policy content is not this
/// core's concern.
#[async_trait]
pub trait ServiceAccessPolicy: Send + Sync {
    async fn allowed(&self, service: &Url) -> Result<bool, CaskadeError>;
}
