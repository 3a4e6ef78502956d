//! crates/flashcards_core/src/gate.rs
//!
//! Turns a raw bearer token into an authenticated principal, or rejects it.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::User;
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{CredentialService, DatabaseService, PortError};

#[derive(Clone)]
pub struct AccessGate {
    credentials: Arc<dyn CredentialService>,
    db: Arc<dyn DatabaseService>,
}

impl AccessGate {
    pub fn new(credentials: Arc<dyn CredentialService>, db: Arc<dyn DatabaseService>) -> Self {
        Self { credentials, db }
    }

    /// Resolves the principal behind `token`.
    ///
    /// Every rejection is `ServiceError::Unauthorized`: no token, a token that
    /// fails verification, or a subject that no longer exists.
    pub async fn resolve(&self, token: Option<&str>) -> ServiceResult<User> {
        let token = token.ok_or_else(|| {
            debug!("Request carried no access token");
            ServiceError::Unauthorized
        })?;

        let claims = self
            .credentials
            .validate(token)
            .map_err(|_| ServiceError::Unauthorized)?;

        match self.db.get_user_by_id(claims.sub).await {
            Ok(user) => Ok(user),
            Err(PortError::NotFound(_)) => {
                warn!(subject = %claims.sub, "Token subject no longer exists");
                Err(ServiceError::Unauthorized)
            }
            Err(e) => Err(e.into()),
        }
    }
}
