//! crates/flashcards_core/src/accounts.rs
//!
//! Registration and login. Both mint an access token for the resulting user.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::domain::{IssuedToken, Plan, User};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{CredentialService, DatabaseService, PasswordService, PortError};

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$"));

/// A user together with the token minted for them.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: IssuedToken,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<dyn DatabaseService>,
    credentials: Arc<dyn CredentialService>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        credentials: Arc<dyn CredentialService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            db,
            credentials,
            passwords,
        }
    }

    /// Creates a `free` account. A taken email is a `Conflict`.
    pub async fn register(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let hashed = self.passwords.hash(password)?;
        let user = self
            .db
            .create_user(&email, &hashed, Plan::Free)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => ServiceError::Conflict("Email already registered".into()),
                other => other.into(),
            })?;
        info!(user_id = %user.id, "Registered new user");

        self.open_session(user)
    }

    /// Unknown email and wrong password are reported identically.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let creds = match self.db.get_user_by_email(&email.trim().to_lowercase()).await {
            Ok(creds) => creds,
            Err(PortError::NotFound(_)) => return Err(ServiceError::Unauthorized),
            Err(e) => return Err(e.into()),
        };

        if !self.passwords.verify(password, &creds.hashed_password) {
            warn!(user_id = %creds.user.id, "Login rejected: wrong password");
            return Err(ServiceError::Unauthorized);
        }

        self.open_session(creds.user)
    }

    fn open_session(&self, user: User) -> ServiceResult<AuthSession> {
        let token = self.credentials.issue(
            user.id,
            &user.email,
            user.plan,
            self.credentials.default_ttl(),
        )?;
        Ok(AuthSession { user, token })
    }
}

/// Trims and lowercases an address, rejecting anything not shaped like `local@domain.tld`.
pub fn normalize_email(raw: &str) -> ServiceResult<String> {
    let pattern = EMAIL_PATTERN
        .as_ref()
        .map_err(|e| ServiceError::Internal(format!("bad email pattern: {}", e)))?;

    let email = raw.trim().to_lowercase();
    if pattern.is_match(&email) {
        Ok(email)
    } else {
        Err(ServiceError::Validation("Invalid email address".into()))
    }
}
