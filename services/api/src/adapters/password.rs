//! services/api/src/adapters/password.rs
//!
//! Argon2 implementation of the `PasswordService` port.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use flashcards_core::ports::{PasswordService, PortError, PortResult};
use tracing::error;

#[derive(Clone, Default)]
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })
    }

    fn verify(&self, password: &str, hashed_password: &str) -> bool {
        match PasswordHash::new(hashed_password) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                error!("Failed to parse stored password hash: {:?}", e);
                false
            }
        }
    }
}
