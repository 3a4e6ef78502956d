//! services/api/src/adapters/jwt.rs
//!
//! HMAC-signed JWT implementation of the `CredentialService` port.

use chrono::{Duration, Utc};
use flashcards_core::{
    domain::{Claims, IssuedToken, Plan},
    ports::{CredentialService, InvalidCredential, PortError, PortResult},
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ConfigError, JwtConfig};

/// Issues and validates access tokens with a process-wide secret.
#[derive(Clone)]
pub struct JwtCredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl JwtCredentialService {
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        let ttl = Duration::try_hours(config.expiration_hours).ok_or_else(|| {
            ConfigError::InvalidValue(
                "JWT_EXPIRATION_HOURS".to_string(),
                format!("{} hours is out of range", config.expiration_hours),
            )
        })?;
        Ok(Self::from_secret(config.secret.as_bytes(), config.algorithm, ttl))
    }

    pub fn from_secret(secret: &[u8], algorithm: Algorithm, default_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            default_ttl,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        validation
    }
}

impl CredentialService for JwtCredentialService {
    fn issue(
        &self,
        subject_id: Uuid,
        email: &str,
        plan: Plan,
        ttl: Duration,
    ) -> PortResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at.checked_add_signed(ttl).ok_or_else(|| {
            PortError::Unexpected(format!("token lifetime {} overflows the clock", ttl))
        })?;
        let claims = Claims {
            sub: subject_id,
            email: email.to_string(),
            plan,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| PortError::Unexpected(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn validate(&self, token: &str) -> Result<Claims, InvalidCredential> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => debug!("Rejected expired token"),
                ErrorKind::InvalidSignature => warn!("Rejected token with a bad signature"),
                _ => debug!(error = %e, "Rejected malformed token"),
            }
            InvalidCredential
        })?;

        // The library accepts `exp == now`; a token is already dead at its expiry instant.
        if data.claims.exp <= Utc::now().timestamp() {
            debug!("Rejected token at its expiry instant");
            return Err(InvalidCredential);
        }

        Ok(data.claims)
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtCredentialService {
        JwtCredentialService::from_secret(secret.as_bytes(), Algorithm::HS256, Duration::hours(1))
    }

    #[test]
    fn issued_token_validates_with_same_claims() {
        let codec = service("unit-test-secret");
        let subject = Uuid::new_v4();

        let issued = codec
            .issue(subject, "ada@example.com", Plan::Pro, Duration::hours(1))
            .unwrap();
        let claims = codec.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.plan, Plan::Pro);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let issued = service("first-secret")
            .issue(Uuid::new_v4(), "a@example.com", Plan::Free, Duration::hours(1))
            .unwrap();

        assert_eq!(service("second-secret").validate(&issued.token), Err(InvalidCredential));
    }

    #[test]
    fn already_expired_token_is_invalid() {
        let codec = service("unit-test-secret");
        let issued = codec
            .issue(Uuid::new_v4(), "a@example.com", Plan::Free, Duration::seconds(-5))
            .unwrap();

        assert_eq!(codec.validate(&issued.token), Err(InvalidCredential));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = service("unit-test-secret");
        assert_eq!(codec.validate(""), Err(InvalidCredential));
        assert_eq!(codec.validate("not.a.token"), Err(InvalidCredential));
    }

    #[test]
    fn lifetime_past_the_end_of_time_is_an_error() {
        let codec = service("unit-test-secret");
        let err = codec
            .issue(Uuid::new_v4(), "a@example.com", Plan::Free, Duration::weeks(1_000_000_000))
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[test]
    fn unrepresentable_configured_lifetime_is_rejected() {
        let config = JwtConfig {
            secret: "unit-test-secret".to_string(),
            algorithm: Algorithm::HS256,
            expiration_hours: i64::MAX,
        };
        assert!(matches!(
            JwtCredentialService::new(&config),
            Err(ConfigError::InvalidValue(..))
        ));
    }
}
