//! JWT access-token generation and validation.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload whose
//! subject is the technician's database id. The provisioning key that gates
//! the development mint endpoint is configured as a SHA-256 digest so the
//! plaintext key never appears in the environment.

use fieldline_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the technician's internal database id.
    pub sub: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for revocation / audit.
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
    /// SHA-256 hex digest of the provisioning key accepted by the token
    /// mint endpoint, if minting is enabled.
    pub provision_key_sha256: Option<String>,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                        | Required | Default |
    /// |--------------------------------|----------|---------|
    /// | `JWT_SECRET`                   | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`       | no       | `60`    |
    /// | `AUTH_PROVISION_KEY_SHA256`    | no       | unset (minting disabled) |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let provision_key_sha256 = std::env::var("AUTH_PROVISION_KEY_SHA256")
            .ok()
            .map(|digest| digest.to_lowercase());

        Self {
            secret,
            access_token_expiry_mins,
            provision_key_sha256,
        }
    }

    /// Check a presented provisioning key against the configured digest.
    ///
    /// Returns `false` when minting is disabled.
    pub fn verify_provision_key(&self, presented: &str) -> bool {
        let Some(expected) = &self.provision_key_sha256 else {
            return false;
        };
        let digest = Sha256::digest(presented.as_bytes());
        format!("{digest:x}") == *expected
    }
}

/// Generate an HS256 access token for the given technician.
pub fn generate_access_token(
    technician_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + config.access_token_expiry_mins * 60;

    let claims = Claims {
        sub: technician_id,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Validates the signature, expiration, and issued-at claims automatically.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            access_token_expiry_mins: 60,
            provision_key_sha256: None,
        }
    }

    #[test]
    fn generated_token_round_trips() {
        let config = test_config();
        let token = generate_access_token(42, &config).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let other = JwtConfig {
            secret: "other-secret".into(),
            ..test_config()
        };
        let token = generate_access_token(42, &other).unwrap();
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn provision_key_verification_uses_sha256_digest() {
        // sha256("let-me-in")
        let config = JwtConfig {
            provision_key_sha256: Some(
                "a3ee786b5707c27d42570785081ec17f5c7db9262a01366af362a1aa61a420b9".into(),
            ),
            ..test_config()
        };
        assert!(config.verify_provision_key("let-me-in"));
        assert!(!config.verify_provision_key("let-me-out"));
    }

    #[test]
    fn minting_disabled_rejects_every_key() {
        let config = test_config();
        assert!(!config.verify_provision_key("anything"));
    }
}
