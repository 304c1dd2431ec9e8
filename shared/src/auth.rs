//! Token verification and identity extraction.
//!
//! Tokens are HS256 JWTs whose `user_account` and `role` claims are
//! themselves encrypted (see [`crate::claims`]). An [`Identity`] is only
//! produced when the signature, expiry and both decryptions succeed.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::claims::{ClaimCipher, DecryptError};
use crate::config::SecurityConfig;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("failed to decrypt `{claim}` claim: {source}")]
    Decrypt {
        claim: &'static str,
        #[source]
        source: DecryptError,
    },
}

/// Claims carried by an issuer token. Both values are still encrypted.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptedClaims {
    /// Base64 AES ciphertext of the account name
    pub user_account: String,
    /// Base64 AES ciphertext of the role
    pub role: String,
    /// Expiration (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Verified, decrypted caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account: String,
    pub role: String,
}

/// Verifies token signature and expiry.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(signing_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present, with no grace period.
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, raw_token: &str) -> Result<EncryptedClaims, TokenError> {
        let token = raw_token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        decode::<EncryptedClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

/// Runs the whole identity pipeline: verify, then decrypt both claims.
pub struct Authenticator {
    verifier: TokenVerifier,
    cipher: ClaimCipher,
}

impl Authenticator {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            verifier: TokenVerifier::new(&config.signing_secret),
            cipher: ClaimCipher::new(&config.encryption_secret),
        }
    }

    pub fn authenticate(&self, raw_token: &str) -> Result<Identity, AuthError> {
        let claims = self.verifier.verify(raw_token).map_err(|e| {
            warn!("Token verification failed: {}", e);
            e
        })?;

        let account = self.decrypt_claim("user_account", &claims.user_account)?;
        let role = self.decrypt_claim("role", &claims.role)?;

        info!("User authenticated: {}", account);
        Ok(Identity { account, role })
    }

    fn decrypt_claim(&self, claim: &'static str, value: &str) -> Result<String, AuthError> {
        self.cipher.decrypt(value).map_err(|source| {
            warn!("Claim decryption failed for {}: {}", claim, source);
            AuthError::Decrypt { claim, source }
        })
    }
}
