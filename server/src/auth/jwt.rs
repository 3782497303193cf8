//! JWT Token Generation and Validation
//!
//! Stateless HS256 session tokens signed with the configured secret. A token
//! carries the account identity and role; its `exp` claim is the only bound on
//! its lifetime (there is no revocation list).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};
use crate::config::Config;
use crate::db::{Account, Role};

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (account ID).
    pub sub: String,
    /// Account email.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `"educator"` or `"student"`.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Not before (Unix timestamp).
    pub nbf: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Account ID carried in `sub`.
    pub fn account_id(&self) -> AuthResult<i64> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Why a token was rejected. Only ever logged; callers see `InvalidToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// `nbf` is in the future.
    NotYetValid,
    /// `exp` has passed.
    Expired,
    /// Signature does not match the secret.
    BadSignature,
    /// Not a decodable token of the expected shape or algorithm.
    Malformed,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::BadSignature => "bad_signature",
            Self::Malformed => "malformed",
        })
    }
}

impl From<&ErrorKind> for TokenRejection {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed,
        }
    }
}

/// Issues and verifies session tokens.
///
/// Built once from [`Config`] and shared read-only.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.auth_secret, config.auth_token_expiry)
    }

    /// Issue a token for an account, valid from now.
    pub fn issue(&self, account: &Account) -> AuthResult<String> {
        self.issue_at(account, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> AuthResult<String> {
        let expires_at = Duration::try_seconds(self.expiry_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Internal(format!(
                    "Token lifetime of {}s overflows the clock",
                    self.expiry_seconds
                ))
            })?;

        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role: account.role,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a token, reporting the precise rejection reason.
    pub fn verify_detailed(&self, token: &str) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenRejection::from(e.kind()))
    }

    /// Validate a token. Every rejection collapses to [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_detailed(token).map_err(|reason| {
            tracing::info!(reason = %reason, "Session token rejected");
            AuthError::InvalidToken
        })
    }
}
