use crate::auth::jwt::{TokenCodec, TokenError};
use crate::types::{Claims, TokenPair};
use chrono::Duration;
use uuid::Uuid;

/// Default access token lifetime, seconds.
pub const DEFAULT_ACCESS_TTL: i64 = 300;
/// Default refresh token lifetime, seconds.
pub const DEFAULT_REFRESH_TTL: i64 = 86_400;
/// Longest accepted token lifetime, ten years in seconds.
pub const MAX_TOKEN_TTL: i64 = 10 * 365 * 86_400;

/// Issues and checks subject-bound access/refresh tokens.
///
/// The manager is stateless: nothing is recorded when a token is minted, so a
/// rotated-out refresh token keeps working until it expires on its own.
pub struct SessionTokenManager {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionTokenManager {
    /// # Arguments
    /// * `codec` - Signs and verifies the tokens
    /// * `access_ttl` - Access token validity in seconds
    /// * `refresh_ttl` - Refresh token validity in seconds
    pub fn new(codec: TokenCodec, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self {
            codec,
            access_ttl: Duration::try_seconds(access_ttl).unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_seconds(refresh_ttl).unwrap_or(Duration::MAX),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, identity: &str) -> Result<String, TokenError> {
        self.issue(identity, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, identity: &str) -> Result<String, TokenError> {
        self.issue(identity, self.refresh_ttl)
    }

    /// Mints both tokens independently; neither is derived from the other.
    pub fn issue_pair(&self, identity: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(identity)?,
            refresh_token: self.issue_refresh_token(identity)?,
        })
    }

    fn issue(&self, identity: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = self.codec.clock().now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: identity.to_string(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        self.codec.sign(&claims)
    }

    /// True only when `token` verifies, is unexpired and was issued to
    /// `identity`. Never fails; use [`Self::inspect_access_token`] for the
    /// reason behind a `false`.
    pub fn validate_access_token(&self, identity: &str, token: &str) -> bool {
        match self.inspect_access_token(identity, token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "access token rejected");
                false
            }
        }
    }

    pub fn inspect_access_token(&self, identity: &str, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let claims = self.codec.verify(token)?;
        if claims.sub != identity {
            return Err(TokenError::SubjectMismatch);
        }

        Ok(claims)
    }

    /// Exchanges a refresh token for a fresh pair bound to the same subject.
    ///
    /// Only signature and expiry are checked: the caller does not know whose
    /// token it holds until the claims are read.
    pub fn refresh_pair(&self, refresh_token: &str) -> Result<(String, TokenPair), TokenError> {
        if refresh_token.is_empty() {
            return Err(TokenError::Missing);
        }

        let claims = self.codec.verify(refresh_token)?;
        let pair = self.issue_pair(&claims.sub)?;

        Ok((claims.sub, pair))
    }
}
