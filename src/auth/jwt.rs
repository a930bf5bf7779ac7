use crate::auth::clock::Clock;
use crate::types::{messages, AppError, Claims};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::sync::Arc;

/// Why a token was refused. Callers outside the auth module collapse every
/// variant into a single "not authenticated" outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("no token presented")]
    Missing,

    #[error("failed to encode token: {0}")]
    Encoding(String),

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token subject does not match the requested identity")]
    SubjectMismatch,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encoding(msg) => AppError::Internal(msg),
            _ => AppError::Auth(messages::INVALID_TOKEN.to_string()),
        }
    }
}

/// Signs and verifies HS256 claim sets.
///
/// Expiry is checked against the injected [`Clock`] rather than inside
/// `jsonwebtoken`, so verification is a pure function of the token, the
/// secret and the clock.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Creates a codec keyed with `secret`. Tokens only verify under the
    /// secret they were signed with.
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::{Duration, Utc};

    const SECRET: &str = "test-secret-key-that-is-at-least-32-chars";

    fn claims_expiring_in(clock: &ManualClock, secs: i64) -> Claims {
        let now = clock.now();
        Claims {
            sub: "user-123".to_string(),
            exp: (now + Duration::seconds(secs)).timestamp(),
            iat: now.timestamp(),
            jti: "jti-1".to_string(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = TokenCodec::new(SECRET, clock.clone());
        let claims = claims_expiring_in(&clock, 60);

        let token = codec.sign(&claims).expect("should sign");
        assert_eq!(token.split('.').count(), 3, "compact JWS has three parts");

        let decoded = codec.verify(&token).expect("should verify");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_verify_wrong_secret() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let signer = TokenCodec::new("secret-one-that-is-32-chars-long", clock.clone());
        let verifier = TokenCodec::new("secret-two-that-is-32-chars-long", clock.clone());

        let token = signer.sign(&claims_expiring_in(&clock, 60)).unwrap();

        assert_eq!(verifier.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_verify_garbage_is_malformed() {
        let codec = TokenCodec::new(SECRET, Arc::new(ManualClock::default()));

        assert!(matches!(
            codec.verify("invalid.token.here"),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(codec.verify("nope"), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_verify_tampered_payload() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = TokenCodec::new(SECRET, clock.clone());
        let token = codec.sign(&claims_expiring_in(&clock, 60)).unwrap();

        let mut other = claims_expiring_in(&clock, 60);
        other.sub = "someone-else".to_string();
        let forged_payload = codec.sign(&other).unwrap();

        // Splice the other token's payload under the original signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_payload.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(codec.verify(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = TokenCodec::new(SECRET, clock.clone());
        let token = codec.sign(&claims_expiring_in(&clock, 10)).unwrap();

        clock.advance(Duration::seconds(9));
        assert!(codec.verify(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_error_maps_to_generic_auth_error() {
        for e in [
            TokenError::Missing,
            TokenError::InvalidSignature,
            TokenError::Expired,
            TokenError::SubjectMismatch,
            TokenError::Malformed("x".into()),
        ] {
            match AppError::from(e) {
                AppError::Auth(msg) => assert_eq!(msg, messages::INVALID_TOKEN),
                other => panic!("unexpected mapping: {:?}", other),
            }
        }
    }
}
