//! JWT access tokens (HS256, email subject)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the user's email
    sub: String,
    /// Expiry as a unix timestamp
    exp: i64,
}

/// Issue a signed access token for `email`, valid for `expire_minutes`.
pub fn issue(email: &str, secret: &str, expire_minutes: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: email.to_string(),
        exp: (Utc::now() + Duration::minutes(expire_minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate a token and return the email it was issued for.
///
/// Expiry is checked by the library; an expired or tampered token fails here.
pub fn validate(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_returns_the_subject() {
        let token = issue("a@example.com", "secret", 30).unwrap();
        assert_eq!(validate(&token, "secret").unwrap(), "a@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("a@example.com", "secret", 30).unwrap();
        assert!(validate(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue("a@example.com", "secret", -5).unwrap();
        assert!(validate(&token, "secret").is_err());
    }
}
