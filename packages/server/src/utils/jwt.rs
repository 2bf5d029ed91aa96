use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT claims carried by every access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    /// User id.
    pub uid: i32,
    /// Expiration timestamp.
    pub exp: usize,
}

const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Sign a new access token for a user.
pub fn sign(user_id: i32, username: &str, secret: &str) -> Result<String> {
    let expiration = (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode an access token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_tokens_verify_and_carry_the_user() {
        let token = sign(42, "alice", "test-secret").unwrap();
        let claims = verify(&token, "test-secret").unwrap();
        assert_eq!(claims.uid, 42);
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn verification_fails_with_a_different_secret() {
        let token = sign(42, "alice", "test-secret").unwrap();
        assert!(verify(&token, "other-secret").is_err());
    }

    #[test]
    fn garbage_tokens_fail_verification() {
        assert!(verify("not.a.jwt", "test-secret").is_err());
    }
}
