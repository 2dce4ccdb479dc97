//! HS256 access tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use models::user::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{domain::AuthUser, errors::AuthError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// account email
    pub sub: String,
    pub uid: Uuid,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(secret: &str, user: &AuthUser, ttl_hours: i64) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.email.clone(),
        uid: user.id,
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Verify signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            name: "A".into(),
            role: UserRole::Admin,
            email_confirmed: true,
            active: true,
        }
    }

    #[test]
    fn round_trip_keeps_identity() {
        let u = user();
        let token = issue_token("0123456789abcdef", &u, 1).unwrap();
        let claims = decode_token("0123456789abcdef", &token).unwrap();
        assert_eq!(claims.uid, u.id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.sub, "a@example.com");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token("0123456789abcdef", &user(), 1).unwrap();
        assert!(decode_token("another-secret-value", &token).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let token = issue_token("0123456789abcdef", &user(), -1).unwrap();
        assert!(decode_token("0123456789abcdef", &token).is_err());
    }
}
