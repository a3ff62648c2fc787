use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::models::RoleName;

/// Claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub rol: RoleName,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i32, username: String, rol: RoleName) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            username,
            rol,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expirado")]
    Expired,

    #[error("Token inválido")]
    Invalid,

    #[error("JWT generation error: {0}")]
    Generation(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, TokenError> {
    let secret = &config::config().security.jwt_secret;
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

pub fn decode_jwt(token: &str) -> Result<Claims, TokenError> {
    let secret = &config::config().security.jwt_secret;
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    })?;

    Ok(token_data.claims)
}

#[derive(Debug, Error)]
#[error("password hashing error: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let cost = config::config().security.bcrypt_cost;
    Ok(bcrypt::hash(plain, cost)?)
}

pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(plain, hash)?)
}
