use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::config::env_parse;
use crate::models::{Id, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Display name at issue time.
    pub name: String,
    pub exp: usize,
    pub roles: Vec<Role>,
}

impl Claims {
    pub fn user_id(&self) -> Option<Id> {
        self.sub.parse().ok()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

fn secret() -> Result<String, AuthError> {
    std::env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

/// Validate a JWT and return its claims.
fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        if let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() {
            match decode_jwt(bearer.token()) {
                Ok(claims) => return ready(Ok(Auth(claims))),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected bearer token");
                    return ready(Err(actix_web::error::ErrorUnauthorized("Invalid JWT")));
                }
            }
        }
        ready(Err(actix_web::error::ErrorUnauthorized(
            "Authorization required",
        )))
    }
}

pub fn roles_for(user: &User) -> Vec<Role> {
    if user.is_admin {
        vec![Role::User, Role::Admin]
    } else {
        vec![Role::User]
    }
}

/// Create a JWT for a user, valid for `JWT_TTL_HOURS` (default 24).
pub fn create_jwt(user_id: Id, display_name: &str, roles: Vec<Role>) -> Result<String, AuthError> {
    let secret = secret()?;
    let ttl = chrono::Duration::hours(env_parse("JWT_TTL_HOURS", 24));
    let expiration = (chrono::Utc::now() + ttl).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        name: display_name.to_string(),
        exp: expiration,
        roles,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn token_for(user: &User) -> Result<String, AuthError> {
    create_jwt(user.id, &user.display_name, roles_for(user))
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Malformed stored hashes count as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
