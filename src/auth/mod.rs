/*!
 * # Authentication and Authorization Module
 *
 * JWT bearer authentication plus role-based route gating for the
 * marketplace API. Passwords are hashed with Argon2; tokens are HS256
 * and carry the user id and role. The auth middleware re-reads the
 * user row on every request so blocked accounts lose access as soon
 * as an admin flips the flag.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Role the user held when the token was issued
    pub role: String,
    /// Expiration time (unix timestamp)
    pub exp: i64,
    /// Issued at (unix timestamp)
    pub iat: i64,
}

/// Authenticated user attached to the request extensions by
/// [`auth_middleware`]. Always reflects the current database row,
/// not the token claims.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
        }
    }
}

/// Issues and validates JWTs and hashes passwords.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_lifetime_secs: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            token_lifetime_secs: config.jwt_expiration as i64,
        }
    }

    /// Hash a password with Argon2id and a fresh random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        hash_password(password)
    }

    /// Verify a password against a stored Argon2 hash.
    ///
    /// Returns `Ok(false)` for a wrong password; errors only when the
    /// stored hash itself is malformed.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Generate a signed token for the given user.
    pub fn generate_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            exp: now + self.token_lifetime_secs,
            iat: now,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Other(anyhow::anyhow!("failed to sign token: {}", e)))
    }

    /// Validate a token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ServiceError::Unauthorized("Token has expired".to_string())
                }
                _ => ServiceError::Unauthorized("Invalid token".to_string()),
            })
    }
}

/// Shared state for the auth middleware stack.
#[derive(Clone)]
pub struct AuthState {
    pub db: DbPool,
    pub auth: Arc<AuthService>,
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Authentication middleware: validates the bearer token, loads the
/// user row it names, and attaches a [`CurrentUser`] to the request.
///
/// Blocked accounts are rejected with 403 even when the token is valid.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.auth.validate_token(token)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;

    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;

    if user.is_blocked {
        debug!(user_id = %user.id, "blocked account rejected");
        return Err(ServiceError::Forbidden(
            "Your account has been blocked".to_string(),
        ));
    }

    request.extensions_mut().insert(CurrentUser::from(user));

    Ok(next.run(request).await)
}

/// Role middleware: requires the authenticated user to hold exactly
/// the given role. Must run inside [`auth_middleware`].
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    if !user.has_role(required_role) {
        return Err(ServiceError::Forbidden(format!(
            "This area is restricted to {} accounts",
            required_role
        )));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, auth: AuthState) -> Self;
    fn with_role(self, auth: AuthState, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, auth: AuthState) -> Self {
        self.layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
    }

    fn with_role(self, auth: AuthState, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth(auth)
    }
}
