use crate::{
    auth::AuthService,
    db::DbPool,
    entities::user::{self, Entity as UserEntity, Role},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Account registration and credential checks. Email addresses are
/// stored lowercased; comparisons go through the stored form.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, auth: Arc<AuthService>) -> Self {
        Self {
            db,
            event_sender,
            auth,
        }
    }

    /// Creates a buyer or seller account. Admin accounts are never
    /// self-registered; they come from the seeder.
    #[instrument(skip(self, input), fields(role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, ServiceError> {
        input.validate()?;

        if input.role == Role::Admin {
            return Err(ServiceError::ValidationError(
                "Accounts can only register as buyer or seller".to_string(),
            ));
        }

        let db = &*self.db;
        let email = input.email.trim().to_lowercase();

        if UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;

        let active = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(input.role),
            is_blocked: Set(false),
            ..Default::default()
        };

        // The unique index still guards the race between the lookup
        // above and this insert.
        let model = match active.insert(db).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(
                        "An account with this email already exists".to_string(),
                    ),
                    _ => ServiceError::DatabaseError(e),
                })
            }
        };

        info!(user_id = %model.id, role = %model.role, "User registered");

        self.event_sender
            .send(Event::UserRegistered {
                user_id: model.id,
                role: model.role.as_str().to_string(),
            })
            .await;

        let token = self.auth.generate_token(&model)?;
        Ok(AuthResponse {
            token,
            user: model.into(),
        })
    }

    /// Verifies credentials and issues a token. Blocked accounts are
    /// rejected only after the password checks out, so the error does
    /// not reveal account state to guessers.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, ServiceError> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".to_string()))?;

        if !self.auth.verify_password(&input.password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if user.is_blocked {
            return Err(ServiceError::Forbidden(
                "Your account has been blocked".to_string(),
            ));
        }

        let token = self.auth.generate_token(&user)?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_input_validation() {
        let bad = RegisterInput {
            name: String::new(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            role: Role::Buyer,
        };
        assert!(bad.validate().is_err());

        let good = RegisterInput {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "long-enough-password".to_string(),
            role: Role::Seller,
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn role_parses_from_request_payload() {
        let input: RegisterInput = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "long-enough-password",
            "role": "seller"
        }))
        .unwrap();
        assert_eq!(input.role, Role::Seller);
    }
}
