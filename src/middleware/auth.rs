use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rostra_auth::{Claims, verify_token};
use rostra_core::AppError;
use rostra_models::{User, UserRole};
use uuid::Uuid;

use crate::state::AppState;

/// Extractor that validates the bearer token and loads the current user.
///
/// Rejects tokens whose `ver` claim no longer matches the user's
/// `token_version`, so logging out revokes outstanding tokens.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub user: User,
}

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format".to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_token(token, &state.jwt_config)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::unauthorized("User no longer exists".to_string()))?;

        if user.token_version != claims.ver {
            return Err(AppError::unauthorized("Token has been revoked".to_string()));
        }

        Ok(AuthUser { claims, user })
    }
}

/// Defines an extractor that wraps [`AuthUser`] and admits only the listed roles.
macro_rules! require_role {
    ($name:ident, $message:literal, $($role:path),+) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub AuthUser);

        impl FromRequestParts<AppState> for $name {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user = AuthUser::from_request_parts(parts, state).await?;

                if !matches!(auth_user.role(), $($role)|+) {
                    return Err(AppError::forbidden($message.to_string()));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_role!(RequireAdmin, "Access denied. Admin role required", UserRole::Admin);
require_role!(
    RequireStaff,
    "Access denied. Admin or teacher role required",
    UserRole::Admin,
    UserRole::Teacher
);
