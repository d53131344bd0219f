use anyhow::Context;
use rostra_auth::create_access_token;
use rostra_config::JwtConfig;
use rostra_core::{AppError, hash_password, verify_password};
use rostra_db::PgPool;
use rostra_models::{
    ChangePasswordDto, LoginRequest, LoginResponse, UpdateProfileDto, User, UserWithProfile,
};
use tracing::{info, instrument, warn};

use crate::metrics::track_user_login;
use crate::modules::users::registration::{UserWriteError, email_taken_or};
use crate::modules::users::service::load_profile;

pub struct AuthService;

impl AuthService {
    async fn with_profile(db: &PgPool, user: User) -> Result<UserWithProfile, AppError> {
        let mut conn = db
            .acquire()
            .await
            .context("Failed to acquire connection")
            .map_err(AppError::database)?;

        let profile = load_profile(&mut conn, user.id, user.role)
            .await
            .context("Failed to fetch user profile")
            .map_err(AppError::database)?;

        Ok(UserWithProfile { user, profile })
    }

    #[instrument(skip_all, fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::unauthorized("Invalid credentials".to_string());

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&dto.email)
            .fetch_optional(db)
            .await
            .context("Failed to fetch user by email")
            .map_err(AppError::database)?;

        let Some(user) = user else {
            track_user_login("failure");
            return Err(invalid());
        };

        if !verify_password(&dto.password, &user.password)? {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            track_user_login("failure");
            return Err(invalid());
        }

        let access_token = create_access_token(
            user.id,
            &user.email,
            user.role.as_str(),
            user.token_version,
            jwt_config,
        )?;

        track_user_login("success");
        info!(user_id = %user.id, role = %user.role, "User logged in");

        let user = Self::with_profile(db, user).await?;
        Ok(LoginResponse::bearer(access_token, user))
    }

    /// Revokes every token issued to the user so far.
    #[instrument(skip(db))]
    pub async fn logout(db: &PgPool, user_id: uuid::Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(db)
        .await
        .context("Failed to revoke tokens")
        .map_err(AppError::database)?;

        info!(%user_id, "User logged out");
        Ok(())
    }

    pub async fn get_profile(db: &PgPool, user: User) -> Result<UserWithProfile, AppError> {
        Self::with_profile(db, user).await
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn update_profile(
        db: &PgPool,
        user: User,
        dto: UpdateProfileDto,
    ) -> Result<UserWithProfile, AppError> {
        let password_hash = dto.password.as_deref().map(hash_password).transpose()?;

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                password = COALESCE($3, password),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(dto.name.as_deref())
        .bind(dto.email.as_deref())
        .bind(password_hash.as_deref())
        .bind(user.id)
        .fetch_one(db)
        .await
        .map_err(|e| match email_taken_or(e) {
            UserWriteError::Database(e) => {
                AppError::database(anyhow::Error::new(e).context("Failed to update profile"))
            }
            other => other.into_app_error(),
        })?;

        Self::with_profile(db, updated).await
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn change_password(
        db: &PgPool,
        user: User,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        if !verify_password(&dto.current_password, &user.password)? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let password_hash = hash_password(&dto.new_password)?;

        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user.id)
            .execute(db)
            .await
            .context("Failed to update password")
            .map_err(AppError::database)?;

        info!("Password changed");
        Ok(())
    }
}
