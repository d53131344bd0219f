use anyhow::Context;
use rostra_core::{AppError, PaginationMeta};
use rostra_db::PgPool;
use rostra_models::{
    AdminProfile, PaginatedUsersResponse, Profile, StudentProfile, TeacherProfile, UpdateUserDto,
    User, UserFilterParams, UserRole, UserSummary, UserWithProfile,
};
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::registration::{
    IdentifierIssuer, ProfileFields, UserWriteError, email_taken_or, insert_profile,
    retry_on_duplicate_identifier,
};

const LIST_USERS: &str = r#"
    SELECT u.id, u.name, u.email, u.role, t.employee_id, s.student_id, u.created_at
    FROM users u
    LEFT JOIN teachers t ON t.user_id = u.id
    LEFT JOIN students s ON s.user_id = u.id
    WHERE ($1::TEXT IS NULL OR u.role = $1)
    ORDER BY u.created_at DESC, u.id
    LIMIT $2 OFFSET $3
"#;

const COUNT_USERS: &str = "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)";

/// Loads the profile row matching `role`, if one exists.
pub async fn load_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: UserRole,
) -> Result<Option<Profile>, sqlx::Error> {
    let profile = match role {
        UserRole::Admin => {
            sqlx::query_as::<_, AdminProfile>("SELECT * FROM admins WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(conn)
                .await?
                .map(Profile::Admin)
        }
        UserRole::Teacher => {
            sqlx::query_as::<_, TeacherProfile>("SELECT * FROM teachers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(conn)
                .await?
                .map(Profile::Teacher)
        }
        UserRole::Student => {
            sqlx::query_as::<_, StudentProfile>("SELECT * FROM students WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(conn)
                .await?
                .map(Profile::Student)
        }
    };

    Ok(profile)
}

pub struct UserService;

impl UserService {
    /// Lists users newest first. Teachers only ever see students.
    #[instrument(skip(db))]
    pub async fn list_users(
        db: &PgPool,
        viewer_role: UserRole,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let requested = filters
            .role
            .as_deref()
            .map(str::parse::<UserRole>)
            .transpose()
            .map_err(AppError::bad_request)?;

        let role = match viewer_role {
            UserRole::Admin => requested,
            UserRole::Teacher => match requested {
                None | Some(UserRole::Student) => Some(UserRole::Student),
                Some(_) => {
                    return Err(AppError::forbidden(
                        "Teachers can only list students".to_string(),
                    ));
                }
            },
            UserRole::Student => {
                return Err(AppError::forbidden(
                    "Access denied. Admin or teacher role required".to_string(),
                ));
            }
        };
        let role = role.map(|r| r.as_str());
        let pagination = filters.pagination;

        let total: i64 = sqlx::query_scalar(COUNT_USERS)
            .bind(role)
            .fetch_one(db)
            .await
            .context("Failed to count users")
            .map_err(AppError::database)?;

        let data = sqlx::query_as::<_, UserSummary>(LIST_USERS)
            .bind(role)
            .bind(pagination.per_page())
            .bind(pagination.offset())
            .fetch_all(db)
            .await
            .context("Failed to fetch users")
            .map_err(AppError::database)?;

        Ok(PaginatedUsersResponse {
            data,
            meta: PaginationMeta::new(&pagination, total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: Uuid) -> Result<UserWithProfile, AppError> {
        let mut conn = db
            .acquire()
            .await
            .context("Failed to acquire connection")
            .map_err(AppError::database)?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch user by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User with id {} not found", id)))?;

        let profile = load_profile(&mut conn, user.id, user.role)
            .await
            .context("Failed to fetch user profile")
            .map_err(AppError::database)?;

        Ok(UserWithProfile { user, profile })
    }

    /// Updates name, email and role. Moving a user into the teacher or
    /// student role issues an ID in the same transaction unless they
    /// already hold a profile for that role.
    #[instrument(skip(db, issuer, dto))]
    pub async fn update_user(
        db: &PgPool,
        issuer: &IdentifierIssuer,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<UserWithProfile, AppError> {
        let fields = ProfileFields::from(&dto);
        let class = dto.role.and_then(|r| r.entity_class());

        let (dto, fields) = (&dto, &fields);
        retry_on_duplicate_identifier(issuer, class, move || {
            Self::try_update(db, issuer, id, dto, fields)
        })
        .await
    }

    async fn try_update(
        db: &PgPool,
        issuer: &IdentifierIssuer,
        id: Uuid,
        dto: &UpdateUserDto,
        fields: &ProfileFields,
    ) -> Result<UserWithProfile, UserWriteError> {
        let mut tx = db.begin().await?;

        let current = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(UserWriteError::UserNotFound(id))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                role = COALESCE($3, role),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(dto.name.as_deref())
        .bind(dto.email.as_deref())
        .bind(dto.role.map(|r| r.as_str()))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(email_taken_or)?;

        let mut profile = load_profile(&mut tx, user.id, user.role).await?;
        if profile.is_none() && user.role != current.role {
            profile = Some(insert_profile(&mut tx, issuer, user.id, user.role, fields).await?);
            info!(
                user_id = %user.id,
                from = %current.role,
                to = %user.role,
                "Role changed, profile created"
            );
        }

        tx.commit().await?;

        Ok(UserWithProfile { user, profile })
    }

    /// Deletes a user. Profile rows cascade; issued identifiers are not
    /// returned to the counter.
    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete user")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "User with id {} not found",
                id
            )));
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
