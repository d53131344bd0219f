//! Users, roles and the DTOs that create and modify them.

use rostra_core::serde::deserialize_optional_trimmed;
use rostra_core::{PaginationMeta, PaginationParams};
use rostra_ids::EntityClass;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::profiles::Profile;

/// Role stored in `users.role`. Determines which profile table a user has
/// a row in and, for teachers and students, which identifier namespace
/// their ID comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}', expected 'admin', 'teacher' or 'student'")]
pub struct ParseRoleError(pub String);

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    /// Identifier namespace for roles that carry one.
    pub fn entity_class(&self) -> Option<EntityClass> {
        match self {
            UserRole::Admin => None,
            UserRole::Teacher => Some(EntityClass::Teacher),
            UserRole::Student => Some(EntityClass::Student),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Teacher)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A row of `users`. The password hash and token version never leave the
/// server.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token_version: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A user together with the profile row for their role.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    /// `None` only for users whose profile row is missing
    pub profile: Option<Profile>,
}

/// List row: the user plus whichever identifier their role carries.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Body of `POST /api/auth/register` and `POST /api/users`.
///
/// The profile fields only apply to the matching role and fall back to
/// institution defaults when absent.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 4, message = "name must be at least 4 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
    /// Teachers only (default "English Department")
    pub department: Option<String>,
    /// Teachers only (default "English")
    pub specialization: Option<String>,
    /// Students only (default "BSIT")
    pub course: Option<String>,
    /// Students only (default "1st Year")
    pub year_level: Option<String>,
    /// Students only
    pub section: Option<String>,
}

/// Body of `PUT /api/users/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 4, message = "name must be at least 4 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    /// Switching to teacher or student allocates an ID if the user has no
    /// profile for that role yet
    pub role: Option<UserRole>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<String>,
    pub section: Option<String>,
}

/// Body of `PUT /api/auth/profile`. The role cannot be changed here.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 4, message = "name must be at least 4 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1, message = "current_password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "new_password must be at least 8 characters"))]
    pub new_password: String,
}

/// Query parameters of `GET /api/users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilterParams {
    /// `admin`, `teacher` or `student`
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<UserSummary>,
    pub meta: PaginationMeta,
}
