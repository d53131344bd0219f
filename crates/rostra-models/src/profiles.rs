//! Role profiles. Teacher and student profiles hold the year-prefixed IDs
//! issued at creation time.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_DEPARTMENT: &str = "English Department";
pub const DEFAULT_SPECIALIZATION: &str = "English";
pub const DEFAULT_COURSE: &str = "BSIT";
pub const DEFAULT_YEAR_LEVEL: &str = "1st Year";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AdminProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "20251000")]
    pub employee_id: String,
    pub department: String,
    pub specialization: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Dropped,
    Graduated,
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(EnrollmentStatus::Active),
            "dropped" => Ok(EnrollmentStatus::Dropped),
            "graduated" => Ok(EnrollmentStatus::Graduated),
            _ => Err(format!("unknown enrollment status '{}'", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "20251000")]
    pub student_id: String,
    pub course: String,
    pub year_level: String,
    pub section: Option<String>,
    #[sqlx(try_from = "String")]
    pub enrollment_status: EnrollmentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Profile {
    Admin(AdminProfile),
    Teacher(TeacherProfile),
    Student(StudentProfile),
}

impl Profile {
    /// Employee or student ID, if the profile carries one.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Profile::Admin(_) => None,
            Profile::Teacher(t) => Some(&t.employee_id),
            Profile::Student(s) => Some(&s.student_id),
        }
    }
}
