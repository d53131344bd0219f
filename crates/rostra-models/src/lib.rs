//! # Rostra Models
//!
//! Database rows, request DTOs and response shapes for the Rostra API.
//!
//! - [`users`]: users, roles and user management DTOs
//! - [`profiles`]: role profiles carrying employee and student IDs
//! - [`auth`]: login and generic message responses

pub mod auth;
pub mod profiles;
pub mod users;

pub use auth::{LoginRequest, LoginResponse, MessageResponse};
pub use profiles::{
    AdminProfile, DEFAULT_COURSE, DEFAULT_DEPARTMENT, DEFAULT_SPECIALIZATION, DEFAULT_YEAR_LEVEL,
    EnrollmentStatus, Profile, StudentProfile, TeacherProfile,
};
pub use users::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, ParseRoleError, UpdateProfileDto,
    UpdateUserDto, User, UserFilterParams, UserRole, UserSummary, UserWithProfile,
};
