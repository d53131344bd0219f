use rostra_core::PaginationMeta;
use rostra_models::{
    AdminProfile, ChangePasswordDto, CreateUserDto, EnrollmentStatus, LoginRequest, LoginResponse,
    MessageResponse, PaginatedUsersResponse, Profile, StudentProfile, TeacherProfile,
    UpdateProfileDto, UpdateUserDto, User, UserRole, UserSummary, UserWithProfile,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::get_profile,
        crate::modules::auth::controller::update_profile,
        crate::modules::auth::controller::change_password,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
    ),
    components(
        schemas(
            User,
            UserRole,
            UserSummary,
            UserWithProfile,
            Profile,
            AdminProfile,
            TeacherProfile,
            StudentProfile,
            EnrollmentStatus,
            CreateUserDto,
            UpdateUserDto,
            UpdateProfileDto,
            ChangePasswordDto,
            LoginRequest,
            LoginResponse,
            MessageResponse,
            PaginatedUsersResponse,
            PaginationMeta,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and the current user's profile"),
        (name = "Users", description = "User management; teachers and students carry year-prefixed IDs")
    ),
    info(
        title = "Rostra API",
        version = "0.1.0",
        description = "User registration API that issues sequential, year-prefixed employee and student IDs.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
