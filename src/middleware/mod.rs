//! Authentication extractors.
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] verifies the JWT, loads the user and checks the
//!    token version
//! 3. [`auth::RequireAdmin`] / [`auth::RequireStaff`] check the role
//!
//! ```ignore
//! async fn list_users(RequireStaff(auth_user): RequireStaff) -> impl IntoResponse {
//!     // admins and teachers only
//! }
//! ```

pub mod auth;
