use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    change_password, get_profile, login_user, logout, register_user, update_profile,
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
}
