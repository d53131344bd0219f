mod common;

use axum::http::StatusCode;
use common::{
    create_test_user, empty_request, generate_unique_email, json_request, login, send,
    setup_test_app, test_state,
};
use rostra_config::IdStrategy;
use rostra_ids::{Identifier, Year};
use rostra_models::UserRole;
use serde_json::json;
use sqlx::PgPool;

fn current_year_first() -> String {
    Identifier::first(Year::current().unwrap()).to_string()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_register_teacher_issues_employee_id(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let email = generate_unique_email();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "name": "Jane Teacher",
                "email": email,
                "password": "password123",
                "role": "teacher"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["email"], email);
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["profile"]["employee_id"], current_year_first());
    assert_eq!(body["profile"]["department"], "English Department");
    assert_eq!(body["profile"]["specialization"], "English");
    assert!(body.get("password").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_register_student_with_profile_fields(pool: PgPool) {
    let app = setup_test_app(pool.clone());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "name": "John Student",
                "email": generate_unique_email(),
                "password": "password123",
                "role": "student",
                "course": "BSCS",
                "section": "B"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["profile"]["student_id"], current_year_first());
    assert_eq!(body["profile"]["course"], "BSCS");
    assert_eq!(body["profile"]["year_level"], "1st Year");
    assert_eq!(body["profile"]["section"], "B");
    assert_eq!(body["profile"]["enrollment_status"], "active");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_register_duplicate_email(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let email = generate_unique_email();
    let body = json!({
        "name": "Jane Teacher",
        "email": email,
        "password": "password123",
        "role": "teacher"
    });

    let (status, _) = send(&app, json_request("POST", "/api/auth/register", None, body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = send(&app, json_request("POST", "/api/auth/register", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "This email is already registered");

    // The failed registration rolled back its counter increment
    let last: i64 = sqlx::query_scalar(
        "SELECT last_value FROM id_counters WHERE entity_class = 'teacher'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(last, 1000);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_login_success(pool: PgPool) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "testpass123", UserRole::Student).await;

    let app = setup_test_app(pool);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": email, "password": "testpass123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["email"], email);
    assert!(body["user"]["profile"]["student_id"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_login_invalid_credentials(pool: PgPool) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "testpass123", UserRole::Teacher).await;

    let app = setup_test_app(pool);
    for (email, password) in [(email.as_str(), "wrongpass"), ("nobody@test.com", "testpass123")] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_profile_and_logout_revokes_token(pool: PgPool) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "testpass123", UserRole::Teacher).await;

    let app = setup_test_app(pool);
    let token = login(&app, &email, "testpass123").await;

    let (status, body) = send(&app, empty_request("GET", "/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email);
    assert!(body["profile"]["employee_id"].is_string());

    let (status, body) = send(&app, empty_request("POST", "/api/auth/logout", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = send(&app, empty_request("GET", "/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has been revoked");

    // A fresh login works again
    let token = login(&app, &email, "testpass123").await;
    let (status, _) = send(&app, empty_request("GET", "/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_update_profile(pool: PgPool) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "testpass123", UserRole::Student).await;

    let app = setup_test_app(pool);
    let token = login(&app, &email, "testpass123").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            json!({ "name": "Renamed Student", "password": "newpass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "Renamed Student");
    assert_eq!(body["role"], "student");

    login(&app, &email, "newpass").await;

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/auth/profile", Some(&token), json!({ "password": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_change_password(pool: PgPool) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "testpass123", UserRole::Teacher).await;

    let app = setup_test_app(pool);
    let token = login(&app, &email, "testpass123").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            json!({ "current_password": "not-it", "new_password": "brandnew123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            json!({ "current_password": "testpass123", "new_password": "brandnew123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, &email, "brandnew123").await;
}
