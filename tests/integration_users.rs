mod common;

use axum::http::StatusCode;
use common::{
    create_dto, create_test_user, empty_request, generate_unique_email, json_request, login, send,
    setup_test_app, test_state,
};
use rostra::modules::users::registration::RegistrationService;
use rostra_config::IdStrategy;
use rostra_ids::Year;
use rostra_models::{Profile, UserRole};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashSet;

fn id(sequence: u64) -> String {
    format!("{}{}", Year::current().unwrap(), sequence)
}

async fn admin_token(pool: &PgPool) -> (axum::Router, String) {
    let state = test_state(pool.clone(), IdStrategy::Counter);
    let email = generate_unique_email();
    create_test_user(&state, &email, "adminpass123", UserRole::Admin).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &email, "adminpass123").await;
    (app, token)
}

fn identifier_of(user: &rostra_models::UserWithProfile) -> String {
    user.profile
        .as_ref()
        .and_then(Profile::identifier)
        .unwrap()
        .to_string()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_identifiers_are_sequential_per_class(pool: PgPool) {
    let state = test_state(pool, IdStrategy::Counter);

    let mut teacher_ids = Vec::new();
    for _ in 0..3 {
        let user = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Teacher).await;
        teacher_ids.push(identifier_of(&user));
    }
    let student = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;

    assert_eq!(teacher_ids, vec![id(1000), id(1001), id(1002)]);
    assert_eq!(identifier_of(&student), id(1000));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_concurrent_registrations_get_distinct_gap_free_ids(pool: PgPool) {
    for strategy in [IdStrategy::Counter, IdStrategy::Scan] {
        let state = test_state(pool.clone(), strategy);
        let class_role = match strategy {
            IdStrategy::Counter => UserRole::Teacher,
            IdStrategy::Scan => UserRole::Student,
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    let dto = create_dto(&generate_unique_email(), "password123", class_role);
                    RegistrationService::register(&state.db, &state.ids, dto).await
                })
            })
            .collect();

        let mut issued = HashSet::new();
        for handle in handles {
            let user = handle.await.unwrap().unwrap();
            assert!(issued.insert(identifier_of(&user)), "duplicate id on {}", strategy);
        }

        let expected: HashSet<String> = (1000..1008).map(id).collect();
        assert_eq!(issued, expected, "strategy {}", strategy);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_counter_never_reissues_after_delete(pool: PgPool) {
    let (app, token) = admin_token(&pool).await;
    let state = test_state(pool, IdStrategy::Counter);

    let first = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Teacher).await;
    let second = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&second), id(1001));

    let (status, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/users/{}", second.user.id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let third = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&first), id(1000));
    assert_eq!(identifier_of(&third), id(1002));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_scan_reissues_after_delete(pool: PgPool) {
    let (app, token) = admin_token(&pool).await;
    let state = test_state(pool, IdStrategy::Scan);

    create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;
    let second = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;
    assert_eq!(identifier_of(&second), id(1001));

    let (status, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/users/{}", second.user.id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let third = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;
    assert_eq!(identifier_of(&third), id(1001));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_counter_continues_after_scan_issued_ids(pool: PgPool) {
    let scan = test_state(pool.clone(), IdStrategy::Scan);
    for _ in 0..2 {
        create_test_user(&scan, &generate_unique_email(), "password123", UserRole::Teacher).await;
    }

    let counter = test_state(pool, IdStrategy::Counter);
    let user = create_test_user(&counter, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&user), id(1002));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_counter_catches_up_after_scan_overtakes_it(pool: PgPool) {
    let counter = test_state(pool.clone(), IdStrategy::Counter);
    let scan = test_state(pool, IdStrategy::Scan);

    let first = create_test_user(&counter, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&first), id(1000));

    let second = create_test_user(&scan, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&second), id(1001));

    // The counter row still holds 1000 here.
    let third = create_test_user(&counter, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&third), id(1002));

    let fourth = create_test_user(&counter, &generate_unique_email(), "password123", UserRole::Teacher).await;
    assert_eq!(identifier_of(&fourth), id(1003));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_admin_creates_and_fetches_user(pool: PgPool) {
    let (app, token) = admin_token(&pool).await;

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/users",
            Some(&token),
            json!({
                "name": "Created Teacher",
                "email": generate_unique_email(),
                "password": "password123",
                "role": "teacher",
                "department": "Math Department",
                "specialization": "Algebra"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["profile"]["department"], "Math Department");

    let (status, fetched) = send(
        &app,
        empty_request("GET", &format!("/api/users/{}", created["id"].as_str().unwrap()), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["profile"]["employee_id"], created["profile"]["employee_id"]);

    let (status, _) = send(
        &app,
        empty_request("GET", "/api/users/00000000-0000-0000-0000-000000000000", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_role_change_allocates_identifier(pool: PgPool) {
    let (app, token) = admin_token(&pool).await;
    let state = test_state(pool, IdStrategy::Counter);
    let student = create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/users/{}", student.user.id),
            Some(&token),
            json!({ "role": "teacher", "department": "Science Department" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["profile"]["employee_id"], id(1000));
    assert_eq!(body["profile"]["department"], "Science Department");

    // Switching back reuses the existing student profile
    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/users/{}", student.user.id),
            Some(&token),
            json!({ "role": "student" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["student_id"], identifier_of(&student));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_list_users_by_viewer_role(pool: PgPool) {
    let (app, admin) = admin_token(&pool).await;
    let state = test_state(pool, IdStrategy::Counter);

    let teacher_email = generate_unique_email();
    create_test_user(&state, &teacher_email, "password123", UserRole::Teacher).await;
    for _ in 0..3 {
        create_test_user(&state, &generate_unique_email(), "password123", UserRole::Student).await;
    }

    let (status, body) = send(&app, empty_request("GET", "/api/users?per_page=2", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["meta"]["total"], 5);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["has_more"], true);

    let (_, body) = send(&app, empty_request("GET", "/api/users?role=teacher", Some(&admin))).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["employee_id"], id(1000));

    let teacher = login(&app, &teacher_email, "password123").await;
    let (status, body) = send(&app, empty_request("GET", "/api/users", Some(&teacher))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);
    assert!(body["data"].as_array().unwrap().iter().all(|u| u["role"] == "student"));

    let (status, _) = send(&app, empty_request("GET", "/api/users?role=admin", Some(&teacher))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        empty_request("DELETE", "/api/users/00000000-0000-0000-0000-000000000000", Some(&teacher)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_delete_missing_user(pool: PgPool) {
    let (app, token) = admin_token(&pool).await;
    let (status, body) = send(
        &app,
        empty_request("DELETE", "/api/users/00000000-0000-0000-0000-000000000000", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}
