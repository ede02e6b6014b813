//! Integration tests for first-run provisioning and identity resolution.

use tower::ServiceExt;

mod common;

use crate::common::*;

fn setup_body(org: &str, email: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "organizationName": org,
        "email": email,
        "name": name,
    })
}

#[tokio::test]
async fn missing_subject_header_is_unauthenticated() {
    let pool = test_pool().await;
    let app = test_router(pool);

    let response = app
        .oneshot(anonymous_request("GET", "/api/leads"))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_subject_is_not_provisioned() {
    let pool = test_pool().await;
    let app = test_router(pool);

    let (status, json) = send(&app, request("GET", "/api/leads", "stranger", None)).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "not_provisioned");
}

#[tokio::test]
async fn setup_provisions_organization_and_owner() {
    let pool = test_pool().await;
    let app = test_router(pool);

    let body = setup_body("Shady Oaks Tree Care", "boss@shadyoaks.example.com", "Pat");
    let (status, user) = send(
        &app,
        request("POST", "/api/onboarding/setup", "subj-pat", Some(body)),
    )
    .await;
    assert_eq!(status, http::StatusCode::CREATED, "{}", user);
    assert_eq!(user["role"], "owner");
    assert_eq!(user["tier"], 1);
    assert_eq!(user["isActive"], true);
    assert_eq!(user["permissions"]["settings"]["update"], true);

    let (status, org) = send(&app, request("GET", "/api/organization", "subj-pat", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(org["name"], "Shady Oaks Tree Care");
    assert_eq!(org["plan"], "base");
    assert_eq!(org["subscriptionStatus"], "trialing");
    assert_eq!(org["maxUsers"], 5);
    assert_eq!(org["userCount"], 1);
}

#[tokio::test]
async fn setup_is_idempotent_per_subject() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());

    let body = setup_body("Canopy Crew LLC", "owner@canopycrew.example.com", "Sam");
    let (first_status, first) = send(
        &app,
        request("POST", "/api/onboarding/setup", "subj-sam", Some(body.clone())),
    )
    .await;
    assert_eq!(first_status, http::StatusCode::CREATED);

    // A retry after a lost response must return the same user, not create
    // a second organization.
    let (second_status, second) = send(
        &app,
        request("POST", "/api/onboarding/setup", "subj-sam", Some(body)),
    )
    .await;
    assert_eq!(second_status, http::StatusCode::OK);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["organizationId"], second["organizationId"]);

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM organizations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn setup_writes_audit_entries_for_organization_and_owner() {
    let pool = test_pool().await;
    let app = test_router(pool);

    let body = setup_body("Evergreen Ltd", "owner@evergreen.example.com", "Kim");
    let (status, _) = send(
        &app,
        request("POST", "/api/onboarding/setup", "subj-kim", Some(body)),
    )
    .await;
    assert_eq!(status, http::StatusCode::CREATED);

    let (status, entries) = send(&app, request("GET", "/api/audit", "subj-kim", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    let resources: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["resource"].as_str().unwrap())
        .collect();
    assert!(resources.contains(&"organization"));
    assert!(resources.contains(&"user"));
}
