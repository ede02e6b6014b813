//! Integration tests for team management: invitations, role changes, seat
//! accounting.

use canopy::app::domain::Role;

mod common;

use crate::common::*;

fn invite_body(subject: &str, role: &str) -> serde_json::Value {
    serde_json::json!({
        "subjectId": subject,
        "email": format!("{}@example.com", subject),
        "name": subject,
        "role": role,
    })
}

#[tokio::test]
async fn invite_requires_owner_or_manager() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    seed_user(&pool, &org_id, "seller", Role::Sales).await;

    let (status, json) = send(
        &app,
        request("POST", "/api/users", "seller", Some(invite_body("newbie", "crew_member"))),
    )
    .await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "permission_denied");
}

#[tokio::test]
async fn invited_user_lands_in_callers_organization_with_derived_cache() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;

    let (status, user) = send(
        &app,
        request("POST", "/api/users", "owner-a", Some(invite_body("seller", "sales"))),
    )
    .await;
    assert_eq!(status, http::StatusCode::CREATED, "{}", user);
    assert_eq!(user["organizationId"], org_id);
    assert_eq!(user["role"], "sales");
    assert_eq!(user["tier"], 2);
    assert_eq!(user["permissions"]["leads"]["create"], true);
    assert_eq!(user["permissions"]["settings"]["read"], true);
    assert_eq!(user["permissions"]["settings"]["update"], false);

    // The invitation took a seat.
    let (_, org) = send(&app, request("GET", "/api/organization", "owner-a", None)).await;
    assert_eq!(org["userCount"], 2);
}

#[tokio::test]
async fn duplicate_subject_is_rejected() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let (status, _) = send(
        &app,
        request("POST", "/api/users", "owner-a", Some(invite_body("seller", "sales"))),
    )
    .await;
    assert_eq!(status, http::StatusCode::CREATED);

    let (status, json) = send(
        &app,
        request("POST", "/api/users", "owner-a", Some(invite_body("seller", "sales"))),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "validation");
}

#[tokio::test]
async fn role_change_recomputes_tier_and_permission_cache() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    let seller_id = seed_user(&pool, &org_id, "seller", Role::Sales).await;

    let uri = format!("/api/users/{}", seller_id);
    let body = serde_json::json!({ "role": "crew_member" });
    let (status, user) = send(&app, request("PATCH", &uri, "owner-a", Some(body))).await;
    assert_eq!(status, http::StatusCode::OK, "{}", user);
    assert_eq!(user["role"], "crew_member");
    assert_eq!(user["tier"], 3);
    assert_eq!(user["permissions"]["leads"]["create"], false);
    assert_eq!(user["permissions"]["workOrders"]["update"], true);
    assert_eq!(user["permissions"]["invoices"]["read"], false);

    // The stored cache matches a fresh derivation for the new role.
    let row = canopy::app::db::users::find_by_id(&pool, &seller_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        row.parsed_permissions(),
        canopy::app::domain::derive_permissions(Role::CrewMember)
    );
    assert_eq!(row.parsed_tier().map(|t| t.as_u8()), Some(3));
}

#[tokio::test]
async fn role_change_requires_owner_or_manager() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    let seller_id = seed_user(&pool, &org_id, "seller", Role::Sales).await;

    // Even on their own record.
    let uri = format!("/api/users/{}", seller_id);
    let body = serde_json::json!({ "role": "owner" });
    let (status, json) = send(&app, request("PATCH", &uri, "seller", Some(body))).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "permission_denied");
}

#[tokio::test]
async fn users_update_their_own_profile_but_not_others() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, owner_id) = seed_tenant(&pool, "org-a", "owner-a").await;
    let seller_id = seed_user(&pool, &org_id, "seller", Role::Sales).await;

    let uri = format!("/api/users/{}", seller_id);
    let body = serde_json::json!({ "name": "Sal Esperson", "phone": "555-0100" });
    let (status, user) = send(&app, request("PATCH", &uri, "seller", Some(body))).await;
    assert_eq!(status, http::StatusCode::OK, "{}", user);
    assert_eq!(user["name"], "Sal Esperson");
    assert_eq!(user["phone"], "555-0100");

    let uri = format!("/api/users/{}", owner_id);
    let body = serde_json::json!({ "name": "Not Your Boss" });
    let (status, json) = send(&app, request("PATCH", &uri, "seller", Some(body))).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "permission_denied");
}

#[tokio::test]
async fn deactivate_frees_the_seat_and_reactivate_rechecks_the_limit() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    for i in 1..=4 {
        seed_user(&pool, &org_id, &format!("member-{}", i), Role::CrewMember).await;
    }

    // All 5 seats taken.
    let (_, org) = send(&app, request("GET", "/api/organization", "owner-a", None)).await;
    assert_eq!(org["userCount"], 5);
    assert_eq!(org["maxUsers"], 5);

    let member_1 = canopy::app::db::users::find_by_subject(&pool, "member-1")
        .await
        .unwrap()
        .unwrap()
        .id;
    let uri = format!("/api/users/{}/deactivate", member_1);
    let (status, user) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK, "{}", user);
    assert_eq!(user["isActive"], false);

    let (_, org) = send(&app, request("GET", "/api/organization", "owner-a", None)).await;
    assert_eq!(org["userCount"], 4);

    // The freed seat goes to a new hire.
    let (status, _) = send(
        &app,
        request("POST", "/api/users", "owner-a", Some(invite_body("member-5", "crew_member"))),
    )
    .await;
    assert_eq!(status, http::StatusCode::CREATED);

    // Bringing the deactivated user back would exceed the plan.
    let uri = format!("/api/users/{}/reactivate", member_1);
    let (status, json) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::CONFLICT);
    assert_eq!(json["code"], "limit_exceeded");

    // A failed reactivation leaves both the seat count and the user alone.
    let (_, org) = send(&app, request("GET", "/api/organization", "owner-a", None)).await;
    assert_eq!(org["userCount"], 5);
    let uri = format!("/api/users/{}", member_1);
    let (_, user) = send(&app, request("GET", &uri, "owner-a", None)).await;
    assert_eq!(user["isActive"], false);
}

#[tokio::test]
async fn reactivate_succeeds_when_a_seat_is_free() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    let member_id = seed_user(&pool, &org_id, "member-1", Role::CrewMember).await;

    let uri = format!("/api/users/{}/deactivate", member_id);
    let (status, _) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);

    let uri = format!("/api/users/{}/reactivate", member_id);
    let (status, user) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK, "{}", user);
    assert_eq!(user["isActive"], true);

    let (_, org) = send(&app, request("GET", "/api/organization", "owner-a", None)).await;
    assert_eq!(org["userCount"], 2);
}

#[tokio::test]
async fn deactivation_is_soft_and_management_is_tenant_scoped() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    let member_id = seed_user(&pool, &org_id, "member-1", Role::CrewMember).await;
    seed_tenant(&pool, "org-b", "owner-b").await;

    // Another organization's owner cannot touch this user.
    let uri = format!("/api/users/{}/deactivate", member_id);
    let (status, json) = send(&app, request("POST", &uri, "owner-b", None)).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "access_denied");

    // Deactivation keeps the row.
    let (status, _) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    let row = canopy::app::db::users::find_by_id(&pool, &member_id).await.unwrap();
    assert!(row.is_some());
}

#[tokio::test]
async fn me_returns_the_resolved_caller() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (_, owner_id) = seed_tenant(&pool, "org-a", "owner-a").await;

    let (status, user) = send(&app, request("GET", "/api/users/me", "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(user["id"], owner_id);
    assert_eq!(user["role"], "owner");
}
