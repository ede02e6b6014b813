#![allow(dead_code)]

use axum::body::Body;
use canopy::app::db;
use canopy::app::domain::{OrganizationId, Role, UserId};
use canopy::create_router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_router(pool: SqlitePool) -> axum::Router {
    let state = canopy::app::AppState {
        db: pool,
        config: canopy::app::config::Config::for_tests(),
    };
    create_router(state)
}

/// Insert an organization directly, returning its id.
pub async fn seed_organization(pool: &SqlitePool, name: &str) -> String {
    let id = OrganizationId::new();
    let org = db::organizations::NewOrganization {
        id: id.clone(),
        name: name.to_string(),
        plan: db::organizations::Plan::Base,
        subscription_status: db::organizations::SubscriptionStatus::Trialing,
        billing_email: format!("billing@{}.example.com", name),
        max_users: 5,
        user_count: 0,
    };
    db::organizations::insert(pool, &org).await.unwrap();
    id.as_str()
}

/// Insert a user with the given role directly, counting the seat. The
/// subject id doubles as the auth header value in requests.
pub async fn seed_user(
    pool: &SqlitePool,
    organization_id: &str,
    subject: &str,
    role: Role,
) -> String {
    let id = UserId::new();
    let user = db::users::NewUser {
        id: id.clone(),
        organization_id: OrganizationId::from_string(organization_id).unwrap(),
        subject_id: subject.to_string(),
        email: format!("{}@example.com", subject),
        name: subject.to_string(),
        role,
        phone: None,
    };
    db::users::insert(pool, &user).await.unwrap();
    db::organizations::increment_user_count(pool, organization_id).await.unwrap();
    id.as_str()
}

/// One organization with an owner, ready to make requests.
pub async fn seed_tenant(pool: &SqlitePool, name: &str, owner_subject: &str) -> (String, String) {
    let org_id = seed_organization(pool, name).await;
    let owner_id = seed_user(pool, &org_id, owner_subject, Role::Owner).await;
    (org_id, owner_id)
}

/// Build a request authenticated as `subject`, with an optional JSON body.
pub fn request(method: &str, uri: &str, subject: &str, body: Option<serde_json::Value>) -> http::Request<Body> {
    let builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("x-auth-subject", subject);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build an unauthenticated request.
pub fn anonymous_request(method: &str, uri: &str) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and decode the JSON response body.
pub async fn send(
    app: &axum::Router,
    request: http::Request<Body>,
) -> (http::StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Create a lead through the API as `subject`, returning its id.
pub async fn create_lead_via_api(
    app: &axum::Router,
    subject: &str,
    assigned_to: Option<&str>,
) -> String {
    let body = serde_json::json!({
        "status": "new",
        "priority": "medium",
        "source": "referral",
        "description": "Remove the dead oak by the driveway",
        "assignedTo": assigned_to,
    });
    let (status, json) = send(app, request("POST", "/api/leads", subject, Some(body))).await;
    assert_eq!(status, http::StatusCode::CREATED, "lead create failed: {}", json);
    json["id"].as_str().unwrap().to_string()
}

/// Create a customer through the API as `subject`, returning its id.
pub async fn create_customer_via_api(app: &axum::Router, subject: &str, name: &str) -> String {
    let body = serde_json::json!({
        "name": name,
        "propertyType": "residential",
        "tags": ["priority"],
    });
    let (status, json) = send(app, request("POST", "/api/customers", subject, Some(body))).await;
    assert_eq!(status, http::StatusCode::CREATED, "customer create failed: {}", json);
    json["id"].as_str().unwrap().to_string()
}

/// Create a proposal through the API as `subject`, returning its id.
pub async fn create_proposal_via_api(
    app: &axum::Router,
    subject: &str,
    customer_id: &str,
    lead_id: Option<&str>,
) -> String {
    let body = serde_json::json!({
        "leadId": lead_id,
        "customerId": customer_id,
        "proposalNumber": "P-1001",
        "status": "draft",
        "validUntil": 4102444800i64,
        "services": [{
            "name": "Tree removal",
            "description": "Remove dead oak, grind stump",
            "quantity": 1.0,
            "unit": "job",
            "rate": 1200.0,
            "total": 1200.0,
        }],
        "subtotal": 1200.0,
        "taxRate": 0.07,
        "taxAmount": 84.0,
        "total": 1284.0,
    });
    let (status, json) = send(app, request("POST", "/api/proposals", subject, Some(body))).await;
    assert_eq!(status, http::StatusCode::CREATED, "proposal create failed: {}", json);
    json["id"].as_str().unwrap().to_string()
}

/// Create a work order through the API as `subject`, returning its id.
pub async fn create_work_order_via_api(
    app: &axum::Router,
    subject: &str,
    customer_id: &str,
    crew: &[&str],
) -> String {
    let body = serde_json::json!({
        "customerId": customer_id,
        "workOrderNumber": "WO-1001",
        "status": "scheduled",
        "scheduledDate": 4102444800i64,
        "assignedCrew": crew,
        "services": [{
            "name": "Tree removal",
            "description": "Remove dead oak",
            "completed": false,
        }],
        "equipment": ["chipper"],
    });
    let (status, json) = send(app, request("POST", "/api/work-orders", subject, Some(body))).await;
    assert_eq!(status, http::StatusCode::CREATED, "work order create failed: {}", json);
    json["id"].as_str().unwrap().to_string()
}

/// Create an invoice through the API as `subject`, returning its id.
pub async fn create_invoice_via_api(
    app: &axum::Router,
    subject: &str,
    customer_id: &str,
    status: &str,
    due_date: i64,
) -> String {
    let body = serde_json::json!({
        "customerId": customer_id,
        "invoiceNumber": "INV-1001",
        "status": status,
        "dueDate": due_date,
        "lineItems": [{
            "description": "Tree removal",
            "quantity": 1.0,
            "rate": 1200.0,
            "total": 1200.0,
        }],
        "subtotal": 1200.0,
        "taxRate": 0.07,
        "taxAmount": 84.0,
        "total": 1284.0,
    });
    let (code, json) = send(app, request("POST", "/api/invoices", subject, Some(body))).await;
    assert_eq!(code, http::StatusCode::CREATED, "invoice create failed: {}", json);
    json["id"].as_str().unwrap().to_string()
}
