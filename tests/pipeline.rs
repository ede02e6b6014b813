//! Integration tests for the lead → proposal → work order → invoice flow
//! and the audit trail it leaves.

use canopy::app::domain::Role;
use time::OffsetDateTime;

mod common;

use crate::common::*;

#[tokio::test]
async fn accepting_a_proposal_cascades_the_lead_to_won() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let lead_id = create_lead_via_api(&app, "owner-a", None).await;
    let proposal_id =
        create_proposal_via_api(&app, "owner-a", &customer_id, Some(&lead_id)).await;

    let uri = format!("/api/proposals/{}/accept", proposal_id);
    let (status, proposal) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK, "{}", proposal);
    assert_eq!(proposal["status"], "accepted");
    assert!(proposal["acceptedAt"].is_i64());

    // Both transitions committed together.
    let (_, lead) = send(
        &app,
        request("GET", &format!("/api/leads/{}", lead_id), "owner-a", None),
    )
    .await;
    assert_eq!(lead["status"], "won");
}

#[tokio::test]
async fn accepting_a_proposal_without_a_lead_touches_nothing_else() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let other_lead = create_lead_via_api(&app, "owner-a", None).await;
    let proposal_id = create_proposal_via_api(&app, "owner-a", &customer_id, None).await;

    let uri = format!("/api/proposals/{}/accept", proposal_id);
    let (status, proposal) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(proposal["status"], "accepted");

    let (_, lead) = send(
        &app,
        request("GET", &format!("/api/leads/{}", other_lead), "owner-a", None),
    )
    .await;
    assert_eq!(lead["status"], "new");
}

#[tokio::test]
async fn sending_a_proposal_stamps_sent_at() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let proposal_id = create_proposal_via_api(&app, "owner-a", &customer_id, None).await;

    let uri = format!("/api/proposals/{}/send", proposal_id);
    let (status, proposal) = send(&app, request("POST", &uri, "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(proposal["status"], "sent");
    assert!(proposal["sentAt"].is_i64());
}

#[tokio::test]
async fn paying_an_invoice_records_the_full_total() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let invoice_id =
        create_invoice_via_api(&app, "owner-a", &customer_id, "sent", 4102444800).await;

    let uri = format!("/api/invoices/{}/pay", invoice_id);
    let body = serde_json::json!({ "paymentMethod": "card" });
    let (status, invoice) = send(&app, request("POST", &uri, "owner-a", Some(body))).await;
    assert_eq!(status, http::StatusCode::OK, "{}", invoice);
    assert_eq!(invoice["status"], "paid");
    assert_eq!(invoice["amountPaid"], invoice["total"]);
    assert_eq!(invoice["paymentMethod"], "card");
    assert!(invoice["paidAt"].is_i64());
}

#[tokio::test]
async fn overdue_lists_only_sent_invoices_past_due() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let overdue = create_invoice_via_api(&app, "owner-a", &customer_id, "sent", now - 86_400).await;
    create_invoice_via_api(&app, "owner-a", &customer_id, "draft", now - 86_400).await;
    create_invoice_via_api(&app, "owner-a", &customer_id, "sent", now + 86_400).await;

    let (status, invoices) = send(&app, request("GET", "/api/invoices/overdue", "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    let ids: Vec<&str> = invoices
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![overdue.as_str()]);
}

#[tokio::test]
async fn invoices_filter_by_status() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    create_invoice_via_api(&app, "owner-a", &customer_id, "draft", 4102444800).await;
    let sent = create_invoice_via_api(&app, "owner-a", &customer_id, "sent", 4102444800).await;

    let (_, invoices) = send(&app, request("GET", "/api/invoices/status/sent", "owner-a", None)).await;
    let ids: Vec<&str> = invoices
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![sent.as_str()]);
}

#[tokio::test]
async fn schedule_returns_work_orders_inside_the_range() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let customer_id = create_customer_via_api(&app, "owner-a", "Maple Street HOA").await;
    let body = |number: &str, date: i64| {
        serde_json::json!({
            "customerId": customer_id,
            "workOrderNumber": number,
            "status": "scheduled",
            "scheduledDate": date,
        })
    };
    let (_, inside) = send(
        &app,
        request("POST", "/api/work-orders", "owner-a", Some(body("WO-1", 1_000))),
    )
    .await;
    send(
        &app,
        request("POST", "/api/work-orders", "owner-a", Some(body("WO-2", 5_000))),
    )
    .await;

    let (status, listed) = send(
        &app,
        request("GET", "/api/work-orders/schedule?start=500&end=2000", "owner-a", None),
    )
    .await;
    assert_eq!(status, http::StatusCode::OK);
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![inside["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn customer_search_matches_name_email_and_phone() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;

    let body = serde_json::json!({
        "name": "Maple Street HOA",
        "email": "board@maplestreet.example.com",
        "phone": "555-0142",
        "propertyType": "commercial",
    });
    let (status, _) = send(&app, request("POST", "/api/customers", "owner-a", Some(body))).await;
    assert_eq!(status, http::StatusCode::CREATED);
    create_customer_via_api(&app, "owner-a", "Birch Lane Residence").await;

    for term in ["maple", "board@", "0142"] {
        let uri = format!("/api/customers/search?q={}", term);
        let (_, found) = send(&app, request("GET", &uri, "owner-a", None)).await;
        assert_eq!(found.as_array().unwrap().len(), 1, "term {}", term);
        assert_eq!(found.as_array().unwrap()[0]["name"], "Maple Street HOA");
    }
}

#[tokio::test]
async fn mutations_leave_audit_entries_readable_by_managers_only() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    let (org_id, _) = seed_tenant(&pool, "org-a", "owner-a").await;
    seed_user(&pool, &org_id, "crew-1", Role::CrewMember).await;

    let lead_id = create_lead_via_api(&app, "owner-a", None).await;
    let patch = serde_json::json!({ "priority": "urgent" });
    let uri = format!("/api/leads/{}", lead_id);
    let (status, _) = send(&app, request("PATCH", &uri, "owner-a", Some(patch))).await;
    assert_eq!(status, http::StatusCode::OK);

    let (status, entries) = send(&app, request("GET", "/api/audit", "owner-a", None)).await;
    assert_eq!(status, http::StatusCode::OK);
    let entries = entries.as_array().unwrap();
    let update = entries
        .iter()
        .find(|e| e["action"] == "update" && e["resource"] == "lead")
        .expect("update entry");
    assert_eq!(update["resourceId"], lead_id);
    assert_eq!(update["changes"]["priority"], "urgent");
    let create = entries
        .iter()
        .find(|e| e["action"] == "create" && e["resource"] == "lead")
        .expect("create entry");
    assert_eq!(create["resourceId"], lead_id);

    let (status, json) = send(&app, request("GET", "/api/audit", "crew-1", None)).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "permission_denied");
}

#[tokio::test]
async fn audit_entries_never_cross_tenants() {
    let pool = test_pool().await;
    let app = test_router(pool.clone());
    seed_tenant(&pool, "org-a", "owner-a").await;
    seed_tenant(&pool, "org-b", "owner-b").await;

    create_lead_via_api(&app, "owner-a", None).await;

    let (_, entries) = send(&app, request("GET", "/api/audit", "owner-b", None)).await;
    assert_eq!(entries.as_array().unwrap().len(), 0);
}
