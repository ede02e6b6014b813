use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::work_orders::{ChecklistItem, NewWorkOrder, WorkOrder, WorkOrderPatch, WorkOrderStatus},
    domain::{Action, OrganizationId, RecordId, Resource, UserId},
    error::AppError,
    identity::CurrentUser,
    scope, tenant, AppState,
};

/// API shape for a work order: the stored JSON list columns are decoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderResponse {
    pub id: String,
    pub organization_id: String,
    pub proposal_id: Option<String>,
    pub customer_id: String,
    pub work_order_number: String,
    pub status: String,
    pub scheduled_date: i64,
    pub completed_date: Option<i64>,
    pub assigned_crew: Vec<String>,
    pub services: Vec<ChecklistItem>,
    pub equipment: Vec<String>,
    pub safety_notes: Option<String>,
    pub job_notes: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkOrderResponse {
    fn from_row(row: WorkOrder) -> Result<Self, AppError> {
        let assigned_crew = row.crew();
        let services = serde_json::from_str(&row.services).map_err(|_| AppError::Internal)?;
        let equipment = serde_json::from_str(&row.equipment).map_err(|_| AppError::Internal)?;
        Ok(WorkOrderResponse {
            id: row.id,
            organization_id: row.organization_id,
            proposal_id: row.proposal_id,
            customer_id: row.customer_id,
            work_order_number: row.work_order_number,
            status: row.status,
            scheduled_date: row.scheduled_date,
            completed_date: row.completed_date,
            assigned_crew,
            services,
            equipment,
            safety_notes: row.safety_notes,
            job_notes: row.job_notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Request body for creating a work order.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    pub proposal_id: Option<String>,
    pub customer_id: String,
    #[validate(length(min = 1, max = 64))]
    pub work_order_number: String,
    pub status: WorkOrderStatus,
    pub scheduled_date: i64,
    #[serde(default)]
    pub assigned_crew: Vec<String>,
    #[serde(default)]
    pub services: Vec<ChecklistItem>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[validate(length(max = 4000))]
    pub safety_notes: Option<String>,
    #[validate(length(max = 4000))]
    pub job_notes: Option<String>,
}

/// Request body for partially updating a work order.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderRequest {
    pub status: Option<WorkOrderStatus>,
    pub scheduled_date: Option<i64>,
    pub assigned_crew: Option<Vec<String>>,
    pub services: Option<Vec<ChecklistItem>>,
    pub equipment: Option<Vec<String>>,
    #[validate(length(max = 4000))]
    pub safety_notes: Option<String>,
    #[validate(length(max = 4000))]
    pub job_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: i64,
    pub end: i64,
}

/// GET /api/work-orders — Field-tier callers only see work orders whose
/// crew includes them; executive and office tiers see everything.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkOrderResponse>>, AppError> {
    let rows = db::work_orders::list_for_organization(&state.db, &user.organization_id).await?;
    let visible = scope::narrow_by_tier(user.tier, &user.id, rows);
    let work_orders = visible
        .into_iter()
        .map(WorkOrderResponse::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(work_orders))
}

/// GET /api/work-orders/schedule?start=..&end=.. — The crew schedule view,
/// narrowed the same way as list.
pub async fn list_by_date_range(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<WorkOrderResponse>>, AppError> {
    let rows = db::work_orders::list_in_date_range(
        &state.db,
        &user.organization_id,
        query.start,
        query.end,
    )
    .await?;
    let visible = scope::narrow_by_tier(user.tier, &user.id, rows);
    let work_orders = visible
        .into_iter()
        .map(WorkOrderResponse::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(work_orders))
}

/// GET /api/work-orders/:id — Tenant check plus crew-membership visibility
/// for field-tier callers.
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
) -> Result<Json<WorkOrderResponse>, AppError> {
    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Work order not found".to_string()))?;
    tenant::require_same_organization(&user, &work_order.organization_id)?;
    scope::require_visible(&user, &work_order)?;
    Ok(Json(WorkOrderResponse::from_row(work_order)?))
}

/// POST /api/work-orders
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<WorkOrderResponse>), AppError> {
    user.require_permission(Resource::WorkOrders, Action::Create)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let work_order_id = RecordId::new();
    let new_work_order = NewWorkOrder {
        id: work_order_id.clone(),
        organization_id: OrganizationId::from_string(&user.organization_id)
            .map_err(|_| AppError::Internal)?,
        proposal_id: request.proposal_id,
        customer_id: request.customer_id,
        work_order_number: request.work_order_number,
        status: request.status.to_string(),
        scheduled_date: request.scheduled_date,
        assigned_crew: request.assigned_crew,
        services: request.services,
        equipment: request.equipment,
        safety_notes: request.safety_notes,
        job_notes: request.job_notes,
        created_by: UserId::from_string(&user.id).map_err(|_| AppError::Internal)?,
    };

    let mut tx = state.db.begin().await?;
    db::work_orders::insert(&mut *tx, &new_work_order).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Create,
        AuditResource::WorkOrder,
        &work_order_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(WorkOrderResponse::from_row(work_order)?)))
}

/// PATCH /api/work-orders/:id — Crews carry the update flag, so this is
/// how checklists and job notes get filled in from the field.
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
    Json(request): Json<UpdateWorkOrderRequest>,
) -> Result<Json<WorkOrderResponse>, AppError> {
    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Work order not found".to_string()))?;
    tenant::require_same_organization(&user, &work_order.organization_id)?;
    user.require_permission(Resource::WorkOrders, Action::Update)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = WorkOrderPatch {
        status: request.status.map(|s| s.to_string()),
        scheduled_date: request.scheduled_date,
        assigned_crew: request.assigned_crew,
        services: request.services,
        equipment: request.equipment,
        safety_notes: request.safety_notes,
        job_notes: request.job_notes,
    };
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::work_orders::patch(&mut *tx, &work_order_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::WorkOrder,
        &work_order_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(WorkOrderResponse::from_row(work_order)?))
}

/// POST /api/work-orders/:id/complete — State transition to `completed`.
/// Tenant membership only; crews close out their own jobs.
pub async fn mark_as_completed(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
) -> Result<Json<WorkOrderResponse>, AppError> {
    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Work order not found".to_string()))?;
    tenant::require_same_organization(&user, &work_order.organization_id)?;

    let mut tx = state.db.begin().await?;
    db::work_orders::mark_completed(&mut *tx, &work_order_id).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::WorkOrder,
        &work_order_id,
        Some(serde_json::json!({ "status": "completed" })),
    )
    .await?;
    tx.commit().await?;

    let work_order = db::work_orders::find_by_id(&state.db, &work_order_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(WorkOrderResponse::from_row(work_order)?))
}

/// Work order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/work-orders", routing::get(list).post(create))
        .route("/api/work-orders/schedule", routing::get(list_by_date_range))
        .route("/api/work-orders/:id", routing::get(get).patch(update))
        .route("/api/work-orders/:id/complete", routing::post(mark_as_completed))
}
