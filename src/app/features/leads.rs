use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::leads::{Lead, LeadPatch, LeadPriority, LeadStatus, NewLead},
    domain::{Action, OrganizationId, RecordId, Resource, UserId},
    error::AppError,
    identity::CurrentUser,
    scope, tenant, AppState,
};

/// Request body for creating a lead.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub customer_id: Option<String>,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    #[validate(length(min = 1, max = 255))]
    pub source: String,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
    pub estimated_value: Option<f64>,
    pub scheduled_date: Option<i64>,
    pub assigned_to: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// Request body for partially updating a lead.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadRequest {
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    #[validate(length(min = 1, max = 255))]
    pub source: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub description: Option<String>,
    pub estimated_value: Option<f64>,
    pub scheduled_date: Option<i64>,
    pub assigned_to: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

impl UpdateLeadRequest {
    fn into_patch(self) -> LeadPatch {
        LeadPatch {
            status: self.status.map(|s| s.to_string()),
            priority: self.priority.map(|p| p.to_string()),
            source: self.source,
            description: self.description,
            estimated_value: self.estimated_value,
            scheduled_date: self.scheduled_date,
            assigned_to: self.assigned_to,
            notes: self.notes,
        }
    }
}

/// GET /api/leads — All leads visible to the caller. Tiers 1-2 see the
/// whole organization, tier 3 only assigned leads, tier 4 and no-tier none.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let leads = db::leads::list_for_organization(&state.db, &user.organization_id).await?;
    Ok(Json(scope::narrow_by_tier(user.tier, &user.id, leads)))
}

/// GET /api/leads/status/:status — Leads in one pipeline status, organization scope.
pub async fn list_by_status(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(status): Path<LeadStatus>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let leads =
        db::leads::list_by_status(&state.db, &user.organization_id, &status.to_string()).await?;
    Ok(Json(leads))
}

/// GET /api/leads/assigned/:user_id — Leads assigned to one user, organization scope.
pub async fn list_by_assignee(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(assignee_id): Path<String>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let leads =
        db::leads::list_by_assignee(&state.db, &user.organization_id, &assignee_id).await?;
    Ok(Json(leads))
}

/// GET /api/leads/:id — Single lead. Tenant check first; tier 3 callers
/// must additionally be the assignee.
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    let lead = db::leads::find_by_id(&state.db, &lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;
    tenant::require_same_organization(&user, &lead.organization_id)?;
    scope::require_visible(&user, &lead)?;
    Ok(Json(lead))
}

/// POST /api/leads — Create a lead.
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    user.require_permission(Resource::Leads, Action::Create)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let lead_id = RecordId::new();
    let new_lead = NewLead {
        id: lead_id.clone(),
        organization_id: OrganizationId::from_string(&user.organization_id)
            .map_err(|_| AppError::Internal)?,
        customer_id: request.customer_id,
        status: request.status.to_string(),
        priority: request.priority.to_string(),
        source: request.source,
        description: request.description,
        estimated_value: request.estimated_value,
        scheduled_date: request.scheduled_date,
        assigned_to: request.assigned_to,
        notes: request.notes,
        created_by: UserId::from_string(&user.id).map_err(|_| AppError::Internal)?,
    };

    let mut tx = state.db.begin().await?;
    db::leads::insert(&mut *tx, &new_lead).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Create,
        AuditResource::Lead,
        &lead_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let lead = db::leads::find_by_id(&state.db, &lead_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// PATCH /api/leads/:id — Partial update: tenant check, then permission,
/// then the write and its audit entry in one transaction.
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, AppError> {
    let lead = db::leads::find_by_id(&state.db, &lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;
    tenant::require_same_organization(&user, &lead.organization_id)?;
    user.require_permission(Resource::Leads, Action::Update)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = request.into_patch();
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::leads::patch(&mut *tx, &lead_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Lead,
        &lead_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let lead = db::leads::find_by_id(&state.db, &lead_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(lead))
}

/// DELETE /api/leads/:id — Hard delete, with audit.
pub async fn remove(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let lead = db::leads::find_by_id(&state.db, &lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;
    tenant::require_same_organization(&user, &lead.organization_id)?;
    user.require_permission(Resource::Leads, Action::Delete)?;

    let mut tx = state.db.begin().await?;
    db::leads::delete(&mut *tx, &lead_id).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Delete,
        AuditResource::Lead,
        &lead_id,
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lead routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", routing::get(list).post(create))
        .route("/api/leads/status/:status", routing::get(list_by_status))
        .route("/api/leads/assigned/:user_id", routing::get(list_by_assignee))
        .route("/api/leads/:id", routing::get(get).patch(update).delete(remove))
}
