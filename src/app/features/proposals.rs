use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::proposals::{NewProposal, Proposal, ProposalPatch, ProposalStatus, ServiceLine},
    domain::{Action, OrganizationId, RecordId, Resource, UserId},
    error::AppError,
    identity::CurrentUser,
    tenant, AppState,
};

/// API shape for a proposal: the stored JSON services column is decoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResponse {
    pub id: String,
    pub organization_id: String,
    pub lead_id: Option<String>,
    pub customer_id: String,
    pub proposal_number: String,
    pub status: String,
    pub valid_until: i64,
    pub services: Vec<ServiceLine>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub sent_at: Option<i64>,
    pub accepted_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProposalResponse {
    fn from_row(row: Proposal) -> Result<Self, AppError> {
        let services = serde_json::from_str(&row.services).map_err(|_| AppError::Internal)?;
        Ok(ProposalResponse {
            id: row.id,
            organization_id: row.organization_id,
            lead_id: row.lead_id,
            customer_id: row.customer_id,
            proposal_number: row.proposal_number,
            status: row.status,
            valid_until: row.valid_until,
            services,
            subtotal: row.subtotal,
            tax_rate: row.tax_rate,
            tax_amount: row.tax_amount,
            total: row.total,
            terms: row.terms,
            notes: row.notes,
            sent_at: row.sent_at,
            accepted_at: row.accepted_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Request body for creating a proposal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub lead_id: Option<String>,
    pub customer_id: String,
    #[validate(length(min = 1, max = 64))]
    pub proposal_number: String,
    pub status: ProposalStatus,
    pub valid_until: i64,
    pub services: Vec<ServiceLine>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    #[validate(length(max = 8000))]
    pub terms: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// Request body for partially updating a proposal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    pub status: Option<ProposalStatus>,
    pub services: Option<Vec<ServiceLine>>,
    pub subtotal: Option<f64>,
    pub tax_rate: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total: Option<f64>,
    #[validate(length(max = 8000))]
    pub terms: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// Fetch a proposal and enforce tenant isolation. Every proposal operation
/// that targets an existing record starts here.
async fn find_scoped(
    pool: &sqlx::SqlitePool,
    user: &CurrentUser,
    proposal_id: &str,
) -> Result<Proposal, AppError> {
    let proposal = db::proposals::find_by_id(pool, proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;
    tenant::require_same_organization(user, &proposal.organization_id)?;
    Ok(proposal)
}

/// GET /api/proposals — All proposals of the caller's organization. No tier
/// narrowing: proposals are organization-wide.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProposalResponse>>, AppError> {
    let rows = db::proposals::list_for_organization(&state.db, &user.organization_id).await?;
    let proposals = rows
        .into_iter()
        .map(ProposalResponse::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(proposals))
}

/// GET /api/proposals/:id
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal = find_scoped(&state.db, &user, &proposal_id).await?;
    Ok(Json(ProposalResponse::from_row(proposal)?))
}

/// POST /api/proposals — Create a proposal.
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalResponse>), AppError> {
    user.require_permission(Resource::Proposals, Action::Create)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let proposal_id = RecordId::new();
    let new_proposal = NewProposal {
        id: proposal_id.clone(),
        organization_id: OrganizationId::from_string(&user.organization_id)
            .map_err(|_| AppError::Internal)?,
        lead_id: request.lead_id,
        customer_id: request.customer_id,
        proposal_number: request.proposal_number,
        status: request.status.to_string(),
        valid_until: request.valid_until,
        services: request.services,
        subtotal: request.subtotal,
        tax_rate: request.tax_rate,
        tax_amount: request.tax_amount,
        total: request.total,
        terms: request.terms,
        notes: request.notes,
        created_by: UserId::from_string(&user.id).map_err(|_| AppError::Internal)?,
    };

    let mut tx = state.db.begin().await?;
    db::proposals::insert(&mut *tx, &new_proposal).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Create,
        AuditResource::Proposal,
        &proposal_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let proposal = db::proposals::find_by_id(&state.db, &proposal_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(ProposalResponse::from_row(proposal)?)))
}

/// PATCH /api/proposals/:id
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    Json(request): Json<UpdateProposalRequest>,
) -> Result<Json<ProposalResponse>, AppError> {
    find_scoped(&state.db, &user, &proposal_id).await?;
    user.require_permission(Resource::Proposals, Action::Update)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = ProposalPatch {
        status: request.status.map(|s| s.to_string()),
        services: request.services,
        subtotal: request.subtotal,
        tax_rate: request.tax_rate,
        tax_amount: request.tax_amount,
        total: request.total,
        terms: request.terms,
        notes: request.notes,
    };
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::proposals::patch(&mut *tx, &proposal_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Proposal,
        &proposal_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let proposal = db::proposals::find_by_id(&state.db, &proposal_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(ProposalResponse::from_row(proposal)?))
}

/// DELETE /api/proposals/:id
pub async fn remove(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<StatusCode, AppError> {
    find_scoped(&state.db, &user, &proposal_id).await?;
    user.require_permission(Resource::Proposals, Action::Delete)?;

    let mut tx = state.db.begin().await?;
    db::proposals::delete(&mut *tx, &proposal_id).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Delete,
        AuditResource::Proposal,
        &proposal_id,
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/proposals/:id/send — State transition to `sent`. Gated by
/// tenant membership only, not by the update flag: status transitions are
/// open to any member of the organization.
pub async fn mark_as_sent(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalResponse>, AppError> {
    find_scoped(&state.db, &user, &proposal_id).await?;

    let mut tx = state.db.begin().await?;
    db::proposals::mark_sent(&mut *tx, &proposal_id).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Proposal,
        &proposal_id,
        Some(serde_json::json!({ "status": "sent" })),
    )
    .await?;
    tx.commit().await?;

    let proposal = db::proposals::find_by_id(&state.db, &proposal_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(ProposalResponse::from_row(proposal)?))
}

/// POST /api/proposals/:id/accept — State transition to `accepted`. If the
/// proposal references a lead, that lead is transitioned to `won` in the
/// same transaction: both writes commit or neither does.
pub async fn mark_as_accepted(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal = find_scoped(&state.db, &user, &proposal_id).await?;

    let mut tx = state.db.begin().await?;
    db::proposals::mark_accepted(&mut *tx, &proposal_id).await?;
    if let Some(lead_id) = &proposal.lead_id {
        db::leads::set_status(&mut *tx, lead_id, "won").await?;
    }
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Proposal,
        &proposal_id,
        Some(serde_json::json!({ "status": "accepted" })),
    )
    .await?;
    tx.commit().await?;

    let proposal = db::proposals::find_by_id(&state.db, &proposal_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(ProposalResponse::from_row(proposal)?))
}

/// Proposal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", routing::get(list).post(create))
        .route(
            "/api/proposals/:id",
            routing::get(get).patch(update).delete(remove),
        )
        .route("/api/proposals/:id/send", routing::post(mark_as_sent))
        .route("/api/proposals/:id/accept", routing::post(mark_as_accepted))
}
