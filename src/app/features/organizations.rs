use axum::{
    extract::{Path, State},
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::organizations::{Organization, OrganizationPatch},
    error::AppError,
    identity::CurrentUser,
    tenant, AppState,
};

/// API shape for an organization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub subscription_status: String,
    pub billing_email: String,
    pub max_users: i64,
    pub user_count: i64,
    pub company_address: Option<String>,
    pub company_phone: Option<String>,
    pub timezone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrganizationResponse {
    fn from_row(row: Organization) -> Self {
        OrganizationResponse {
            id: row.id,
            name: row.name,
            plan: row.plan,
            subscription_status: row.subscription_status,
            billing_email: row.billing_email,
            max_users: row.max_users,
            user_count: row.user_count,
            company_address: row.company_address,
            company_phone: row.company_phone,
            timezone: row.timezone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request body for updating organization settings.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 300))]
    pub company_address: Option<String>,
    #[validate(length(max = 32))]
    pub company_phone: Option<String>,
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
}

/// Seat and plan usage for the settings screen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatsResponse {
    pub active_users: i64,
    pub max_users: i64,
    pub plan: String,
    pub subscription_status: String,
}

async fn find_current(
    pool: &sqlx::SqlitePool,
    user: &CurrentUser,
) -> Result<Organization, AppError> {
    db::organizations::find_by_id(pool, &user.organization_id)
        .await?
        .ok_or(AppError::Internal)
}

/// GET /api/organization — The caller's own organization.
pub async fn get_current(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<OrganizationResponse>, AppError> {
    let organization = find_current(&state.db, &user).await?;
    Ok(Json(OrganizationResponse::from_row(organization)))
}

/// GET /api/organizations/:id — Same data, addressed by id. Tenant
/// isolation still applies: the id must be the caller's organization.
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> Result<Json<OrganizationResponse>, AppError> {
    tenant::require_same_organization(&user, &organization_id)?;
    let organization = db::organizations::find_by_id(&state.db, &organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    Ok(Json(OrganizationResponse::from_row(organization)))
}

/// PATCH /api/organization — Owner and manager only: they are the roles
/// whose settings flag carries update.
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, AppError> {
    if !user.can_manage_organization() {
        return Err(AppError::PermissionDenied(
            "Permission denied: requires owner or manager role".to_string(),
        ));
    }
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = OrganizationPatch {
        name: request.name,
        company_address: request.company_address,
        company_phone: request.company_phone,
        timezone: request.timezone,
    };
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::organizations::patch(&mut *tx, &user.organization_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Organization,
        &user.organization_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let organization = find_current(&state.db, &user).await?;
    Ok(Json(OrganizationResponse::from_row(organization)))
}

/// GET /api/organization/usage — Seat usage against the plan limit. The
/// active count is recomputed from the users table, not read from the
/// denormalized counter, so drift shows up here instead of compounding.
pub async fn usage_stats(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UsageStatsResponse>, AppError> {
    let organization = find_current(&state.db, &user).await?;
    let active_users =
        db::organizations::count_active_users(&state.db, &user.organization_id).await?;
    Ok(Json(UsageStatsResponse {
        active_users,
        max_users: organization.max_users,
        plan: organization.plan,
        subscription_status: organization.subscription_status,
    }))
}

/// Organization routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/organization", routing::get(get_current).patch(update))
        .route("/api/organization/usage", routing::get(usage_stats))
        .route("/api/organizations/:id", routing::get(get))
}
