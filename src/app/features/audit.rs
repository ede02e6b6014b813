use axum::{
    extract::{Query, State},
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::app::{
    db, db::audit_logs::AuditLog, error::AppError, identity::CurrentUser, AppState,
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// API shape for an audit entry: the stored changes JSON is decoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    pub changes: Option<serde_json::Value>,
    pub created_at: i64,
}

impl AuditLogResponse {
    fn from_row(row: AuditLog) -> Self {
        let changes = row
            .changes
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        AuditLogResponse {
            id: row.id,
            organization_id: row.organization_id,
            user_id: row.user_id,
            action: row.action,
            resource: row.resource,
            resource_id: row.resource_id,
            changes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/audit?limit=.. — Recent audit entries for the caller's
/// organization. Owner and manager only.
pub async fn list_recent(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogResponse>>, AppError> {
    if !user.can_manage_organization() {
        return Err(AppError::PermissionDenied(
            "Permission denied: requires owner or manager role".to_string(),
        ));
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let rows = db::audit_logs::list_recent(&state.db, &user.organization_id, limit).await?;
    Ok(Json(rows.into_iter().map(AuditLogResponse::from_row).collect()))
}

/// Audit routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/audit", routing::get(list_recent))
}
