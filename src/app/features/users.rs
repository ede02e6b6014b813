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
    db::users::{NewUser, User},
    domain::{OrganizationId, Role, UserId},
    error::AppError,
    identity::CurrentUser,
    tenant, AppState,
};

/// API shape for a user. The cached permission column is returned parsed;
/// the raw JSON never leaves the storage layer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub tier: Option<u8>,
    pub is_active: bool,
    pub phone: Option<String>,
    pub permissions: crate::app::domain::PermissionSet,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserResponse {
    pub(crate) fn from_row(row: User) -> Self {
        let tier = row.parsed_tier().map(|t| t.as_u8());
        let permissions = row.parsed_permissions();
        UserResponse {
            id: row.id,
            organization_id: row.organization_id,
            email: row.email,
            name: row.name,
            role: row.role,
            tier,
            is_active: row.is_active,
            phone: row.phone,
            permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request body for inviting a user into the caller's organization. The
/// subject id is the identity provider's stable id for the invitee.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub role: Role,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

/// Request body for updating a user. Profile fields can be changed by the
/// user themselves; the role only by owner/manager.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub role: Option<Role>,
}

fn require_manager(user: &CurrentUser) -> Result<(), AppError> {
    if user.can_manage_organization() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(
            "Permission denied: requires owner or manager role".to_string(),
        ))
    }
}

/// Fetch a user and enforce tenant isolation.
async fn find_scoped(
    pool: &sqlx::SqlitePool,
    caller: &CurrentUser,
    user_id: &str,
) -> Result<User, AppError> {
    let user = db::users::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    tenant::require_same_organization(caller, &user.organization_id)?;
    Ok(user)
}

/// GET /api/users — The caller's team, newest first.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let rows = db::users::list_for_organization(&state.db, &user.organization_id).await?;
    Ok(Json(rows.into_iter().map(UserResponse::from_row).collect()))
}

/// GET /api/users/me — The resolved caller, straight from the extractor's
/// lookup.
pub async fn get_current(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let row = db::users::find_by_id(&state.db, &user.id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(UserResponse::from_row(row)))
}

/// GET /api/users/:id
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let row = find_scoped(&state.db, &user, &user_id).await?;
    Ok(Json(UserResponse::from_row(row)))
}

/// POST /api/users — Invite a user into the caller's organization. Owner
/// and manager only; the new user always lands in the caller's
/// organization and takes a seat.
pub async fn create(
    caller: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_manager(&caller)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    if db::users::find_by_subject(&state.db, &request.subject_id)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "A user with this subject already exists".to_string(),
        ));
    }

    let user_id = UserId::new();
    let new_user = NewUser {
        id: user_id.clone(),
        organization_id: OrganizationId::from_string(&caller.organization_id)
            .map_err(|_| AppError::Internal)?,
        subject_id: request.subject_id,
        email: request.email,
        name: request.name,
        role: request.role,
        phone: request.phone,
    };

    let mut tx = state.db.begin().await?;
    db::users::insert(&mut *tx, &new_user).await?;
    db::organizations::increment_user_count(&mut *tx, &caller.organization_id).await?;
    db::audit_logs::record(
        &mut *tx,
        &caller.organization_id,
        &caller.id,
        AuditAction::Create,
        AuditResource::User,
        &user_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let row = db::users::find_by_id(&state.db, &user_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(UserResponse::from_row(row))))
}

/// PATCH /api/users/:id — Profile changes are allowed for the user
/// themselves or for owner/manager; a role change is owner/manager only
/// and recomputes the cached tier and permission set.
pub async fn update(
    caller: CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    find_scoped(&state.db, &caller, &user_id).await?;
    let is_self = caller.id == user_id;
    if !is_self {
        require_manager(&caller)?;
    }
    if request.role.is_some() {
        require_manager(&caller)?;
    }
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let mut changed = serde_json::Map::new();
    if let Some(name) = &request.name {
        changed.insert("name".to_string(), serde_json::Value::String(name.clone()));
    }
    if let Some(phone) = &request.phone {
        changed.insert("phone".to_string(), serde_json::Value::String(phone.clone()));
    }
    if let Some(role) = request.role {
        changed.insert(
            "role".to_string(),
            serde_json::Value::String(role.to_string()),
        );
    }

    let mut tx = state.db.begin().await?;
    db::users::update_profile(
        &mut *tx,
        &user_id,
        request.name.as_deref(),
        request.phone.as_deref(),
    )
    .await?;
    if let Some(role) = request.role {
        db::users::set_role(&mut *tx, &user_id, role).await?;
    }
    db::audit_logs::record(
        &mut *tx,
        &caller.organization_id,
        &caller.id,
        AuditAction::Update,
        AuditResource::User,
        &user_id,
        Some(serde_json::Value::Object(changed)),
    )
    .await?;
    tx.commit().await?;

    let row = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(UserResponse::from_row(row)))
}

/// POST /api/users/:id/deactivate — Soft removal. The record stays (audit
/// references it), the seat is freed.
pub async fn deactivate(
    caller: CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let target = find_scoped(&state.db, &caller, &user_id).await?;
    require_manager(&caller)?;

    let mut tx = state.db.begin().await?;
    db::users::set_active(&mut *tx, &user_id, false).await?;
    if target.is_active {
        db::organizations::decrement_user_count(&mut *tx, &caller.organization_id).await?;
    }
    db::audit_logs::record(
        &mut *tx,
        &caller.organization_id,
        &caller.id,
        AuditAction::Update,
        AuditResource::User,
        &user_id,
        Some(serde_json::json!({ "isActive": false })),
    )
    .await?;
    tx.commit().await?;

    let row = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(UserResponse::from_row(row)))
}

/// POST /api/users/:id/reactivate — Takes a seat again, so the seat limit
/// is re-checked here: this is the one operation that can fail with
/// `LimitExceeded`.
pub async fn reactivate(
    caller: CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let target = find_scoped(&state.db, &caller, &user_id).await?;
    require_manager(&caller)?;

    // The seat check and the increment are a single conditional UPDATE
    // inside the transaction, so the limit is enforced against the row
    // version being mutated.
    let mut tx = state.db.begin().await?;
    if !target.is_active
        && !db::organizations::claim_seat(&mut *tx, &caller.organization_id).await?
    {
        return Err(AppError::LimitExceeded);
    }
    db::users::set_active(&mut *tx, &user_id, true).await?;
    db::audit_logs::record(
        &mut *tx,
        &caller.organization_id,
        &caller.id,
        AuditAction::Update,
        AuditResource::User,
        &user_id,
        Some(serde_json::json!({ "isActive": true })),
    )
    .await?;
    tx.commit().await?;

    let row = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(UserResponse::from_row(row)))
}

/// User routes. `me` sits above `:id` so the literal segment matches
/// first.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", routing::get(list).post(create))
        .route("/api/users/me", routing::get(get_current))
        .route("/api/users/:id", routing::get(get).patch(update))
        .route("/api/users/:id/deactivate", routing::post(deactivate))
        .route("/api/users/:id/reactivate", routing::post(reactivate))
}
