use axum::{extract::State, http::StatusCode, routing, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::organizations::{NewOrganization, Plan, SubscriptionStatus},
    db::users::NewUser,
    domain::{OrganizationId, Role, UserId},
    error::AppError,
    identity::AuthSubject,
    AppState,
};

use super::users::UserResponse;

const DEFAULT_PLAN: Plan = Plan::Base;
const DEFAULT_SUBSCRIPTION_STATUS: SubscriptionStatus = SubscriptionStatus::Trialing;
const DEFAULT_MAX_USERS: i64 = 5;

/// Request body for first-run setup.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    #[validate(length(min = 1, max = 200))]
    pub organization_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

/// POST /api/onboarding/setup — Auto-provision an organization and its
/// owner for a verified subject that has no user record yet.
///
/// Idempotent per subject: if a record already exists the call returns it
/// unchanged, so a client retrying after a lost response cannot create a
/// second organization.
pub async fn setup(
    AuthSubject(subject): AuthSubject,
    State(state): State<AppState>,
    Json(request): Json<SetupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if let Some(existing) = db::users::find_by_subject(&state.db, &subject).await? {
        return Ok((StatusCode::OK, Json(UserResponse::from_row(existing))));
    }

    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let organization_id = OrganizationId::new();
    let user_id = UserId::new();

    let new_organization = NewOrganization {
        id: organization_id.clone(),
        name: request.organization_name,
        plan: DEFAULT_PLAN,
        subscription_status: DEFAULT_SUBSCRIPTION_STATUS,
        billing_email: request.email.clone(),
        max_users: DEFAULT_MAX_USERS,
        user_count: 1,
    };
    let new_user = NewUser {
        id: user_id.clone(),
        organization_id: organization_id.clone(),
        subject_id: subject,
        email: request.email,
        name: request.name,
        role: Role::Owner,
        phone: request.phone,
    };

    let mut tx = state.db.begin().await?;
    db::organizations::insert(&mut *tx, &new_organization).await?;
    db::users::insert(&mut *tx, &new_user).await?;
    db::audit_logs::record(
        &mut *tx,
        &organization_id.as_str(),
        &user_id.as_str(),
        AuditAction::Create,
        AuditResource::Organization,
        &organization_id.as_str(),
        None,
    )
    .await?;
    db::audit_logs::record(
        &mut *tx,
        &organization_id.as_str(),
        &user_id.as_str(),
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

/// Onboarding routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/onboarding/setup", routing::post(setup))
}
