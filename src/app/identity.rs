//! Identity resolution: maps the gateway-verified subject id to the
//! internal user record.
//!
//! Every operation goes through [`CurrentUser`]; no handler reads the
//! subject header directly. Authentication itself (token verification)
//! happens upstream; the gateway forwards only the stable subject id.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::app::{
    db,
    domain::{Action, PermissionSet, Resource, Role, Tier},
    error::AppError,
    AppState,
};

/// The verified external identity of a request. Extraction fails with
/// `Unauthenticated` when the gateway header is missing or empty.
#[derive(Debug, Clone)]
pub struct AuthSubject(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(state.config.subject_header.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());

        match subject {
            Some(subject) => Ok(AuthSubject(subject.to_string())),
            None => Err(AppError::Unauthenticated),
        }
    }
}

/// The resolved caller: internal user record with the denormalized tier and
/// permission cache parsed. Unrecognized role strings degrade to no role,
/// no tier, and the all-false permission set.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub organization_id: String,
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub role: Option<Role>,
    pub tier: Option<Tier>,
    pub is_active: bool,
    pub permissions: PermissionSet,
}

impl From<db::users::User> for CurrentUser {
    fn from(row: db::users::User) -> Self {
        let role = row.parsed_role();
        let tier = row.parsed_tier();
        let permissions = row.parsed_permissions();
        CurrentUser {
            id: row.id,
            organization_id: row.organization_id,
            subject_id: row.subject_id,
            email: row.email,
            name: row.name,
            role,
            tier,
            is_active: row.is_active,
            permissions,
        }
    }
}

impl CurrentUser {
    /// Permission checker: pure lookup into the cached set, never errors.
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.permissions.allows(resource, action)
    }

    /// Fail with `PermissionDenied` unless the flag for `(resource,
    /// action)` is set. Tenant checks always run before this.
    pub fn require_permission(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "Permission denied: cannot {action} {resource}"
            )))
        }
    }

    /// True for roles allowed to manage users and organization settings.
    pub fn can_manage_organization(&self) -> bool {
        self.role.is_some_and(Role::can_manage_organization)
    }
}

/// Look up the internal user for a verified subject id. `NotProvisioned`
/// when no record exists yet; the client reacts by running onboarding.
pub async fn resolve_user(pool: &sqlx::SqlitePool, subject_id: &str) -> Result<CurrentUser, AppError> {
    let row = db::users::find_by_subject(pool, subject_id)
        .await?
        .ok_or(AppError::NotProvisioned)?;
    Ok(CurrentUser::from(row))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthSubject(subject) = AuthSubject::from_request_parts(parts, state).await?;
        resolve_user(&state.db, &subject).await
    }
}
