//! Tenant isolation enforcement.
//!
//! **Rule**: every record read or written must belong to the caller's
//! organization. Checked on every access, before and independently of
//! permission flags: an `owner` of one organization gets the same denial
//! as anyone else when reaching across the boundary.

use crate::app::{error::AppError, identity::CurrentUser};

/// Validates that a record's organization id equals the caller's. Any
/// mismatch is a denial regardless of role; the reason string keeps
/// cross-tenant denials distinguishable from in-tenant permission denials
/// in logs.
pub fn require_same_organization(user: &CurrentUser, organization_id: &str) -> Result<(), AppError> {
    if user.organization_id == organization_id {
        Ok(())
    } else {
        Err(AppError::AccessDenied(
            "Access denied: organization mismatch".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::PermissionSet;

    fn user_in(org: &str) -> CurrentUser {
        CurrentUser {
            id: "01USER".to_string(),
            organization_id: org.to_string(),
            subject_id: "subject".to_string(),
            email: "a@b.c".to_string(),
            name: "A".to_string(),
            role: Some(crate::app::domain::Role::Owner),
            tier: Some(crate::app::domain::Tier::Executive),
            is_active: true,
            permissions: PermissionSet::RESTRICTED,
        }
    }

    #[test]
    fn same_organization_passes() {
        assert!(require_same_organization(&user_in("org-a"), "org-a").is_ok());
    }

    #[test]
    fn mismatch_is_denied_even_for_owner() {
        let err = require_same_organization(&user_in("org-a"), "org-b").unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }
}
