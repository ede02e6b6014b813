//! Tier-based visibility narrowing for assignment-scoped resources.
//!
//! Tier answers "which records can this role even see", underneath the
//! per-action permission flags. It applies to leads (`assigned_to`) and
//! work orders (`assigned_crew`) only; customers, proposals and invoices
//! are organization-wide for any role whose flat permission check passes.

use crate::app::{domain::Tier, error::AppError, identity::CurrentUser};

/// Implemented by records that carry an assignment relation to users.
pub trait AssignmentScoped {
    fn is_assigned_to(&self, user_id: &str) -> bool;
}

/// Narrow a list result by tier. Tiers 1 and 2 see everything in the
/// organization, tier 3 only assigned records, tier 4 and no-tier nothing.
/// This never fails, it only filters.
pub fn narrow_by_tier<T: AssignmentScoped>(
    tier: Option<Tier>,
    user_id: &str,
    records: Vec<T>,
) -> Vec<T> {
    match tier {
        Some(Tier::Executive) | Some(Tier::Office) => records,
        Some(Tier::Field) => records
            .into_iter()
            .filter(|record| record.is_assigned_to(user_id))
            .collect(),
        Some(Tier::Finance) | None => Vec::new(),
    }
}

/// Single-record counterpart for get-by-id: a field-tier caller may only
/// open records they are assigned to. Other tiers pass; the list-level
/// narrowing for tier 4 does not extend to direct reads.
pub fn require_visible<T: AssignmentScoped>(user: &CurrentUser, record: &T) -> Result<(), AppError> {
    if user.tier == Some(Tier::Field) && !record.is_assigned_to(&user.id) {
        return Err(AppError::AccessDenied(
            "Access denied: not assigned to this record".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Assigned(Vec<String>);

    impl AssignmentScoped for Assigned {
        fn is_assigned_to(&self, user_id: &str) -> bool {
            self.0.iter().any(|id| id == user_id)
        }
    }

    fn sample() -> Vec<Assigned> {
        vec![
            Assigned(vec!["alice".to_string()]),
            Assigned(vec!["bob".to_string(), "alice".to_string()]),
            Assigned(vec![]),
        ]
    }

    #[test]
    fn executive_and_office_see_everything() {
        assert_eq!(narrow_by_tier(Some(Tier::Executive), "alice", sample()).len(), 3);
        assert_eq!(narrow_by_tier(Some(Tier::Office), "nobody", sample()).len(), 3);
    }

    #[test]
    fn field_sees_only_assigned() {
        assert_eq!(narrow_by_tier(Some(Tier::Field), "alice", sample()).len(), 2);
        assert_eq!(narrow_by_tier(Some(Tier::Field), "bob", sample()).len(), 1);
        assert_eq!(narrow_by_tier(Some(Tier::Field), "nobody", sample()).len(), 0);
    }

    #[test]
    fn finance_and_no_tier_see_nothing() {
        assert_eq!(narrow_by_tier(Some(Tier::Finance), "alice", sample()).len(), 0);
        assert_eq!(narrow_by_tier(None, "alice", sample()).len(), 0);
    }
}
