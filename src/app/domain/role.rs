use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::app::domain::Tier;

/// Organization role enum. The sole input to permission and tier derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")] // Serialize as snake_case string
#[strum(serialize_all = "snake_case")] // Display/FromStr as snake_case string
pub enum Role {
    Owner,
    Manager,
    Operations,
    Sales,
    CrewLeader,
    CrewMember,
    Accountant,
    Customer,
}

impl Role {
    /// Visibility tier for this role. `Customer` has none (portal accounts
    /// see only their own records, outside the tier system).
    pub fn tier(self) -> Option<Tier> {
        match self {
            Role::Owner | Role::Manager => Some(Tier::Executive),
            Role::Operations | Role::Sales => Some(Tier::Office),
            Role::CrewLeader | Role::CrewMember => Some(Tier::Field),
            Role::Accountant => Some(Tier::Finance),
            Role::Customer => None,
        }
    }

    /// True for the roles allowed to manage users and organization settings.
    pub fn can_manage_organization(self) -> bool {
        matches!(self, Role::Owner | Role::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_round_trip_as_snake_case() {
        assert_eq!(Role::CrewLeader.to_string(), "crew_leader");
        assert_eq!(Role::from_str("crew_member").unwrap(), Role::CrewMember);
        assert_eq!(Role::from_str("owner").unwrap(), Role::Owner);
    }

    #[test]
    fn unknown_role_string_fails_to_parse() {
        assert!(Role::from_str("superadmin").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn tier_mapping_is_exact() {
        assert_eq!(Role::Owner.tier(), Some(Tier::Executive));
        assert_eq!(Role::Manager.tier(), Some(Tier::Executive));
        assert_eq!(Role::Operations.tier(), Some(Tier::Office));
        assert_eq!(Role::Sales.tier(), Some(Tier::Office));
        assert_eq!(Role::CrewLeader.tier(), Some(Tier::Field));
        assert_eq!(Role::CrewMember.tier(), Some(Tier::Field));
        assert_eq!(Role::Accountant.tier(), Some(Tier::Finance));
        assert_eq!(Role::Customer.tier(), None);
    }

    #[test]
    fn tier_derivation_is_pure() {
        // Same input, same output, no hidden state.
        assert_eq!(Role::Accountant.tier(), Role::Accountant.tier());
    }
}
