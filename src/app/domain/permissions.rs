//! Role → permission derivation table and the permission checker.
//!
//! The whole table lives in [`derive_permissions`] as const data so there is
//! exactly one source of truth for what each role may do. The stored
//! `permissions` column on users is a cache of this derivation, recomputed
//! on every role change.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::app::domain::Role;

/// Governed resource kinds. Permission checks apply to this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Leads,
    Proposals,
    WorkOrders,
    Invoices,
    Customers,
    Reports,
    Settings,
}

/// CRUD action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Full create/read/update/delete flag block for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudFlags {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl CrudFlags {
    pub const ALL: CrudFlags = CrudFlags { create: true, read: true, update: true, delete: true };
    pub const NONE: CrudFlags = CrudFlags { create: false, read: false, update: false, delete: false };
    pub const READ_ONLY: CrudFlags = CrudFlags { create: false, read: true, update: false, delete: false };
    /// Field crews update job status but cannot create, delete, or touch pricing.
    pub const READ_UPDATE: CrudFlags = CrudFlags { create: false, read: true, update: true, delete: false };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.create,
            Action::Read => self.read,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }
}

/// Reduced flag block for reports (read-only resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFlags {
    pub read: bool,
}

/// Reduced flag block for settings (no create/delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFlags {
    pub read: bool,
    pub update: bool,
}

/// Fixed-shape permission record. Shape is identical for every user; only
/// the boolean values vary, and they are fully determined by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub leads: CrudFlags,
    pub proposals: CrudFlags,
    pub work_orders: CrudFlags,
    pub invoices: CrudFlags,
    pub customers: CrudFlags,
    pub reports: ReportFlags,
    pub settings: SettingsFlags,
}

impl PermissionSet {
    /// The most restrictive set: every flag false. Backstop for customer
    /// portal accounts and for any role value we fail to recognize.
    pub const RESTRICTED: PermissionSet = PermissionSet {
        leads: CrudFlags::NONE,
        proposals: CrudFlags::NONE,
        work_orders: CrudFlags::NONE,
        invoices: CrudFlags::NONE,
        customers: CrudFlags::NONE,
        reports: ReportFlags { read: false },
        settings: SettingsFlags { read: false, update: false },
    };

    const TIER1: PermissionSet = PermissionSet {
        leads: CrudFlags::ALL,
        proposals: CrudFlags::ALL,
        work_orders: CrudFlags::ALL,
        invoices: CrudFlags::ALL,
        customers: CrudFlags::ALL,
        reports: ReportFlags { read: true },
        settings: SettingsFlags { read: true, update: true },
    };

    const TIER2: PermissionSet = PermissionSet {
        settings: SettingsFlags { read: true, update: false },
        ..Self::TIER1
    };

    const CREW: PermissionSet = PermissionSet {
        leads: CrudFlags::READ_ONLY,
        proposals: CrudFlags::NONE,
        work_orders: CrudFlags::READ_UPDATE,
        invoices: CrudFlags::NONE,
        customers: CrudFlags::READ_ONLY,
        reports: ReportFlags { read: false },
        settings: SettingsFlags { read: false, update: false },
    };

    const ACCOUNTANT: PermissionSet = PermissionSet {
        leads: CrudFlags::NONE,
        proposals: CrudFlags::READ_ONLY,
        work_orders: CrudFlags::NONE,
        invoices: CrudFlags::READ_ONLY,
        customers: CrudFlags::READ_ONLY,
        reports: ReportFlags { read: true },
        settings: SettingsFlags { read: false, update: false },
    };

    /// Check a single `(resource, action)` cell. Reduced-shape resources
    /// deny actions they have no flag for instead of erroring.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        match resource {
            Resource::Leads => self.leads.allows(action),
            Resource::Proposals => self.proposals.allows(action),
            Resource::WorkOrders => self.work_orders.allows(action),
            Resource::Invoices => self.invoices.allows(action),
            Resource::Customers => self.customers.allows(action),
            Resource::Reports => matches!(action, Action::Read) && self.reports.read,
            Resource::Settings => match action {
                Action::Read => self.settings.read,
                Action::Update => self.settings.update,
                Action::Create | Action::Delete => false,
            },
        }
    }
}

/// Derive the permission set for a role. Pure and total over the closed
/// role enumeration.
pub fn derive_permissions(role: Role) -> PermissionSet {
    match role {
        Role::Owner | Role::Manager => PermissionSet::TIER1,
        Role::Operations | Role::Sales => PermissionSet::TIER2,
        Role::CrewLeader | Role::CrewMember => PermissionSet::CREW,
        Role::Accountant => PermissionSet::ACCOUNTANT,
        Role::Customer => PermissionSet::RESTRICTED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    const CRUD_RESOURCES: [Resource; 5] = [
        Resource::Leads,
        Resource::Proposals,
        Resource::WorkOrders,
        Resource::Invoices,
        Resource::Customers,
    ];
    const ACTIONS: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    #[test]
    fn owner_and_manager_get_full_access() {
        for role in [Role::Owner, Role::Manager] {
            let set = derive_permissions(role);
            for resource in CRUD_RESOURCES {
                for action in ACTIONS {
                    assert!(set.allows(resource, action), "{role} {resource} {action}");
                }
            }
            assert!(set.allows(Resource::Reports, Action::Read));
            assert!(set.allows(Resource::Settings, Action::Read));
            assert!(set.allows(Resource::Settings, Action::Update));
        }
    }

    #[test]
    fn operations_and_sales_lose_settings_update_only() {
        for role in [Role::Operations, Role::Sales] {
            let set = derive_permissions(role);
            for resource in CRUD_RESOURCES {
                for action in ACTIONS {
                    assert!(set.allows(resource, action), "{role} {resource} {action}");
                }
            }
            assert!(set.allows(Resource::Reports, Action::Read));
            assert!(set.allows(Resource::Settings, Action::Read));
            assert!(!set.allows(Resource::Settings, Action::Update));
        }
    }

    #[test]
    fn crew_roles_update_work_orders_but_never_pricing() {
        for role in [Role::CrewLeader, Role::CrewMember] {
            let set = derive_permissions(role);

            // Work orders: read + update only.
            assert!(!set.allows(Resource::WorkOrders, Action::Create));
            assert!(set.allows(Resource::WorkOrders, Action::Read));
            assert!(set.allows(Resource::WorkOrders, Action::Update));
            assert!(!set.allows(Resource::WorkOrders, Action::Delete));

            // Leads, customers: read only.
            for resource in [Resource::Leads, Resource::Customers] {
                assert!(!set.allows(resource, Action::Create), "{role} {resource}");
                assert!(set.allows(resource, Action::Read), "{role} {resource}");
                assert!(!set.allows(resource, Action::Update), "{role} {resource}");
                assert!(!set.allows(resource, Action::Delete), "{role} {resource}");
            }

            // Proposals and invoices: nothing. Field crews update job
            // status but cannot touch pricing.
            for resource in [Resource::Proposals, Resource::Invoices] {
                for action in ACTIONS {
                    assert!(!set.allows(resource, action), "{role} {resource} {action}");
                }
            }

            assert!(!set.allows(Resource::Reports, Action::Read));
            assert!(!set.allows(Resource::Settings, Action::Read));
            assert!(!set.allows(Resource::Settings, Action::Update));
        }
    }

    #[test]
    fn accountant_reads_financials_only() {
        let set = derive_permissions(Role::Accountant);

        for resource in [Resource::Proposals, Resource::Invoices, Resource::Customers] {
            assert_eq!(set.allows(resource, Action::Read), true, "{resource}");
            assert!(!set.allows(resource, Action::Create), "{resource}");
            assert!(!set.allows(resource, Action::Update), "{resource}");
            assert!(!set.allows(resource, Action::Delete), "{resource}");
        }
        for resource in [Resource::Leads, Resource::WorkOrders] {
            for action in ACTIONS {
                assert!(!set.allows(resource, action), "{resource} {action}");
            }
        }
        assert!(set.allows(Resource::Reports, Action::Read));
        assert!(!set.allows(Resource::Settings, Action::Read));
    }

    #[test]
    fn customer_role_gets_nothing() {
        let set = derive_permissions(Role::Customer);
        for resource in CRUD_RESOURCES {
            for action in ACTIONS {
                assert!(!set.allows(resource, action), "{resource} {action}");
            }
        }
        assert!(!set.allows(Resource::Reports, Action::Read));
        assert!(!set.allows(Resource::Settings, Action::Read));
        assert!(!set.allows(Resource::Settings, Action::Update));
        assert_eq!(set, PermissionSet::RESTRICTED);
    }

    #[test]
    fn reduced_shapes_deny_inapplicable_actions() {
        let set = derive_permissions(Role::Owner);
        assert!(!set.allows(Resource::Reports, Action::Create));
        assert!(!set.allows(Resource::Reports, Action::Update));
        assert!(!set.allows(Resource::Reports, Action::Delete));
        assert!(!set.allows(Resource::Settings, Action::Create));
        assert!(!set.allows(Resource::Settings, Action::Delete));
    }

    #[test]
    fn derivation_is_pure() {
        for role in Role::iter() {
            assert_eq!(derive_permissions(role), derive_permissions(role));
        }
    }

    #[test]
    fn permission_cache_json_round_trips() {
        for role in Role::iter() {
            let set = derive_permissions(role);
            let json = serde_json::to_string(&set).unwrap();
            let back: PermissionSet = serde_json::from_str(&json).unwrap();
            assert_eq!(set, back, "{role}");
        }
    }

    #[test]
    fn cache_keys_match_stored_shape() {
        let json = serde_json::to_value(PermissionSet::RESTRICTED).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["customers", "invoices", "leads", "proposals", "reports", "settings", "workOrders"]
        );
    }
}
