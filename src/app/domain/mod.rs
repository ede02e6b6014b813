mod organization_id;
mod permissions;
mod record_id;
mod role;
mod tier;
mod user_id;

pub use organization_id::OrganizationId;
pub use permissions::{
    derive_permissions, Action, CrudFlags, PermissionSet, ReportFlags, Resource, SettingsFlags,
};
pub use record_id::RecordId;
pub use role::Role;
pub use tier::Tier;
pub use user_id::UserId;
