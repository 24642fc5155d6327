use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    EnumString,
    strum::Display,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

/// Something a signed-in user may be allowed to do.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Punch,
    ViewHistory,
    SubmitRequests,
    ApproveRequests,
    ManageEmployees,
    ManageDepartments,
    ViewReports,
    ViewAuditLog,
}

const EMPLOYEE_CAPABILITIES: &[Capability] = &[
    Capability::Punch,
    Capability::ViewHistory,
    Capability::SubmitRequests,
];

const MANAGER_CAPABILITIES: &[Capability] = &[
    Capability::Punch,
    Capability::ViewHistory,
    Capability::SubmitRequests,
    Capability::ApproveRequests,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::Punch,
    Capability::ViewHistory,
    Capability::SubmitRequests,
    Capability::ApproveRequests,
    Capability::ManageEmployees,
    Capability::ManageDepartments,
    Capability::ViewReports,
    Capability::ViewAuditLog,
];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Manager => MANAGER_CAPABILITIES,
            Role::Employee => EMPLOYEE_CAPABILITIES,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Roles that may record approval actions.
    pub fn is_approver(self) -> bool {
        self.can(Capability::ApproveRequests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_parse_from_store_strings() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert!(Role::from_str("hr").is_err());
    }

    #[test]
    fn capability_table_is_cumulative() {
        for cap in Role::Employee.capabilities() {
            assert!(Role::Manager.can(*cap));
        }
        for cap in Role::Manager.capabilities() {
            assert!(Role::Admin.can(*cap));
        }
    }

    #[test]
    fn only_admin_manages_the_organization() {
        assert!(Role::Admin.can(Capability::ManageDepartments));
        assert!(!Role::Manager.can(Capability::ManageEmployees));
        assert!(!Role::Employee.can(Capability::ViewReports));
        assert!(Role::Manager.is_approver());
        assert!(!Role::Employee.is_approver());
    }
}
