//! Role-based access policy

use super::roles;

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ValidateRequest,
    ApproveRequest,
    RejectRequest,
    ManageReferenceData,
    ManageRoles,
    ManageProfiles,
}

impl Permission {
    fn allowed_roles(&self) -> &'static [&'static str] {
        match self {
            Permission::ValidateRequest => &[roles::VALIDATOR, roles::ADMIN, roles::SUPERADMIN],
            Permission::ApproveRequest | Permission::RejectRequest => {
                &[roles::APPROVER, roles::ADMIN, roles::SUPERADMIN]
            }
            Permission::ManageReferenceData
            | Permission::ManageRoles
            | Permission::ManageProfiles => &[roles::ADMIN, roles::SUPERADMIN],
        }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed_roles()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(role))
    }
}

/// Administrators may act on anybody's behalf
pub fn is_admin(role: &str) -> bool {
    role.eq_ignore_ascii_case(roles::ADMIN) || role.eq_ignore_ascii_case(roles::SUPERADMIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_roles() {
        assert!(Permission::ValidateRequest.allows("validator"));
        assert!(Permission::ValidateRequest.allows("superadmin"));
        assert!(!Permission::ValidateRequest.allows("approver"));
        assert!(!Permission::ValidateRequest.allows("requester"));
    }

    #[test]
    fn test_approval_roles() {
        assert!(Permission::ApproveRequest.allows("approver"));
        assert!(Permission::RejectRequest.allows("Admin"));
        assert!(!Permission::ApproveRequest.allows("validator"));
    }

    #[test]
    fn test_reference_data_is_admin_only() {
        assert!(Permission::ManageReferenceData.allows("admin"));
        assert!(!Permission::ManageReferenceData.allows("approver"));
        assert!(is_admin("SUPERADMIN"));
        assert!(!is_admin("requester"));
    }
}
