use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SheetsError};

/// Access level of the person using the app.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Member,
    Guest,
}

/// Something a role may or may not be allowed to do.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, strum_macros::Display, strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    RegisterMatch,
    ManageMembers,
    ViewStats,
    ViewMatches,
}

/// The capability flags granted to one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionConfig {
    pub can_register_match: bool,
    pub can_manage_members: bool,
    pub can_view_stats: bool,
    pub can_view_matches: bool,
}

impl PermissionConfig {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::RegisterMatch => self.can_register_match,
            Capability::ManageMembers => self.can_manage_members,
            Capability::ViewStats => self.can_view_stats,
            Capability::ViewMatches => self.can_view_matches,
        }
    }
}

const ADMIN: PermissionConfig = PermissionConfig {
    can_register_match: true,
    can_manage_members: true,
    can_view_stats: true,
    can_view_matches: true,
};

const MANAGER: PermissionConfig = PermissionConfig {
    can_register_match: true,
    can_manage_members: false,
    can_view_stats: true,
    can_view_matches: true,
};

const MEMBER: PermissionConfig = PermissionConfig {
    can_register_match: false,
    can_manage_members: false,
    can_view_stats: true,
    can_view_matches: true,
};

const GUEST: PermissionConfig = PermissionConfig {
    can_register_match: false,
    can_manage_members: false,
    can_view_stats: false,
    can_view_matches: true,
};

impl Role {
    pub fn permissions(&self) -> PermissionConfig {
        match self {
            Role::Admin => ADMIN,
            Role::Manager => MANAGER,
            Role::Member => MEMBER,
            Role::Guest => GUEST,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator - every feature is available",
            Role::Manager => "Manager - can register matches and view statistics",
            Role::Member => "Member - can view statistics and match results",
            Role::Guest => "Guest - can view match results only",
        }
    }
}

/// Who is using the app and with which role.
///
/// Starts out as an anonymous guest. The role can only be replaced through
/// [`Session::set_current_user`], which refuses labels outside the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    name: Option<String>,
    role: Role,
}

impl Session {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: Some(name.into()),
            role,
        }
    }

    pub fn guest() -> Self {
        Self {
            name: None,
            role: Role::Guest,
        }
    }

    /// Store the current user after validating the role label.
    pub fn set_current_user(&mut self, name: impl Into<String>, role: &str) -> Result<()> {
        let role = role
            .parse::<Role>()
            .map_err(|_| SheetsError::InvalidRole(role.to_string()))?;
        self.name = Some(name.into());
        self.role = role;
        debug!(name = ?self.name, %role, "current user set");
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn has_permission(&self, capability: Capability) -> bool {
        self.role.permissions().allows(capability)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::guest()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_permissions_decrease_with_role() {
        let ordered = [Role::Admin, Role::Manager, Role::Member, Role::Guest];
        for capability in Capability::iter() {
            let granted = ordered
                .iter()
                .map(|r| r.permissions().allows(capability))
                .collect::<Vec<_>>();
            for pair in granted.windows(2) {
                assert!(
                    pair[0] >= pair[1],
                    "{capability} granted to a lower role but not a higher one"
                );
            }
        }
    }

    #[test]
    fn test_permission_table() {
        assert!(Role::Admin.permissions().can_manage_members);
        assert!(Role::Manager.permissions().can_register_match);
        assert!(!Role::Manager.permissions().can_manage_members);
        assert!(!Role::Member.permissions().can_register_match);
        assert!(Role::Member.permissions().can_view_stats);
        assert!(!Role::Guest.permissions().can_view_stats);
        assert!(Role::Guest.permissions().can_view_matches);
    }

    #[test]
    fn test_set_current_user_rejects_unknown_role() {
        let mut session = Session::guest();
        let err = session.set_current_user("Taro", "superuser").unwrap_err();
        assert!(matches!(err, SheetsError::InvalidRole(ref r) if r == "superuser"));
        assert_eq!(session.role(), Role::Guest);
        assert_eq!(session.name(), None);

        session.set_current_user("Taro", "manager").unwrap();
        assert_eq!(session.role(), Role::Manager);
        assert_eq!(session.name(), Some("Taro"));
        assert!(session.has_permission(Capability::RegisterMatch));
        assert!(!session.has_permission(Capability::ManageMembers));
    }

    #[test]
    fn test_role_labels() {
        let labels = Role::iter().map(|r| r.to_string()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["admin", "manager", "member", "guest"]);
    }
}
