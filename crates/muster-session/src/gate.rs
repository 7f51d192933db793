//! Command authorization gate — role-based admission for privileged
//! commands. Stateless; denial is a normal outcome, not an error.

use std::collections::HashSet;

use muster_core::types::RoleId;

#[derive(Debug, Clone)]
pub struct CommandGate {
    admin_role: RoleId,
}

impl CommandGate {
    pub fn new(admin_role: RoleId) -> Self {
        Self { admin_role }
    }

    /// Admit when the actor holds the administrative role.
    pub fn admit(&self, roles: &HashSet<RoleId>) -> bool {
        roles.contains(&self.admin_role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_with_role() {
        let gate = CommandGate::new(RoleId::new("admin"));
        let roles: HashSet<RoleId> = [RoleId::new("member"), RoleId::new("admin")].into();
        assert!(gate.admit(&roles));
    }

    #[test]
    fn test_deny_without_role() {
        let gate = CommandGate::new(RoleId::new("admin"));
        let roles: HashSet<RoleId> = [RoleId::new("member")].into();
        assert!(!gate.admit(&roles));
        assert!(!gate.admit(&HashSet::new()));
    }
}
