//! Attendee registry — the live set of users who confirmed attendance for
//! the current session. Owned exclusively by the session coordinator and
//! cleared on every transition that ends a session.

use std::collections::HashSet;

use muster_core::types::UserId;

#[derive(Debug, Default)]
pub struct AttendeeRegistry {
    confirmed: HashSet<UserId>,
}

impl AttendeeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmation. Adding twice has the effect of adding once.
    pub fn add(&mut self, user: UserId) -> bool {
        self.confirmed.insert(user)
    }

    /// Withdraw a confirmation. Removing an absent entry is a no-op.
    pub fn remove(&mut self, user: &UserId) -> bool {
        self.confirmed.remove(user)
    }

    pub fn clear(&mut self) {
        self.confirmed.clear();
    }

    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.confirmed.contains(user)
    }

    /// Defensive copy for fan-out, so iteration is unaffected by concurrent
    /// mutation of the live set.
    pub fn snapshot(&self) -> HashSet<UserId> {
        self.confirmed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = AttendeeRegistry::new();
        assert!(registry.add(UserId::new("1")));
        assert!(!registry.add(UserId::new("1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_confirm_unconfirm_round_trips() {
        let mut registry = AttendeeRegistry::new();
        let user = UserId::new("7");
        for _ in 0..3 {
            registry.add(user.clone());
            registry.remove(&user);
            assert!(registry.is_empty());
        }
        assert!(!registry.remove(&user));
    }

    #[test]
    fn test_snapshot_is_defensive() {
        let mut registry = AttendeeRegistry::new();
        registry.add(UserId::new("1"));
        let snapshot = registry.snapshot();
        registry.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }
}
