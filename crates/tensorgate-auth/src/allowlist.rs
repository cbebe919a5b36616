//! Static username allowlist loaded at process start.

use std::collections::HashSet;

/// Case-insensitive set of usernames permitted to hold a session.
///
/// An empty allowlist permits every verified identity.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    users: HashSet<String>,
}

impl Allowlist {
    /// Build from a comma-separated list. Entries are trimmed and
    /// lowercased; empty entries are dropped.
    pub fn from_csv(raw: &str) -> Self {
        let users = raw
            .split(',')
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .collect();
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Whether `username` may hold a session.
    pub fn permits(&self, username: &str) -> bool {
        self.users.is_empty() || self.users.contains(&username.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_permits_everyone() {
        let list = Allowlist::from_csv("");
        assert!(list.is_empty());
        assert!(list.permits("anyone"));
    }

    #[test]
    fn test_membership_is_case_insensitive() {
        let list = Allowlist::from_csv("Alice, bob");
        assert!(list.permits("alice"));
        assert!(list.permits("ALICE"));
        assert!(list.permits("Bob"));
        assert!(!list.permits("mallory"));
    }

    #[test]
    fn test_whitespace_and_empty_entries_dropped() {
        let list = Allowlist::from_csv("  alice ,, ,bob  ");
        assert!(list.permits("alice"));
        assert!(list.permits("bob"));
        assert!(!list.permits(""));
    }
}
