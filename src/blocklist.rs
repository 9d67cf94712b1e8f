use std::collections::HashSet;
use std::sync::RwLock;
use tracing::warn;

use crate::lock_utils::{read_lock_or_recover, write_lock_or_recover};
use crate::types::ClientIdentity;

/// Clients that have reached critical threat at least once.
///
/// Membership is permanent for the life of the process. There is no expiry or
/// removal path.
#[derive(Debug, Default)]
pub struct BlockList {
    blocked: RwLock<HashSet<ClientIdentity>>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &ClientIdentity) -> bool {
        read_lock_or_recover(&self.blocked, "block list").contains(identity)
    }

    /// Add `identity`. Returns true if it was not already blocked.
    pub fn insert(&self, identity: &ClientIdentity) -> bool {
        if self.contains(identity) {
            return false;
        }

        let added = write_lock_or_recover(&self.blocked, "block list").insert(identity.clone());
        if added {
            warn!("Client {} permanently escalated to block list", identity);
        }
        added
    }

    pub fn len(&self) -> usize {
        read_lock_or_recover(&self.blocked, "block list").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the current members
    pub fn members(&self) -> Vec<ClientIdentity> {
        let mut members: Vec<ClientIdentity> = read_lock_or_recover(&self.blocked, "block list")
            .iter()
            .cloned()
            .collect();
        members.sort();
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let list = BlockList::new();
        let client = ClientIdentity::from("203.0.113.5");

        assert!(list.is_empty());
        assert!(list.insert(&client));
        assert!(!list.insert(&client));
        assert!(list.contains(&client));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_members_sorted() {
        let list = BlockList::new();
        list.insert(&ClientIdentity::from("b"));
        list.insert(&ClientIdentity::from("a"));
        assert_eq!(
            list.members(),
            vec![ClientIdentity::from("a"), ClientIdentity::from("b")]
        );
    }
}
