//! Roster store
//!
//! This module provides the persisted store for the global ban roster, the
//! opted-in community set and the per-community allow-lists. The in-memory
//! maps are shared and lock-free; every mutating pass ends with an explicit
//! [`RosterStore::save`], giving each operation read-modify-write scope over
//! the persisted state.

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::ReconcileResult;

const DATA_DIR: &str = "data";
const ROSTER_FILE: &str = "data/roster.yaml";
const OPTED_FILE: &str = "data/opted.yaml";
const ALLOWLISTS_FILE: &str = "data/allowlists.yaml";

/// A single entry on the global ban roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// ID of the banned user
    pub user_id: u64,
    /// Free-text reason, may be empty
    pub reason: String,
}

/// Serialized form of one community's allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AllowListEntry {
    guild_id: u64,
    users: Vec<u64>,
}

/// Store for the roster, the opted set and the allow-lists
#[derive(Clone)]
pub struct RosterStore {
    /// Global roster: user id -> ban reason
    roster: Arc<DashMap<u64, String>>,
    /// Communities enrolled in enforcement
    opted: Arc<DashSet<u64>>,
    /// Per-community user ids exempt from roster enforcement
    allowlists: Arc<DashMap<u64, HashSet<u64>>>,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            roster: Arc::new(DashMap::new()),
            opted: Arc::new(DashSet::new()),
            allowlists: Arc::new(DashMap::new()),
        }
    }

    /// Add or replace a roster entry
    pub fn insert_entry(&self, user_id: u64, reason: impl Into<String>) {
        self.roster.insert(user_id, reason.into());
    }

    /// Remove a roster entry, returning the old reason if present
    pub fn remove_entry(&self, user_id: u64) -> Option<String> {
        self.roster.remove(&user_id).map(|(_, reason)| reason)
    }

    /// Check whether a user is on the roster
    #[must_use]
    pub fn contains_entry(&self, user_id: u64) -> bool {
        self.roster.contains_key(&user_id)
    }

    /// Replace the reason of an existing entry. Returns false if the user
    /// is not on the roster.
    pub fn edit_reason(&self, user_id: u64, reason: impl Into<String>) -> bool {
        if let Some(mut entry) = self.roster.get_mut(&user_id) {
            *entry.value_mut() = reason.into();
            true
        } else {
            false
        }
    }

    /// Snapshot the roster as (user id, reason) pairs
    #[must_use]
    pub fn roster_snapshot(&self) -> Vec<(u64, String)> {
        self.roster
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Number of roster entries
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Enroll a community. Returns false if it was already opted in.
    pub fn opt_in(&self, guild_id: u64) -> bool {
        self.opted.insert(guild_id)
    }

    /// Unenroll a community. Returns false if it was not opted in.
    pub fn opt_out(&self, guild_id: u64) -> bool {
        self.opted.remove(&guild_id).is_some()
    }

    /// Check whether a community is enrolled
    #[must_use]
    pub fn is_opted(&self, guild_id: u64) -> bool {
        self.opted.contains(&guild_id)
    }

    /// Snapshot the opted community set
    #[must_use]
    pub fn opted_snapshot(&self) -> Vec<u64> {
        self.opted.iter().map(|entry| *entry.key()).collect()
    }

    /// Replace a community's allow-list with a snapshot of its current bans
    pub fn set_allowlist(&self, guild_id: u64, users: impl IntoIterator<Item = u64>) {
        self.allowlists
            .insert(guild_id, users.into_iter().collect());
    }

    /// Add a user to a community's allow-list
    pub fn protect(&self, guild_id: u64, user_id: u64) {
        self.allowlists.entry(guild_id).or_default().insert(user_id);
    }

    /// Check whether a user is exempt from enforcement in a community
    #[must_use]
    pub fn is_protected(&self, guild_id: u64, user_id: u64) -> bool {
        self.allowlists
            .get(&guild_id)
            .is_some_and(|list| list.contains(&user_id))
    }

    /// Load persisted state from the YAML files
    ///
    /// Missing or malformed files are tolerated; the affected dataset
    /// starts empty.
    pub async fn load() -> Self {
        let store = Self::new();

        if let Ok(file_content) = tokio::fs::read_to_string(ROSTER_FILE).await {
            if let Ok(entries) = serde_yaml::from_str::<Vec<RosterEntry>>(&file_content) {
                for entry in entries {
                    store.roster.insert(entry.user_id, entry.reason);
                }
            }
        }

        if let Ok(file_content) = tokio::fs::read_to_string(OPTED_FILE).await {
            if let Ok(guilds) = serde_yaml::from_str::<Vec<u64>>(&file_content) {
                for guild_id in guilds {
                    store.opted.insert(guild_id);
                }
            }
        }

        if let Ok(file_content) = tokio::fs::read_to_string(ALLOWLISTS_FILE).await {
            if let Ok(lists) = serde_yaml::from_str::<Vec<AllowListEntry>>(&file_content) {
                for list in lists {
                    store
                        .allowlists
                        .insert(list.guild_id, list.users.into_iter().collect());
                }
            }
        }

        store
    }

    /// Save all datasets to the YAML files
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created, a dataset
    /// cannot be serialized, or a file cannot be written.
    pub async fn save(&self) -> ReconcileResult<()> {
        if !std::path::Path::new(DATA_DIR).exists() {
            tokio::fs::create_dir_all(DATA_DIR).await?;
        }

        let entries: Vec<RosterEntry> = self
            .roster
            .iter()
            .map(|entry| RosterEntry {
                user_id: *entry.key(),
                reason: entry.value().clone(),
            })
            .collect();
        let roster_yaml = serde_yaml::to_string(&entries)?;
        tokio::fs::write(ROSTER_FILE, roster_yaml).await?;

        let opted: Vec<u64> = self.opted.iter().map(|entry| *entry.key()).collect();
        let opted_yaml = serde_yaml::to_string(&opted)?;
        tokio::fs::write(OPTED_FILE, opted_yaml).await?;

        let lists: Vec<AllowListEntry> = self
            .allowlists
            .iter()
            .map(|entry| AllowListEntry {
                guild_id: *entry.key(),
                users: entry.value().iter().copied().collect(),
            })
            .collect();
        let lists_yaml = serde_yaml::to_string(&lists)?;
        tokio::fs::write(ALLOWLISTS_FILE, lists_yaml).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_entry_lifecycle() {
        let store = RosterStore::new();
        assert_eq!(store.roster_len(), 0);

        store.insert_entry(42, "spam");
        assert!(store.contains_entry(42));
        assert_eq!(store.roster_len(), 1);

        // Re-inserting replaces the reason
        store.insert_entry(42, "worse spam");
        assert_eq!(store.roster_len(), 1);
        let snapshot = store.roster_snapshot();
        assert_eq!(snapshot, vec![(42, "worse spam".to_string())]);

        assert_eq!(store.remove_entry(42), Some("worse spam".to_string()));
        assert!(!store.contains_entry(42));
        assert_eq!(store.remove_entry(42), None);
    }

    #[test]
    fn test_edit_reason() {
        let store = RosterStore::new();
        assert!(!store.edit_reason(42, "anything"));

        store.insert_entry(42, "spam");
        assert!(store.edit_reason(42, ""));
        assert_eq!(store.roster_snapshot(), vec![(42, String::new())]);
    }

    #[test]
    fn test_opt_in_and_out() {
        let store = RosterStore::new();

        assert!(store.opt_in(100));
        assert!(store.is_opted(100));
        // Second opt-in is a no-op
        assert!(!store.opt_in(100));

        assert!(store.opt_out(100));
        assert!(!store.is_opted(100));
        assert!(!store.opt_out(100));
    }

    #[test]
    fn test_allowlist_protection() {
        let store = RosterStore::new();
        assert!(!store.is_protected(100, 42));

        store.set_allowlist(100, [42, 43]);
        assert!(store.is_protected(100, 42));
        assert!(store.is_protected(100, 43));
        assert!(!store.is_protected(100, 44));
        // Protection is scoped per community
        assert!(!store.is_protected(200, 42));

        store.protect(100, 44);
        assert!(store.is_protected(100, 44));

        // protect() on a community without a snapshot creates the list
        store.protect(200, 42);
        assert!(store.is_protected(200, 42));
    }

    #[test]
    fn test_allowlist_survives_opt_out() {
        let store = RosterStore::new();
        store.opt_in(100);
        store.set_allowlist(100, [42]);

        store.opt_out(100);
        assert!(store.is_protected(100, 42));
    }

    #[test]
    fn test_roster_entry_serialization() {
        let entry = RosterEntry {
            user_id: 42,
            reason: "spam".to_string(),
        };

        let serialized = serde_yaml::to_string(&vec![entry.clone()]).expect("Failed to serialize");
        assert!(serialized.contains("user_id: 42"));
        assert!(serialized.contains("reason: spam"));

        let deserialized: Vec<RosterEntry> =
            serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized, vec![entry]);
    }
}
