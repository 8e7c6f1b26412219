use std::{default::Default, ops::Deref, sync::Arc};

use poise::serenity_prelude as serenity;
use serenity::prelude::TypeMapKey;

use crate::reconciler::{ModlogRecorder, ReconcileResult, RosterStore};

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("roster_entries", &self.store.roster_len())
            .field("opted_guilds", &self.store.opted_snapshot().len())
            .field("modlog_cases", &self.modlog.len())
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Create a new empty Data instance
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(DataInner::new()))
    }

    /// Load persisted state from the YAML files
    pub async fn load() -> Self {
        Self(Arc::new(DataInner {
            store: RosterStore::load().await,
            modlog: ModlogRecorder::load().await,
        }))
    }

    /// Save the roster datasets to the YAML files
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or a
    /// dataset cannot be serialized or written.
    pub async fn save(&self) -> ReconcileResult<()> {
        self.store.save().await
    }
}

/// Inner data shared across command invocations
pub struct DataInner {
    /// Roster, opted set and allow-lists
    pub store: RosterStore,
    /// Persisted audit log
    pub modlog: ModlogRecorder,
}

impl Default for DataInner {
    fn default() -> Self {
        Self::new()
    }
}

impl DataInner {
    /// Create a new empty instance
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: RosterStore::new(),
            modlog: ModlogRecorder::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_new() {
        let data = Data::new();
        assert_eq!(data.store.roster_len(), 0);
        assert!(data.store.opted_snapshot().is_empty());
        assert!(data.modlog.is_empty());
    }

    #[test]
    fn test_data_debug_impl() {
        let data = Data::new();
        let debug_output = format!("{:?}", data);
        assert!(debug_output.contains("Data"));
        assert!(debug_output.contains("roster_entries"));
        assert!(debug_output.contains("opted_guilds"));
        assert!(debug_output.contains("modlog_cases"));
    }

    #[test]
    fn test_data_is_shared() {
        let data = Data::new();
        let clone = data.clone();

        data.store.insert_entry(42, "spam");
        assert!(clone.store.contains_entry(42));
    }
}
