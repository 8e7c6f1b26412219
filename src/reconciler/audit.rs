//! Audit recorder
//!
//! Append-only log of enforcement actions taken by the reconciler. Cases
//! are kept in memory, persisted to YAML alongside the other datasets, and
//! mirrored as structured tracing events on the audit target.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ReconcileResult;
use crate::AUDIT_TARGET;

const DATA_DIR: &str = "data";
const MODLOG_FILE: &str = "data/modlog.yaml";

/// Action type recorded for a roster-driven ban
pub const ACTION_GLOBAL_BAN: &str = "globalban";

/// A single recorded enforcement action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCase {
    /// Unique ID of this case
    pub id: String,
    /// Kind of action taken
    pub action_type: String,
    /// Guild where the action happened
    pub guild_id: u64,
    /// User the action targeted
    pub user_id: u64,
    /// Reason as sent to the provider
    pub reason: String,
    /// When the case was recorded
    pub created_at: DateTime<Utc>,
}

impl AuditCase {
    /// Create a case for a roster-driven ban
    #[must_use]
    pub fn global_ban(guild_id: u64, user_id: u64, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action_type: ACTION_GLOBAL_BAN.to_string(),
            guild_id,
            user_id,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

/// Records enforcement actions taken by the reconciler
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Append a case to the log
    async fn record(&self, case: AuditCase) -> ReconcileResult<()>;
}

/// Audit recorder persisted to the modlog YAML file
#[derive(Clone, Default)]
pub struct ModlogRecorder {
    cases: Arc<DashMap<String, AuditCase>>,
}

impl ModlogRecorder {
    /// Create a new empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load previously recorded cases
    ///
    /// A missing or malformed modlog file yields an empty recorder.
    pub async fn load() -> Self {
        let recorder = Self::new();

        if let Ok(file_content) = tokio::fs::read_to_string(MODLOG_FILE).await {
            if let Ok(cases) = serde_yaml::from_str::<Vec<AuditCase>>(&file_content) {
                for case in cases {
                    recorder.cases.insert(case.id.clone(), case);
                }
            }
        }

        recorder
    }

    /// Number of recorded cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// All cases recorded against a guild
    #[must_use]
    pub fn cases_for_guild(&self, guild_id: u64) -> Vec<AuditCase> {
        self.cases
            .iter()
            .filter_map(|entry| {
                let case = entry.value();
                if case.guild_id == guild_id {
                    Some(case.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    async fn save(&self) -> ReconcileResult<()> {
        if !std::path::Path::new(DATA_DIR).exists() {
            tokio::fs::create_dir_all(DATA_DIR).await?;
        }

        let cases: Vec<AuditCase> = self.cases.iter().map(|entry| entry.value().clone()).collect();
        let yaml = serde_yaml::to_string(&cases)?;
        tokio::fs::write(MODLOG_FILE, yaml).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl AuditRecorder for ModlogRecorder {
    async fn record(&self, case: AuditCase) -> ReconcileResult<()> {
        info!(
            target: AUDIT_TARGET,
            case_id = %case.id,
            action_type = %case.action_type,
            guild_id = %case.guild_id,
            user_id = %case.user_id,
            reason = %case.reason,
            "Enforcement action recorded"
        );

        self.cases.insert(case.id.clone(), case);
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_ban_case() {
        let case = AuditCase::global_ban(100, 42, "spam");
        assert_eq!(case.action_type, ACTION_GLOBAL_BAN);
        assert_eq!(case.guild_id, 100);
        assert_eq!(case.user_id, 42);
        assert_eq!(case.reason, "spam");
        assert!(!case.id.is_empty());

        // IDs are unique per case
        let other = AuditCase::global_ban(100, 42, "spam");
        assert_ne!(case.id, other.id);
    }

    #[test]
    fn test_cases_for_guild() {
        let recorder = ModlogRecorder::new();
        assert!(recorder.is_empty());

        let case_a = AuditCase::global_ban(100, 42, "spam");
        let case_b = AuditCase::global_ban(200, 42, "spam");
        recorder.cases.insert(case_a.id.clone(), case_a.clone());
        recorder.cases.insert(case_b.id.clone(), case_b);

        assert_eq!(recorder.len(), 2);
        let for_guild = recorder.cases_for_guild(100);
        assert_eq!(for_guild, vec![case_a]);
    }

    #[test]
    fn test_case_serialization() {
        let case = AuditCase::global_ban(100, 42, "spam");

        let serialized = serde_yaml::to_string(&vec![case.clone()]).expect("Failed to serialize");
        assert!(serialized.contains("action_type: globalban"));
        assert!(serialized.contains("guild_id: 100"));
        assert!(serialized.contains("user_id: 42"));

        let deserialized: Vec<AuditCase> =
            serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized, vec![case]);
    }
}
