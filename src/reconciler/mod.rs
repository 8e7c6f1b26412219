//! Ban reconciliation system
//!
//! This module owns the global ban roster and converges every opted-in
//! community's enforcement state toward it, through a membership provider
//! seam and an append-only audit log.

mod audit;
mod error;
mod provider;
mod service;
mod store;

pub use audit::{ACTION_GLOBAL_BAN, AuditCase, AuditRecorder, ModlogRecorder};
pub use error::{ProviderError, ReconcileError, ReconcileResult};
pub use provider::{DiscordMembershipProvider, MembershipProvider};
pub use service::Reconciler;
pub use store::{RosterEntry, RosterStore};
