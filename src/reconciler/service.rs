//! Ban reconciler
//!
//! This module drives a community's actual ban state toward the global
//! roster: applying missing bans, lifting bans that left the roster, and
//! selectively unwinding enforcement when a community opts out. Provider
//! calls are awaited one community and one user at a time; per-target
//! failures are logged and never abort the remaining work.

use poise::serenity_prelude::{GuildId, UserId};
use std::collections::HashSet;
use tracing::{error, info, warn};

use super::{
    AuditCase, AuditRecorder, MembershipProvider, ProviderError, ReconcileResult, RosterStore,
};

/// Reconciles opted-in communities against the global ban roster
pub struct Reconciler<'a> {
    store: &'a RosterStore,
    provider: &'a dyn MembershipProvider,
    audit: &'a dyn AuditRecorder,
}

/// Reason string sent to the provider and recorded in the audit log
fn enforcement_reason(initiator: &str, reason: &str) -> String {
    format!("Global ban initiated by {initiator} with the reason: {reason}")
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a store, a membership provider and an
    /// audit recorder
    pub fn new(
        store: &'a RosterStore,
        provider: &'a dyn MembershipProvider,
        audit: &'a dyn AuditRecorder,
    ) -> Self {
        Self {
            store,
            provider,
            audit,
        }
    }

    /// Apply the full roster to every opted-in community
    ///
    /// Users already banned locally are folded into the community's
    /// allow-list instead of re-banned. Unreachable communities are
    /// skipped; an enumeration failure skips the community for the rest
    /// of the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit log cannot be written. Provider
    /// failures on individual targets are isolated and never surface.
    pub async fn apply_roster(&self, initiator: &str) -> ReconcileResult<()> {
        let roster = self.store.roster_snapshot();

        for guild_id in self.store.opted_snapshot() {
            let community = GuildId::new(guild_id);

            let banned: HashSet<u64> = match self.provider.list_bans(community).await {
                Ok(bans) => bans.into_iter().map(UserId::get).collect(),
                Err(ProviderError::NotReachable(_)) => continue,
                Err(err) => {
                    error!("Error enumerating bans for guild {guild_id}: {err}");
                    continue;
                }
            };

            for (user_id, reason) in &roster {
                if banned.contains(user_id) {
                    // Pre-existing local ban, exempt from enforcement
                    self.store.protect(guild_id, *user_id);
                    continue;
                }

                let user = UserId::new(*user_id);
                let member = self.provider.get_member(community, user).await;
                let full_reason = enforcement_reason(initiator, reason);

                match self.provider.ban(community, user, &full_reason).await {
                    Ok(()) => {}
                    // Banning a non-member by bare id: already absent
                    Err(ProviderError::NotFound) if member.is_none() => {}
                    Err(ProviderError::Forbidden) => {
                        warn!("Failed to ban user {user_id} in guild {guild_id}: forbidden");
                        continue;
                    }
                    Err(err) => {
                        warn!("Failed to ban user {user_id} in guild {guild_id}: {err}");
                        continue;
                    }
                }

                self.audit
                    .record(AuditCase::global_ban(guild_id, *user_id, full_reason))
                    .await?;
            }
        }

        Ok(())
    }

    /// Lift a user's ban in every opted-in community where it is
    /// attributable to the roster
    ///
    /// Allow-listed users are never touched. Removal is independent per
    /// community; one failure does not block the others.
    pub async fn remove_entry(&self, user_id: u64) -> ReconcileResult<()> {
        for guild_id in self.store.opted_snapshot() {
            if self.store.is_protected(guild_id, user_id) {
                continue;
            }

            let community = GuildId::new(guild_id);
            let banned = match self.provider.list_bans(community).await {
                Ok(bans) => bans,
                Err(ProviderError::NotReachable(_)) => continue,
                Err(err) => {
                    error!("Error enumerating bans for guild {guild_id}: {err}");
                    continue;
                }
            };

            if banned.iter().any(|user| user.get() == user_id) {
                match self.provider.unban(community, UserId::new(user_id)).await {
                    Ok(()) => {}
                    Err(ProviderError::Forbidden) => {
                        warn!("Failed to unban user {user_id} in guild {guild_id}: forbidden");
                    }
                    Err(err) => {
                        warn!("Failed to unban user {user_id} in guild {guild_id}: {err}");
                    }
                }
            }
        }

        Ok(())
    }

    /// Lift every roster-attributable, unprotected ban in a single
    /// community being opted out
    ///
    /// Bans absent from the roster and allow-listed users are untouched.
    pub async fn remove_community(&self, guild_id: u64) -> ReconcileResult<()> {
        let community = GuildId::new(guild_id);

        let banned = match self.provider.list_bans(community).await {
            Ok(bans) => bans,
            Err(ProviderError::NotReachable(_)) => return Ok(()),
            Err(err) => {
                error!("Error enumerating bans for guild {guild_id}: {err}");
                return Ok(());
            }
        };

        for user in banned {
            let user_id = user.get();
            if !self.store.contains_entry(user_id) || self.store.is_protected(guild_id, user_id) {
                continue;
            }

            match self.provider.unban(community, user).await {
                Ok(()) => {}
                Err(ProviderError::Forbidden) => {
                    warn!("Failed to unban user {user_id} in guild {guild_id}: forbidden");
                }
                Err(err) => {
                    warn!("Failed to unban user {user_id} in guild {guild_id}: {err}");
                }
            }
        }

        Ok(())
    }

    /// Add a user to the roster and enforce it everywhere
    pub async fn ban(&self, user_id: u64, reason: &str, initiator: &str) -> ReconcileResult<()> {
        self.store.insert_entry(user_id, reason);
        info!("User {user_id} added to the global ban roster by {initiator}");
        self.apply_roster(initiator).await
    }

    /// Remove a user from the roster and lift the attributable bans
    pub async fn unban(&self, user_id: u64) -> ReconcileResult<()> {
        if self.store.remove_entry(user_id).is_some() {
            info!("User {user_id} removed from the global ban roster");
        }
        self.remove_entry(user_id).await
    }

    /// Replace the recorded reason of an existing roster entry
    ///
    /// Returns false if the user is not on the roster.
    pub fn edit_reason(&self, user_id: u64, reason: &str) -> bool {
        self.store.edit_reason(user_id, reason)
    }

    /// Enroll a community in enforcement
    ///
    /// Snapshots the community's current bans into its allow-list, then
    /// applies the roster. Returns false if it was already opted in.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot enumeration fails; the community
    /// stays enrolled, matching the persisted opt-in.
    pub async fn opt_in(&self, guild_id: u64, initiator: &str) -> ReconcileResult<bool> {
        if !self.store.opt_in(guild_id) {
            return Ok(false);
        }

        let bans = self.provider.list_bans(GuildId::new(guild_id)).await?;
        self.store
            .set_allowlist(guild_id, bans.into_iter().map(UserId::get));
        info!("Guild {guild_id} opted in to global ban enforcement");

        self.apply_roster(initiator).await?;
        Ok(true)
    }

    /// Unenroll a community, lifting only roster-attributable bans
    ///
    /// The allow-list persists across opt-out. Returns false if the
    /// community was not opted in.
    pub async fn opt_out(&self, guild_id: u64) -> ReconcileResult<bool> {
        if !self.store.opt_out(guild_id) {
            return Ok(false);
        }

        info!("Guild {guild_id} opted out of global ban enforcement");
        self.remove_community(guild_id).await?;
        Ok(true)
    }
}
