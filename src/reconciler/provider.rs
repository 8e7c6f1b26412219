//! Membership provider
//!
//! This module defines the seam between the reconciler and Discord: listing
//! current bans, checking membership, and issuing bans/unbans. The trait
//! returns typed errors so callers inspect permission and not-found
//! conditions explicitly.

use poise::serenity_prelude::{Cache, GuildId, Http, UserId};
use serenity::all::{HttpError, UserPagination};
use std::sync::Arc;
use tracing::debug;

use super::ProviderError;

/// Discord's per-request maximum for the guild-bans endpoint
const BAN_PAGE_SIZE: u16 = 1000;

/// Queries and mutates a community's ban state
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MembershipProvider: Send + Sync {
    /// List the ids of all users currently banned in a community
    async fn list_bans(&self, community: GuildId) -> Result<Vec<UserId>, ProviderError>;

    /// Check whether a user is currently a member of a community
    async fn get_member(&self, community: GuildId, user: UserId) -> Option<UserId>;

    /// Ban a user in a community with an audit reason
    async fn ban(&self, community: GuildId, user: UserId, reason: &str)
    -> Result<(), ProviderError>;

    /// Lift a ban on a user in a community
    async fn unban(&self, community: GuildId, user: UserId) -> Result<(), ProviderError>;
}

/// Membership provider backed by the Discord HTTP API and the gateway cache
#[derive(Clone)]
pub struct DiscordMembershipProvider {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordMembershipProvider {
    /// Create a provider from the bot's HTTP client and cache
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    /// Create a provider from a running serenity context
    #[must_use]
    pub fn from_context(ctx: &poise::serenity_prelude::Context) -> Self {
        Self::new(Arc::clone(&ctx.http), Arc::clone(&ctx.cache))
    }

    /// A community is reachable when the gateway cache knows the guild
    fn is_known(&self, community: GuildId) -> bool {
        self.cache.guild(community).is_some()
    }
}

/// Cursor for the next bans page, or None when the page was the last
///
/// The endpoint returns bans in ascending user id order, so a full page
/// continues after its last user id.
fn next_ban_page(page: &[UserId], page_size: u16) -> Option<UserPagination> {
    if page.len() < usize::from(page_size) {
        return None;
    }
    page.last().copied().map(UserPagination::After)
}

/// Map a serenity error onto the provider taxonomy
fn classify(err: serenity::Error) -> ProviderError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        match response.status_code.as_u16() {
            403 => return ProviderError::Forbidden,
            404 => return ProviderError::NotFound,
            _ => {}
        }
    }
    ProviderError::Unavailable(err.to_string())
}

#[async_trait::async_trait]
impl MembershipProvider for DiscordMembershipProvider {
    async fn list_bans(&self, community: GuildId) -> Result<Vec<UserId>, ProviderError> {
        if !self.is_known(community) {
            return Err(ProviderError::NotReachable(community.get()));
        }

        // The endpoint caps each request at BAN_PAGE_SIZE entries; page
        // through until a short page so large ban lists are seen in full
        let mut banned = Vec::new();
        let mut cursor: Option<UserPagination> = None;
        loop {
            // serenity 0.12's limit parameter is u8 and cannot express 1000;
            // None makes Discord use its default limit, which is BAN_PAGE_SIZE
            let page = community
                .bans(&self.http, cursor, None)
                .await
                .map_err(classify)?;

            let page: Vec<UserId> = page.into_iter().map(|ban| ban.user.id).collect();
            cursor = next_ban_page(&page, BAN_PAGE_SIZE);
            banned.extend(page);

            if cursor.is_none() {
                break;
            }
        }

        Ok(banned)
    }

    async fn get_member(&self, community: GuildId, user: UserId) -> Option<UserId> {
        match community.member(&self.http, user).await {
            Ok(member) => Some(member.user.id),
            Err(err) => {
                debug!("User {user} is not a member of guild {community}: {err}");
                None
            }
        }
    }

    async fn ban(
        &self,
        community: GuildId,
        user: UserId,
        reason: &str,
    ) -> Result<(), ProviderError> {
        // delete_message_days of 0 keeps the user's messages
        community
            .ban_with_reason(&self.http, user, 0, reason)
            .await
            .map_err(classify)
    }

    async fn unban(&self, community: GuildId, user: UserId) -> Result<(), ProviderError> {
        community.unban(&self.http, user).await.map_err(classify)
    }
}
