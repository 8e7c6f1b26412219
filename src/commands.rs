use crate::reconciler::{DiscordMembershipProvider, Reconciler};
use crate::{Context, Error};
use poise::command;

/// Global ban related commands.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("gb", "gban"),
    subcommands("optin", "optout", "ban", "unban", "editreason", "list_roster")
)]
pub async fn globalban(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Available subcommands: optin, optout, ban, unban, editreason, list.")
        .await?;
    Ok(())
}

/// Opt this server in to the global ban system.
///
/// Bans every user on the global ban roster; pre-existing local bans are
/// kept as exemptions.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn optin(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a guild")?
        .get();

    // Applying the roster can take a while on large rosters
    ctx.defer().await?;

    let data = ctx.data();
    let provider = DiscordMembershipProvider::from_context(ctx.serenity_context());
    let reconciler = Reconciler::new(&data.store, &provider, &data.modlog);

    let initiator = ctx.author().name.clone();
    if reconciler.opt_in(guild_id, &initiator).await? {
        data.save().await?;
        ctx.say("This guild is now opted in to global ban enforcement.")
            .await?;
    } else {
        ctx.say("This guild is already opted in.").await?;
    }
    Ok(())
}

/// Opt this server out of the global ban system.
///
/// Lifts bans attributable to the global roster; local and exempted bans
/// are untouched.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn optout(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a guild")?
        .get();

    ctx.defer().await?;

    let data = ctx.data();
    let provider = DiscordMembershipProvider::from_context(ctx.serenity_context());
    let reconciler = Reconciler::new(&data.store, &provider, &data.modlog);

    if reconciler.opt_out(guild_id).await? {
        data.save().await?;
        ctx.say("This guild is now opted out of global ban enforcement.")
            .await?;
    } else {
        ctx.say("This guild is already opted out.").await?;
    }
    Ok(())
}

/// Globally ban a user across all opted-in servers.
#[command(prefix_command, slash_command, guild_only, owners_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "ID of the user to ban"] user_id: u64,
    #[description = "Reason for the ban"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let provider = DiscordMembershipProvider::from_context(ctx.serenity_context());
    let reconciler = Reconciler::new(&data.store, &provider, &data.modlog);

    let reason = reason.unwrap_or_default();
    reconciler.ban(user_id, &reason, &ctx.author().name).await?;
    data.save().await?;

    ctx.say(format!("User {user_id} is now globally banned."))
        .await?;
    Ok(())
}

/// Globally unban a user across all opted-in servers.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    owners_only,
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "ID of the user to unban"] user_id: u64,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let provider = DiscordMembershipProvider::from_context(ctx.serenity_context());
    let reconciler = Reconciler::new(&data.store, &provider, &data.modlog);

    reconciler.unban(user_id).await?;
    data.save().await?;

    ctx.say(format!("User {user_id} is no longer globally banned."))
        .await?;
    Ok(())
}

/// Edit a user's ban reason.
#[command(prefix_command, slash_command, guild_only, owners_only)]
pub async fn editreason(
    ctx: Context<'_>,
    #[description = "ID of the banned user"] user_id: u64,
    #[description = "New reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let provider = DiscordMembershipProvider::from_context(ctx.serenity_context());
    let reconciler = Reconciler::new(&data.store, &provider, &data.modlog);

    if reconciler.edit_reason(user_id, &reason.unwrap_or_default()) {
        data.save().await?;
        ctx.say("Reason updated.").await?;
    } else {
        ctx.say("This user is not banned.").await?;
    }
    Ok(())
}

/// Check who is on the global ban list.
#[command(prefix_command, slash_command, guild_only, owners_only, rename = "list")]
pub async fn list_roster(ctx: Context<'_>) -> Result<(), Error> {
    let mut entries = ctx.data().store.roster_snapshot();
    if entries.is_empty() {
        ctx.say("There are no banned users.").await?;
        return Ok(());
    }
    entries.sort_unstable_by_key(|(user_id, _)| *user_id);

    // Chunk the roster into messages under the Discord length limit
    let mut page = String::new();
    for (user_id, reason) in entries {
        let line = format!("{user_id}\t{reason}\n");
        if page.len() + line.len() > 1900 {
            ctx.say(format!("```\n{page}```")).await?;
            page.clear();
        }
        page.push_str(&line);
    }
    if !page.is_empty() {
        ctx.say(format!("```\n{page}```")).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globalban_command_definition() {
        let cmd = globalban();
        assert_eq!(cmd.name, "globalban");
        assert!(cmd.guild_only);
        assert!(cmd.aliases.contains(&"gb".to_string()));
        assert!(cmd.aliases.contains(&"gban".to_string()));

        let subcommands: Vec<&str> = cmd
            .subcommands
            .iter()
            .map(|sub| sub.name.as_str())
            .collect();
        for expected in ["optin", "optout", "ban", "unban", "editreason", "list"] {
            assert!(subcommands.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_optin_requires_admin() {
        let cmd = optin();
        assert!(cmd.guild_only);
        assert!(
            cmd.required_permissions
                .contains(poise::serenity_prelude::Permissions::ADMINISTRATOR)
        );
    }

    #[test]
    fn test_ban_commands_are_owner_gated() {
        assert!(ban().owners_only);
        assert!(unban().owners_only);
        assert!(editreason().owners_only);
        assert!(list_roster().owners_only);
    }

    #[test]
    fn test_list_is_renamed() {
        let cmd = list_roster();
        assert_eq!(cmd.name, "list");
    }
}
