// Moderation slash commands.
//
// **Notice the pattern:**
// 1. Check the caller against the AdminRegistry (the bot's own permission
//    model - the owner seeds it, admins manage the rest)
// 2. Extract primitive data from Discord types
// 3. Call core services and format the response
//
// This layer is THIN - no business logic, just translation.

use crate::core::moderation::{
    AdminRegistry, EnforcementService, MessageClassifier, ModerationError, RuleCategory,
    RuleStore,
};
use crate::discord::platform::DiscordPlatform;
use crate::infra::moderation::InMemoryMuteStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Concrete enforcement service type used throughout the Discord layer.
pub type Enforcement = EnforcementService<InMemoryMuteStore, Arc<DiscordPlatform>>;

/// Data that's shared across all commands and event handlers.
pub struct Data {
    pub rules: Arc<RuleStore>,
    pub admins: Arc<AdminRegistry>,
    pub classifier: Arc<MessageClassifier>,
    pub enforcement: Arc<Enforcement>,
    pub platform: Arc<DiscordPlatform>,
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RuleCategoryChoice {
    #[name = "keyword"]
    Keyword,
    #[name = "domain"]
    Domain,
    #[name = "offensive"]
    Offensive,
}

impl From<RuleCategoryChoice> for RuleCategory {
    fn from(choice: RuleCategoryChoice) -> Self {
        match choice {
            RuleCategoryChoice::Keyword => RuleCategory::Keyword,
            RuleCategoryChoice::Domain => RuleCategory::Domain,
            RuleCategoryChoice::Offensive => RuleCategory::Offensive,
        }
    }
}

/// Reject the command unless the caller is in the admin registry.
async fn ensure_admin(ctx: &Context<'_>) -> Result<bool, Error> {
    if ctx.data().admins.is_admin(ctx.author().id.get()) {
        return Ok(true);
    }
    ctx.say("⛔ You don't have permission to use this command.")
        .await?;
    Ok(false)
}

/// Reject the command unless the caller is the configured owner.
async fn ensure_owner(ctx: &Context<'_>) -> Result<bool, Error> {
    if ctx.data().admins.is_owner(ctx.author().id.get()) {
        return Ok(true);
    }
    ctx.say("⛔ Only the bot owner can use this command.")
        .await?;
    Ok(false)
}

/// Problem-category replies only - raw internals stay in the logs.
fn describe(err: &ModerationError) -> String {
    match err {
        ModerationError::InvalidFormat(msg) => format!("❌ Invalid format: {}.", msg),
        ModerationError::NotFound(what) => format!("❌ Not found: {}.", what),
        ModerationError::PermissionDenied(msg) => format!("⛔ Permission denied: {}.", msg),
        ModerationError::EnforcementFailed(_) => {
            "❌ Could not apply the restriction. Check the bot's permissions.".to_string()
        }
        ModerationError::LiftFailed(_) => {
            "❌ Could not lift the restriction. It will be retried automatically.".to_string()
        }
        ModerationError::Storage(_) => "❌ Internal storage error.".to_string(),
    }
}

// ============================================================================
// /rules - manage the filter lists
// ============================================================================

/// Manage the moderation rule lists.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("rule_add", "rule_remove", "rule_list")
)]
pub async fn rules(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add an item to a rule list.
#[poise::command(slash_command, guild_only, rename = "add")]
pub async fn rule_add(
    ctx: Context<'_>,
    #[description = "Which rule list"] category: RuleCategoryChoice,
    #[description = "Item to block (keyword, domain or word)"] item: String,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let category = RuleCategory::from(category);
    match ctx.data().rules.add(category, &item) {
        Ok(()) => {
            ctx.say(format!(
                "✅ Added `{}` to the {} list.",
                item.trim().to_lowercase(),
                category
            ))
            .await?;
        }
        Err(err) => {
            ctx.say(describe(&err)).await?;
        }
    }
    Ok(())
}

/// Remove an item from a rule list.
#[poise::command(slash_command, guild_only, rename = "remove")]
pub async fn rule_remove(
    ctx: Context<'_>,
    #[description = "Which rule list"] category: RuleCategoryChoice,
    #[description = "Item to unblock"] item: String,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let category = RuleCategory::from(category);
    match ctx.data().rules.remove(category, &item) {
        Ok(()) => {
            ctx.say(format!(
                "✅ Removed `{}` from the {} list.",
                item.trim().to_lowercase(),
                category
            ))
            .await?;
        }
        Err(err) => {
            ctx.say(describe(&err)).await?;
        }
    }
    Ok(())
}

/// Show the contents of a rule list.
#[poise::command(slash_command, guild_only, rename = "list")]
pub async fn rule_list(
    ctx: Context<'_>,
    #[description = "Which rule list"] category: RuleCategoryChoice,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let category = RuleCategory::from(category);
    let items = ctx.data().rules.items(category);
    if items.is_empty() {
        ctx.say(format!("The {} list is empty.", category)).await?;
    } else {
        ctx.say(format!(
            "**{} list** ({} items):\n{}",
            category,
            items.len(),
            items
                .iter()
                .map(|item| format!("• `{}`", item))
                .collect::<Vec<_>>()
                .join("\n")
        ))
        .await?;
    }
    Ok(())
}

// ============================================================================
// /admins - manage the admin registry
// ============================================================================

/// Manage who may run moderation commands.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("admin_add", "admin_remove", "admin_list")
)]
pub async fn admins(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Grant a user moderation admin rights (owner only).
#[poise::command(slash_command, guild_only, rename = "add")]
pub async fn admin_add(
    ctx: Context<'_>,
    #[description = "User to promote"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_owner(&ctx).await? {
        return Ok(());
    }
    ctx.data().admins.add(user.id.get());
    ctx.say(format!("✅ <@{}> is now a moderation admin.", user.id))
        .await?;
    Ok(())
}

/// Revoke a user's moderation admin rights (owner only).
#[poise::command(slash_command, guild_only, rename = "remove")]
pub async fn admin_remove(
    ctx: Context<'_>,
    #[description = "User to demote"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_owner(&ctx).await? {
        return Ok(());
    }
    match ctx.data().admins.remove(user.id.get()) {
        Ok(()) => {
            ctx.say(format!("✅ <@{}> is no longer a moderation admin.", user.id))
                .await?;
        }
        Err(err) => {
            ctx.say(describe(&err)).await?;
        }
    }
    Ok(())
}

/// List the moderation admins.
#[poise::command(slash_command, guild_only, rename = "list")]
pub async fn admin_list(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let owner_id = ctx.data().admins.owner_id();
    let lines: Vec<String> = ctx
        .data()
        .admins
        .list()
        .into_iter()
        .map(|id| {
            if id == owner_id {
                format!("• <@{}> (owner)", id)
            } else {
                format!("• <@{}>", id)
            }
        })
        .collect();
    ctx.say(format!("**Moderation admins:**\n{}", lines.join("\n")))
        .await?;
    Ok(())
}

// ============================================================================
// /modconfig - runtime settings
// ============================================================================

/// View or change moderation settings.
#[poise::command(slash_command, guild_only, subcommands("config_show", "config_set"))]
pub async fn modconfig(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current moderation settings.
#[poise::command(slash_command, guild_only, rename = "show")]
pub async fn config_show(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let config = ctx.data().enforcement.config().await;

    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Moderation Settings")
        .color(if config.enabled { 0x00FF00 } else { 0xFF0000 })
        .field(
            "Filtering",
            if config.enabled {
                "✅ Enabled"
            } else {
                "❌ Disabled"
            },
            false,
        )
        .field(
            "Mute durations",
            format!(
                "Advertising (keywords/domains): {} min\nOffensive words: {} min",
                config.ad_mute_duration_minutes, config.swear_mute_duration_minutes
            ),
            false,
        )
        .field(
            "Notify on mute",
            if config.notify_on_mute { "Yes" } else { "No" },
            true,
        )
        .field("Greeting", config.greeting_message.clone(), false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Change moderation settings. Only the given fields are updated.
#[poise::command(slash_command, guild_only, rename = "set")]
pub async fn config_set(
    ctx: Context<'_>,
    #[description = "Enable or disable filtering"] enabled: Option<bool>,
    #[description = "Mute minutes for offensive words (default: 30)"] swear_minutes: Option<u32>,
    #[description = "Mute minutes for ads and spam links (default: 20)"] ad_minutes: Option<u32>,
    #[description = "Announce automatic mutes in the chat"] notify_on_mute: Option<bool>,
    #[description = "Greeting template, {member_name} is substituted"] greeting: Option<String>,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let updated = ctx
        .data()
        .enforcement
        .update_config(|config| {
            if let Some(value) = enabled {
                config.enabled = value;
            }
            if let Some(value) = swear_minutes {
                config.swear_mute_duration_minutes = i64::from(value);
            }
            if let Some(value) = ad_minutes {
                config.ad_mute_duration_minutes = i64::from(value);
            }
            if let Some(value) = notify_on_mute {
                config.notify_on_mute = value;
            }
            if let Some(value) = greeting {
                config.greeting_message = value;
            }
        })
        .await;

    ctx.say(format!(
        "✅ Settings updated!\n\
         • Filtering: {}\n\
         • Offensive-word mute: {} min\n\
         • Ad/spam mute: {} min\n\
         • Notify on mute: {}",
        if updated.enabled { "enabled" } else { "disabled" },
        updated.swear_mute_duration_minutes,
        updated.ad_mute_duration_minutes,
        if updated.notify_on_mute { "yes" } else { "no" },
    ))
    .await?;
    Ok(())
}

// ============================================================================
// /unmute and /mutes - manual mute management
// ============================================================================

/// Lift a member's mute ahead of schedule.
#[poise::command(slash_command, guild_only)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    // Route the early-unmute notice to the channel the admin is using.
    ctx.data()
        .platform
        .remember_channel(guild_id, ctx.channel_id().get());

    match ctx.data().enforcement.lift(guild_id, user.id.get(), true).await {
        Ok(()) => {
            ctx.say(format!("✅ <@{}> has been unmuted.", user.id))
                .await?;
        }
        Err(err) => {
            tracing::error!(guild_id, user_id = user.id.get(), error = %err, "manual unmute failed");
            ctx.say(describe(&err)).await?;
        }
    }
    Ok(())
}

/// List currently muted members and when their mutes expire.
#[poise::command(slash_command, guild_only)]
pub async fn mutes(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    let records = ctx
        .data()
        .enforcement
        .active_mutes()
        .await
        .map_err(|err| Error::from(err.to_string()))?;
    let lines: Vec<String> = records
        .into_iter()
        .filter(|record| record.chat_id == guild_id)
        .map(|record| {
            format!(
                "• <@{}> until <t:{}:R>",
                record.user_id,
                record.until.timestamp()
            )
        })
        .collect();

    if lines.is_empty() {
        ctx.say("No members are currently muted.").await?;
    } else {
        ctx.say(format!("**Active mutes:**\n{}", lines.join("\n")))
            .await?;
    }
    Ok(())
}
