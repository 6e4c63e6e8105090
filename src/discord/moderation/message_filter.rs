// Discord-specific message filtering - runs every guild message through the
// classifier and applies enforcement on violations.

use crate::core::moderation::Verdict;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Classify a message and enforce on it if it violates a rule.
///
/// Returns `true` if the message was a violation and was handled.
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Skip bots (including ourselves).
    if msg.author.bot {
        return Ok(false);
    }

    // Only moderate guild messages, not DMs.
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };

    // Admins are exempt from the filter.
    if data.admins.is_admin(msg.author.id.get()) {
        return Ok(false);
    }

    if !data.enforcement.config().await.enabled {
        return Ok(false);
    }

    let verdict = data.classifier.classify(&msg.content);
    if !verdict.is_violation() {
        return Ok(false);
    }

    let user_id = msg.author.id.get();
    tracing::info!(
        guild_id,
        user_id,
        term = verdict.matched_term(),
        "message violated a moderation rule"
    );

    // Notices for this guild should land where the violation happened.
    data.platform.remember_channel(guild_id, msg.channel_id.get());

    // Best-effort delete; the mute matters more than the cleanup.
    if let Err(err) = msg.delete(&ctx.http).await {
        tracing::warn!(guild_id, user_id, error = %err, "failed to delete offending message");
    }

    match data.enforcement.enforce(guild_id, user_id, &verdict).await {
        Ok(Some(outcome)) => {
            tracing::info!(
                guild_id,
                user_id,
                minutes = outcome.duration_minutes,
                until = %outcome.until,
                "mute applied"
            );
        }
        Ok(None) => {
            // Unreachable with a violation verdict, but harmless.
            debug_assert!(matches!(verdict, Verdict::Clean));
        }
        Err(err) => {
            tracing::error!(guild_id, user_id, error = %err, "failed to apply mute");
        }
    }

    Ok(true)
}
