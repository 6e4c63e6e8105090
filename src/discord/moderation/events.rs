// Non-command guild events the moderation bot cares about.

use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Greet a new member in the guild's system channel using the configured
/// template.
pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let guild = member.guild_id.to_partial_guild(&ctx.http).await?;
    let channel_id = match guild.system_channel_id {
        Some(id) => id,
        None => {
            tracing::debug!(guild_id = member.guild_id.get(), "no system channel, skipping greeting");
            return Ok(());
        }
    };

    let greeting = data
        .enforcement
        .config()
        .await
        .render_greeting(member.display_name());
    channel_id.say(&ctx.http, greeting).await?;
    Ok(())
}
