// Discord implementation of the ChatPlatform port.
//
// "chat" in the core maps to a Discord guild: restricting a member is a
// communication timeout, lifting clears it. Notifications go to the channel
// where the offending message (or admin command) was last seen, since a
// guild has no single canonical text channel.

use crate::core::moderation::{ChatPlatform, PlatformError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub struct DiscordPlatform {
    http: Arc<serenity::Http>,
    // Guild ID -> channel where moderation notices should land.
    notify_channels: DashMap<u64, u64>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self {
            http,
            notify_channels: DashMap::new(),
        }
    }

    /// Remember where in this guild moderation traffic is happening, so
    /// notices end up in front of the people involved.
    pub fn remember_channel(&self, guild_id: u64, channel_id: u64) {
        self.notify_channels.insert(guild_id, channel_id);
    }
}

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        PlatformError(err.to_string())
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn restrict_member(
        &self,
        chat_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
    ) -> Result<(), PlatformError> {
        let timeout_until = serenity::Timestamp::from_unix_timestamp(until.timestamp())
            .map_err(|err| PlatformError(err.to_string()))?;
        serenity::GuildId::new(chat_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().disable_communication_until_datetime(timeout_until),
            )
            .await?;
        Ok(())
    }

    async fn unrestrict_member(&self, chat_id: u64, user_id: u64) -> Result<(), PlatformError> {
        serenity::GuildId::new(chat_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().enable_communication(),
            )
            .await?;
        Ok(())
    }

    async fn send_message(&self, chat_id: u64, text: &str) -> Result<(), PlatformError> {
        let channel_id = match self.notify_channels.get(&chat_id) {
            Some(entry) => *entry.value(),
            None => {
                tracing::warn!(
                    guild_id = chat_id,
                    "no known notification channel for guild, dropping notice"
                );
                return Ok(());
            }
        };
        serenity::ChannelId::new(channel_id)
            .say(&self.http, text)
            .await?;
        Ok(())
    }

    async fn member_display_name(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> Result<String, PlatformError> {
        let member = serenity::GuildId::new(chat_id)
            .member(&self.http, serenity::UserId::new(user_id))
            .await?;
        Ok(member.display_name().to_string())
    }
}
