// This is the entry point of the group moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): classification,
//   enforcement, mute expiry
// - `infra/` = Implementations of core traits (in-memory ledger, rule seed)
// - `discord/` = Discord-specific adapters (commands, events, platform)
//
// This file's job is to:
// 1. Load configuration from the environment
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, the message filter, and the expiry sweep task

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::moderation::{
    AdminRegistry, EnforcementService, ExpiryScheduler, MessageClassifier, ModerationConfig,
    RuleStore, DEFAULT_SWEEP_INTERVAL,
};
use crate::discord::moderation::commands;
use crate::discord::moderation::{events, message_filter};
use crate::discord::platform::DiscordPlatform;
use crate::discord::{Data, Error};
use crate::infra::moderation::{InMemoryMuteStore, RuleSeed};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Event handler for non-command Discord events: the message filter and the
/// member-join greeting.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            match message_filter::handle_message(ctx, new_message, data).await {
                Ok(true) => {
                    tracing::debug!(message_id = new_message.id.get(), "message handled by filter");
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("error filtering message: {}", err);
                }
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(err) = events::handle_member_join(ctx, data, new_member).await {
                tracing::warn!("failed to greet new member: {}", err);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = match std::env::var("DISCORD_TOKEN") {
        Ok(token) => token,
        Err(_) => {
            tracing::error!("Missing DISCORD_TOKEN environment variable. Check your .env file.");
            return;
        }
    };
    let owner_id: u64 = match std::env::var("OWNER_ID").ok().and_then(|v| v.parse().ok()) {
        Some(id) => id,
        None => {
            tracing::error!("Missing or invalid OWNER_ID environment variable. Check your .env file.");
            return;
        }
    };
    let sweep_interval = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Shared state is built once here and handed to every component; nothing
    // reaches for globals.

    let rules = Arc::new(RuleStore::new());
    let seed = match std::env::var("RULES_FILE") {
        Ok(path) => RuleSeed::from_file(&path).unwrap_or_else(|err| {
            tracing::warn!("failed to load rule seed from {}: {}; using stock lists", path, err);
            RuleSeed::stock()
        }),
        Err(_) => RuleSeed::stock(),
    };
    seed.apply(&rules);

    let admins = Arc::new(AdminRegistry::new(owner_id));
    let classifier = Arc::new(MessageClassifier::new(Arc::clone(&rules)));

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::rules(),
                commands::admins(),
                commands::modconfig(),
                commands::unmute(),
                commands::mutes(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // The platform adapter and everything that talks through it
                // need the HTTP client, so they are built here.
                let platform = Arc::new(DiscordPlatform::new(ctx.http.clone()));
                let enforcement = Arc::new(EnforcementService::new(
                    InMemoryMuteStore::new(),
                    Arc::clone(&platform),
                    ModerationConfig::default(),
                ));

                // Background expiry sweep; runs until the process exits.
                let scheduler =
                    ExpiryScheduler::new(Arc::clone(&enforcement), sweep_interval);
                tokio::spawn(scheduler.run());

                tracing::info!(
                    owner_id,
                    sweep_secs = sweep_interval.as_secs(),
                    "moderation bot is ready"
                );

                Ok(Data {
                    rules,
                    admins,
                    classifier,
                    enforcement,
                    platform,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
