// Discord moderation glue: slash commands, the message filter hook, and
// member events.

pub mod commands;
pub mod events;
pub mod message_filter;
