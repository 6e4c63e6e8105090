// Discord layer - commands, event handlers, and the platform adapter.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "platform.rs"]
pub mod platform;

// Re-export the shared command types for convenience
pub use moderation::commands::{Data, Error};
