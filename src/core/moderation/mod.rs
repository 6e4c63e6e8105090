// Core moderation module - classification, enforcement, and mute expiry.
// Following the same layered pattern as the rest of the codebase: pure
// business logic here, trait implementations in infra, Discord glue in the
// discord layer.

pub mod classifier;
pub mod enforcement_service;
pub mod expiry_scheduler;
pub mod moderation_models;
pub mod rule_store;

pub use classifier::*;
pub use enforcement_service::*;
pub use expiry_scheduler::*;
pub use moderation_models::*;
pub use rule_store::*;
