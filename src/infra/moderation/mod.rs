// Infra implementations for the moderation core: the in-memory mute ledger
// and startup rule seeding.

pub mod in_memory;
pub mod rule_seed;

pub use in_memory::InMemoryMuteStore;
pub use rule_seed::RuleSeed;
