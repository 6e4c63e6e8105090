// Moderation domain models - data structures for the filter/mute system.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts these to platform-specific actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which rule list an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    /// Advertising / spam keywords, matched as substrings of message text.
    Keyword,
    /// Blocked link domains, matched against hostnames extracted from text.
    Domain,
    /// Offensive words, matched as substrings of message text.
    Offensive,
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleCategory::Keyword => write!(f, "keyword"),
            RuleCategory::Domain => write!(f, "domain"),
            RuleCategory::Offensive => write!(f, "offensive word"),
        }
    }
}

/// Classification outcome for a single message.
///
/// Violation variants carry the rule item that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing objectionable found.
    Clean,
    /// Message text contains a blocked keyword.
    Keyword(String),
    /// Message contains a link to a blocked domain.
    Domain(String),
    /// Message text contains an offensive word.
    Offensive(String),
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        !matches!(self, Verdict::Clean)
    }

    /// The rule item that triggered this verdict, if any.
    pub fn matched_term(&self) -> Option<&str> {
        match self {
            Verdict::Clean => None,
            Verdict::Keyword(term) | Verdict::Domain(term) | Verdict::Offensive(term) => {
                Some(term)
            }
        }
    }

    pub fn category(&self) -> Option<RuleCategory> {
        match self {
            Verdict::Clean => None,
            Verdict::Keyword(_) => Some(RuleCategory::Keyword),
            Verdict::Domain(_) => Some(RuleCategory::Domain),
            Verdict::Offensive(_) => Some(RuleCategory::Offensive),
        }
    }

    /// Human-readable reason used in notifications and logs.
    pub fn reason(&self) -> String {
        match self {
            Verdict::Clean => "clean".to_string(),
            Verdict::Keyword(term) => format!("banned keyword '{}'", term),
            Verdict::Domain(term) => format!("blocked domain '{}'", term),
            Verdict::Offensive(term) => format!("offensive word '{}'", term),
        }
    }
}

/// Runtime-tunable moderation settings.
///
/// Defaults match the stock configuration the bot ships with. Admins can
/// change every field at runtime; nothing here survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Global kill switch for automatic filtering.
    pub enabled: bool,
    /// Mute duration for offensive-word violations.
    pub swear_mute_duration_minutes: i64,
    /// Mute duration for keyword and domain (advertising) violations.
    pub ad_mute_duration_minutes: i64,
    /// Whether to announce automatic mutes in the chat.
    pub notify_on_mute: bool,
    /// Greeting template for new members; `{member_name}` is substituted.
    pub greeting_message: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            swear_mute_duration_minutes: 30,
            ad_mute_duration_minutes: 20,
            notify_on_mute: true,
            greeting_message: "Assalomu alaykum, {member_name}! Guruhimizga xush kelibsiz!"
                .to_string(),
        }
    }
}

impl ModerationConfig {
    /// Explicit category -> duration mapping.
    ///
    /// Keyword and domain spam both count as advertising and use the ad
    /// duration; offensive words use the swear duration.
    pub fn mute_duration_minutes(&self, category: RuleCategory) -> i64 {
        match category {
            RuleCategory::Keyword | RuleCategory::Domain => self.ad_mute_duration_minutes,
            RuleCategory::Offensive => self.swear_mute_duration_minutes,
        }
    }

    pub fn render_greeting(&self, member_name: &str) -> String {
        self.greeting_message.replace("{member_name}", member_name)
    }
}

/// An active mute as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteRecord {
    pub chat_id: u64,
    pub user_id: u64,
    /// Absolute instant at which the mute expires.
    pub until: DateTime<Utc>,
}

/// What an enforcement action actually did.
#[derive(Debug, Clone)]
pub struct MuteOutcome {
    pub chat_id: u64,
    pub user_id: u64,
    pub until: DateTime<Utc>,
    pub duration_minutes: i64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_mapping_is_explicit() {
        let config = ModerationConfig::default();
        assert_eq!(config.mute_duration_minutes(RuleCategory::Keyword), 20);
        assert_eq!(config.mute_duration_minutes(RuleCategory::Domain), 20);
        assert_eq!(config.mute_duration_minutes(RuleCategory::Offensive), 30);
    }

    #[test]
    fn greeting_substitutes_member_name() {
        let config = ModerationConfig {
            greeting_message: "Welcome, {member_name}!".to_string(),
            ..Default::default()
        };
        assert_eq!(config.render_greeting("Ali"), "Welcome, Ali!");
    }

    #[test]
    fn verdict_accessors() {
        let verdict = Verdict::Keyword("reklama".to_string());
        assert!(verdict.is_violation());
        assert_eq!(verdict.matched_term(), Some("reklama"));
        assert_eq!(verdict.category(), Some(RuleCategory::Keyword));

        assert!(!Verdict::Clean.is_violation());
        assert_eq!(Verdict::Clean.matched_term(), None);
        assert_eq!(Verdict::Clean.category(), None);
    }
}
