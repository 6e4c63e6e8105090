// Initial rule lists loaded at startup.
//
// The stock lists mirror what the bot has always shipped with (Uzbek-market
// spam vocabulary). Operators can replace them with a JSON file via the
// RULES_FILE environment variable; nothing is written back to disk.

use crate::core::moderation::{RuleCategory, RuleStore};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSeed {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub offensive: Vec<String>,
}

impl RuleSeed {
    /// The built-in default lists.
    pub fn stock() -> Self {
        Self {
            keywords: [
                "reklama",
                "aksiya",
                "chegirma",
                "sotaman",
                "pul ishlash",
                "kriptovalyuta",
                "investitsiya",
                "daromad",
                "tez pul",
                "onlayn kazino",
                "stavka",
                "bukmeker",
                "bonus",
                "ro'yxatdan o'ting",
            ]
            .map(str::to_string)
            .to_vec(),
            domains: [
                "example.com",
                "spamlink.ru",
                "badsite.org",
                "1xbet",
                "mostbet",
                "parimatch",
            ]
            .map(str::to_string)
            .to_vec(),
            offensive: ["ahmoq", "jinni", "tentak"].map(str::to_string).to_vec(),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("malformed rule seed JSON")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule seed file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Load the lists into the store.
    pub fn apply(&self, rules: &RuleStore) {
        rules.extend(RuleCategory::Keyword, &self.keywords);
        rules.extend(RuleCategory::Domain, &self.domains);
        rules.extend(RuleCategory::Offensive, &self.offensive);
    }
}
