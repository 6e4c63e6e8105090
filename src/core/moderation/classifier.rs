// Message classification - decides whether a message violates a rule.
//
// Pure read-only logic over the current RuleStore contents: no I/O, no
// mutation. Whoever calls this decides what to do with the verdict.

use super::moderation_models::{RuleCategory, Verdict};
use super::rule_store::RuleStore;
use std::sync::Arc;

/// Classifies message text against the shared rule store.
///
/// Evaluation order is fixed: keyword, then domain, then offensive word -
/// first match wins. Domain spam usually co-occurs with keywords, so the
/// keyword verdict takes precedence; the order is a policy choice kept
/// stable for test determinism.
pub struct MessageClassifier {
    rules: Arc<RuleStore>,
}

impl MessageClassifier {
    pub fn new(rules: Arc<RuleStore>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Clean;
        }
        if let Some(term) = self.rules.contains_match(RuleCategory::Keyword, text) {
            return Verdict::Keyword(term);
        }
        if let Some(term) = self.rules.contains_match(RuleCategory::Domain, text) {
            return Verdict::Domain(term);
        }
        if let Some(term) = self.rules.contains_match(RuleCategory::Offensive, text) {
            return Verdict::Offensive(term);
        }
        Verdict::Clean
    }
}
