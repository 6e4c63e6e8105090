// Mutable rule sets used for message classification, plus the admin registry.
//
// All sets are concurrent (DashSet) so the message filter, admin commands,
// and the expiry sweep can touch them from interleaving tasks without a
// surrounding mutex. Mutations are authorized by the caller (command layer)
// against the AdminRegistry - the store itself does no permission checks.

use super::enforcement_service::ModerationError;
use super::moderation_models::RuleCategory;
use dashmap::DashSet;

/// The mutable collection of keyword/domain/offensive-word rules.
///
/// Items are stored normalized (trimmed, lower-cased), so membership tests
/// are case-insensitive by construction.
pub struct RuleStore {
    keywords: DashSet<String>,
    domains: DashSet<String>,
    offensive: DashSet<String>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            keywords: DashSet::new(),
            domains: DashSet::new(),
            offensive: DashSet::new(),
        }
    }

    fn set_for(&self, category: RuleCategory) -> &DashSet<String> {
        match category {
            RuleCategory::Keyword => &self.keywords,
            RuleCategory::Domain => &self.domains,
            RuleCategory::Offensive => &self.offensive,
        }
    }

    /// Add a rule item. Idempotent if the item is already present.
    ///
    /// Domains must look like a hostname: no internal whitespace and at
    /// least one dot.
    pub fn add(&self, category: RuleCategory, item: &str) -> Result<(), ModerationError> {
        let item = normalize(item);
        if item.is_empty() {
            return Err(ModerationError::InvalidFormat(
                "rule item is empty".to_string(),
            ));
        }
        if category == RuleCategory::Domain && (item.contains(char::is_whitespace) || !item.contains('.')) {
            return Err(ModerationError::InvalidFormat(format!(
                "'{}' is not a valid domain",
                item
            )));
        }
        self.set_for(category).insert(item);
        Ok(())
    }

    /// Remove a rule item. Fails with NotFound if it was never added.
    pub fn remove(&self, category: RuleCategory, item: &str) -> Result<(), ModerationError> {
        let item = normalize(item);
        if self.set_for(category).remove(&item).is_some() {
            Ok(())
        } else {
            Err(ModerationError::NotFound(format!(
                "{} '{}'",
                category, item
            )))
        }
    }

    /// Bulk-load items, normalizing but skipping format validation.
    ///
    /// The stock domain list contains bare brand tokens (e.g. "1xbet") that
    /// the interactive `add` path would reject, so seeding goes around it.
    pub fn extend<I>(&self, category: RuleCategory, items: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let set = self.set_for(category);
        for item in items {
            let item = normalize(item.as_ref());
            if !item.is_empty() {
                set.insert(item);
            }
        }
    }

    /// Find the rule item that matches `text`, if any.
    ///
    /// Keyword and offensive rules match as substrings of the lower-cased
    /// text; when several rules match, the one occurring earliest in the
    /// text wins (ties broken lexicographically) so classification is
    /// deterministic. Domain rules match against hostnames extracted from
    /// whitespace tokens: a host matches a rule when it equals the rule,
    /// ends with "." + rule, or one of its dot-separated labels equals the
    /// rule. The first matching token wins; among rules matching the same
    /// host, the longest rule wins.
    pub fn contains_match(&self, category: RuleCategory, text: &str) -> Option<String> {
        let text = text.to_lowercase();
        match category {
            RuleCategory::Keyword | RuleCategory::Offensive => {
                let mut best: Option<(usize, String)> = None;
                for rule in self.set_for(category).iter() {
                    if let Some(pos) = text.find(rule.key().as_str()) {
                        let better = match &best {
                            Some((best_pos, best_rule)) => {
                                pos < *best_pos
                                    || (pos == *best_pos && rule.key() < best_rule)
                            }
                            None => true,
                        };
                        if better {
                            best = Some((pos, rule.key().clone()));
                        }
                    }
                }
                best.map(|(_, rule)| rule)
            }
            RuleCategory::Domain => {
                for host in extract_hosts(&text) {
                    let mut best: Option<String> = None;
                    for rule in self.domains.iter() {
                        if host_matches(&host, rule.key())
                            && best.as_ref().map_or(true, |b| rule.key().len() > b.len())
                        {
                            best = Some(rule.key().clone());
                        }
                    }
                    if best.is_some() {
                        return best;
                    }
                }
                None
            }
        }
    }

    /// Sorted snapshot of one rule list, for the list command.
    pub fn items(&self, category: RuleCategory) -> Vec<String> {
        let mut items: Vec<String> = self
            .set_for(category)
            .iter()
            .map(|item| item.key().clone())
            .collect();
        items.sort();
        items
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(item: &str) -> String {
    item.trim().to_lowercase()
}

/// Pull hostname candidates out of message text.
///
/// Every whitespace token is a candidate: URL schemes are stripped, the
/// token is cut at the first '/', surrounding punctuation and a leading
/// "www." are dropped. Bare tokens stay in so dotless rules can match.
fn extract_hosts(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|token| {
            let token = token
                .strip_prefix("https://")
                .or_else(|| token.strip_prefix("http://"))
                .unwrap_or(token);
            let token = token.split('/').next().unwrap_or("");
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            let token = token.strip_prefix("www.").unwrap_or(token);
            if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            }
        })
        .collect()
}

fn host_matches(host: &str, rule: &str) -> bool {
    host == rule
        || host
            .strip_suffix(rule)
            .map_or(false, |prefix| prefix.ends_with('.'))
        || host.split('.').any(|label| label == rule)
}

/// User identities with elevated privilege.
///
/// The configured owner is always a member and can never be removed.
pub struct AdminRegistry {
    owner_id: u64,
    admins: DashSet<u64>,
}

impl AdminRegistry {
    pub fn new(owner_id: u64) -> Self {
        let admins = DashSet::new();
        admins.insert(owner_id);
        Self { owner_id, admins }
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        user_id == self.owner_id
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Grant admin rights. Idempotent.
    pub fn add(&self, user_id: u64) {
        self.admins.insert(user_id);
    }

    pub fn remove(&self, user_id: u64) -> Result<(), ModerationError> {
        if user_id == self.owner_id {
            return Err(ModerationError::PermissionDenied(
                "the owner cannot be removed from the admin list".to_string(),
            ));
        }
        if self.admins.remove(&user_id).is_some() {
            Ok(())
        } else {
            Err(ModerationError::NotFound(format!("admin {}", user_id)))
        }
    }

    pub fn list(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.admins.iter().map(|id| *id.key()).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_normalizes_items() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Keyword, "  ReKlAmA ").unwrap();
        assert_eq!(rules.items(RuleCategory::Keyword), vec!["reklama"]);
    }

    #[test]
    fn add_is_idempotent() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Keyword, "bonus").unwrap();
        rules.add(RuleCategory::Keyword, "BONUS").unwrap();
        assert_eq!(rules.items(RuleCategory::Keyword).len(), 1);
    }

    #[test]
    fn domain_format_is_validated() {
        let rules = RuleStore::new();
        assert!(matches!(
            rules.add(RuleCategory::Domain, "bad site.com"),
            Err(ModerationError::InvalidFormat(_))
        ));
        assert!(matches!(
            rules.add(RuleCategory::Domain, "nodot"),
            Err(ModerationError::InvalidFormat(_))
        ));
        rules.add(RuleCategory::Domain, "spamlink.ru").unwrap();
    }

    #[test]
    fn remove_missing_item_is_not_found() {
        let rules = RuleStore::new();
        assert!(matches!(
            rules.remove(RuleCategory::Keyword, "absent"),
            Err(ModerationError::NotFound(_))
        ));

        rules.add(RuleCategory::Keyword, "bonus").unwrap();
        rules.remove(RuleCategory::Keyword, "Bonus").unwrap();
        assert!(rules.items(RuleCategory::Keyword).is_empty());
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Keyword, "reklama").unwrap();
        assert_eq!(
            rules.contains_match(RuleCategory::Keyword, "Bu REKLAMA matni"),
            Some("reklama".to_string())
        );
        assert_eq!(rules.contains_match(RuleCategory::Keyword, "salom"), None);
    }

    #[test]
    fn earliest_keyword_occurrence_wins() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Keyword, "kazino").unwrap();
        rules.add(RuleCategory::Keyword, "onlayn kazino").unwrap();
        // "onlayn kazino" starts at 0, "kazino" at 7.
        assert_eq!(
            rules.contains_match(RuleCategory::Keyword, "onlayn kazino bonus"),
            Some("onlayn kazino".to_string())
        );
    }

    #[test]
    fn domain_matches_url_hostname() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Domain, "spamlink.ru").unwrap();
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "click http://spamlink.ru/x now"),
            Some("spamlink.ru".to_string())
        );
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "https://www.spamlink.ru/promo?a=1"),
            Some("spamlink.ru".to_string())
        );
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "spamlink ru"),
            None
        );
    }

    #[test]
    fn domain_matches_subdomain_suffix() {
        let rules = RuleStore::new();
        rules.add(RuleCategory::Domain, "badsite.org").unwrap();
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "go to cdn.badsite.org please"),
            Some("badsite.org".to_string())
        );
        // "notbadsite.org" must not match via a bare suffix.
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "notbadsite.org is fine"),
            None
        );
    }

    #[test]
    fn dotless_seed_domain_matches_host_label() {
        let rules = RuleStore::new();
        rules.extend(RuleCategory::Domain, ["1xbet"]);
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "stavka 1xbet.com da"),
            Some("1xbet".to_string())
        );
        assert_eq!(
            rules.contains_match(RuleCategory::Domain, "1xbet bonus"),
            Some("1xbet".to_string())
        );
    }

    #[test]
    fn owner_is_always_admin_and_unremovable() {
        let admins = AdminRegistry::new(42);
        assert!(admins.is_admin(42));
        assert!(admins.is_owner(42));
        assert!(matches!(
            admins.remove(42),
            Err(ModerationError::PermissionDenied(_))
        ));
    }

    #[test]
    fn admin_add_remove() {
        let admins = AdminRegistry::new(42);
        admins.add(7);
        assert!(admins.is_admin(7));
        assert!(!admins.is_owner(7));

        admins.remove(7).unwrap();
        assert!(!admins.is_admin(7));
        assert!(matches!(
            admins.remove(7),
            Err(ModerationError::NotFound(_))
        ));

        assert_eq!(admins.list(), vec![42]);
    }
}
