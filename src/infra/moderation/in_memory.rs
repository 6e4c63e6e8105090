// In-memory implementation of the mute ledger.
//
// **Why in-memory?**
// Mutes are short-lived (tens of minutes) and the bot makes no persistence
// promise across restarts, so a concurrent map is the whole store. If
// persistence is ever needed, a database-backed MuteStore drops in behind
// the same trait.

use crate::core::moderation::{ModerationError, MuteRecord, MuteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// DashMap keyed by (chat_id, user_id) - one record per pair by
/// construction, so inserting an existing pair overwrites the expiry.
pub struct InMemoryMuteStore {
    mutes: DashMap<(u64, u64), DateTime<Utc>>,
}

impl InMemoryMuteStore {
    pub fn new() -> Self {
        Self {
            mutes: DashMap::new(),
        }
    }
}

impl Default for InMemoryMuteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MuteStore for InMemoryMuteStore {
    async fn insert(
        &self,
        chat_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
    ) -> Result<(), ModerationError> {
        self.mutes.insert((chat_id, user_id), until);
        Ok(())
    }

    async fn remove(&self, chat_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        Ok(self.mutes.remove(&(chat_id, user_id)).is_some())
    }

    async fn lookup(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> Result<Option<DateTime<Utc>>, ModerationError> {
        Ok(self.mutes.get(&(chat_id, user_id)).map(|entry| *entry))
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<(u64, u64)>, ModerationError> {
        // Keys are unique, so each expired pair appears exactly once even
        // if unrelated inserts land mid-iteration. Sorted for determinism.
        let mut expired: Vec<(u64, u64)> = self
            .mutes
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| *entry.key())
            .collect();
        expired.sort_unstable();
        Ok(expired)
    }

    async fn active(&self) -> Result<Vec<MuteRecord>, ModerationError> {
        let mut records: Vec<MuteRecord> = self
            .mutes
            .iter()
            .map(|entry| MuteRecord {
                chat_id: entry.key().0,
                user_id: entry.key().1,
                until: *entry.value(),
            })
            .collect();
        records.sort_by_key(|record| (record.chat_id, record.user_id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn insert_overwrites_existing_record() {
        let store = InMemoryMuteStore::new();
        let first = Utc::now() + Duration::minutes(30);
        let second = Utc::now() + Duration::minutes(5);

        store.insert(1, 2, first).await.unwrap();
        store.insert(1, 2, second).await.unwrap();

        assert_eq!(store.lookup(1, 2).await.unwrap(), Some(second));
        assert_eq!(store.active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_reports_whether_record_existed() {
        let store = InMemoryMuteStore::new();
        store
            .insert(1, 2, Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        assert!(store.remove(1, 2).await.unwrap());
        assert!(!store.remove(1, 2).await.unwrap());
        assert_eq!(store.lookup(1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sweep_is_deterministic_and_non_destructive() {
        let store = InMemoryMuteStore::new();
        let now = Utc::now();
        store
            .insert(2, 9, now - Duration::minutes(1))
            .await
            .unwrap();
        store
            .insert(1, 5, now - Duration::minutes(2))
            .await
            .unwrap();
        store
            .insert(1, 6, now + Duration::minutes(10))
            .await
            .unwrap();

        let first = store.expired(now).await.unwrap();
        let second = store.expired(now).await.unwrap();
        assert_eq!(first, vec![(1, 5), (2, 9)]);
        assert_eq!(first, second);

        // Sweeping does not remove; removal is the caller's job.
        assert!(store.lookup(1, 5).await.unwrap().is_some());
        store.remove(1, 5).await.unwrap();
        assert_eq!(store.expired(now).await.unwrap(), vec![(2, 9)]);
    }

    #[tokio::test]
    async fn boundary_expiry_counts_as_expired() {
        let store = InMemoryMuteStore::new();
        let now = Utc::now();
        store.insert(1, 2, now).await.unwrap();
        assert_eq!(store.expired(now).await.unwrap(), vec![(1, 2)]);
    }
}
