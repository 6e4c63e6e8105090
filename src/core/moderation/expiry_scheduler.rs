// Expiry scheduler - periodic sweep that lifts mutes whose time has passed.
//
// Runs as a background tokio task, independent of message handling; the
// only coordination point is the mute ledger. A sweep that runs late (e.g.
// right after a restart) simply lifts the overdue mutes then - nothing
// needs catch-up logic because the ledger only holds currently-muted pairs.

use super::enforcement_service::{ChatPlatform, EnforcementService, ModerationError, MuteStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Default pause between sweeps. Expiries are minute-granular, so a
/// half-minute cadence keeps lifts timely without hammering the ledger.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct ExpiryScheduler<S: MuteStore, P: ChatPlatform> {
    enforcement: Arc<EnforcementService<S, P>>,
    interval: Duration,
}

impl<S: MuteStore, P: ChatPlatform> ExpiryScheduler<S, P> {
    pub fn new(enforcement: Arc<EnforcementService<S, P>>, interval: Duration) -> Self {
        Self {
            enforcement,
            interval,
        }
    }

    /// Sweep forever. Intended for `tokio::spawn`; ends only with the
    /// process.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(0) => {}
                Ok(lifted) => tracing::debug!(lifted, "expiry sweep lifted mutes"),
                Err(err) => tracing::warn!(error = %err, "expiry sweep failed"),
            }
        }
    }

    /// One sweep pass: lift every mute expired as of `now`.
    ///
    /// A lift failure for one pair must not stall the rest, so failures are
    /// logged per entry and skipped; the entry stays in the ledger and gets
    /// retried on the next sweep. Returns how many mutes were lifted.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, ModerationError> {
        let expired = self.enforcement.expired_mutes(now).await?;
        let mut lifted = 0;
        for (chat_id, user_id) in expired {
            match self.enforcement.lift(chat_id, user_id, false).await {
                Ok(()) => lifted += 1,
                Err(err) => {
                    tracing::warn!(
                        chat_id,
                        user_id,
                        error = %err,
                        "failed to lift expired mute, will retry next sweep"
                    );
                }
            }
        }
        Ok(lifted)
    }
}
