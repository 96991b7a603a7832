use chrono::Utc;
use metrics::{counter, gauge, increment_counter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Process-local set of revoked token ids, indexed by expiry.
///
/// Revocation is authoritative for this process only; a stale replica may
/// briefly honor a revoked token, bounded by the short access lifetime.
/// The set also keeps a per-user index of issued token ids so every
/// outstanding token of a user can be revoked in one call.
///
/// Concurrently readable, exclusively writable; all operations are O(1)
/// amortized. Expired entries are dropped by [`sweep`](Self::sweep),
/// driven by the background task from [`spawn_sweeper`].
#[derive(Default)]
pub struct RevocationSet {
    // jti -> expiry (unix seconds)
    revoked: RwLock<HashMap<String, i64>>,
    // user id -> issued (jti, expiry)
    issued: RwLock<HashMap<i64, Vec<(String, i64)>>>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a token id revoked until its expiry passes.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        self.revoked.write().insert(jti.to_string(), expires_at);
        increment_counter!("tokens_revoked_total");
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().contains_key(jti)
    }

    /// Record an issued token so it can be bulk-revoked later.
    pub fn record_issued(&self, user_id: i64, jti: &str, expires_at: i64) {
        self.issued
            .write()
            .entry(user_id)
            .or_default()
            .push((jti.to_string(), expires_at));
    }

    /// Revoke every outstanding token issued to a user. Returns the number
    /// of newly revoked ids.
    pub fn revoke_all_for_user(&self, user_id: i64) -> usize {
        let issued = match self.issued.write().remove(&user_id) {
            Some(issued) => issued,
            None => return 0,
        };
        let mut revoked = self.revoked.write();
        let mut count = 0;
        for (jti, expires_at) in issued {
            if revoked.insert(jti, expires_at).is_none() {
                count += 1;
            }
        }
        counter!("tokens_revoked_total", count as u64);
        count
    }

    /// Drop entries whose expiry has passed. Returns the number removed.
    pub fn sweep(&self, now: i64) -> usize {
        let mut removed = 0;
        {
            let mut revoked = self.revoked.write();
            let before = revoked.len();
            revoked.retain(|_, expires_at| *expires_at > now);
            removed += before - revoked.len();
        }
        {
            let mut issued = self.issued.write();
            for tokens in issued.values_mut() {
                tokens.retain(|(_, expires_at)| *expires_at > now);
            }
            issued.retain(|_, tokens| !tokens.is_empty());
        }
        gauge!("revocation_set_size", self.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.revoked.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.read().is_empty()
    }
}

/// Run a periodic sweep until the shutdown signal flips.
pub fn spawn_sweeper(
    set: Arc<RevocationSet>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = set.sweep(Utc::now().timestamp());
                    if removed > 0 {
                        debug!(removed, "swept expired revocation entries");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
