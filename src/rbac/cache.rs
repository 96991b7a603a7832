use metrics::increment_counter;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

struct Entry {
    permissions: HashSet<String>,
    expires_at: Instant,
}

/// Cache of effective permission sets keyed `(user id, scope)`.
///
/// Entries live for the configured TTL. Every mutation that could change a
/// user's effective set must call [`invalidate_user`](Self::invalidate_user);
/// there is no background refill. Hits and misses are counted through the
/// metrics facade.
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<(i64, Option<i64>), Entry>>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: i64, scope: Option<i64>) -> Option<HashSet<String>> {
        let entries = self.entries.read();
        match entries.get(&(user_id, scope)) {
            Some(entry) if entry.expires_at > Instant::now() => {
                increment_counter!("permission_cache_hits_total");
                Some(entry.permissions.clone())
            }
            _ => {
                increment_counter!("permission_cache_misses_total");
                None
            }
        }
    }

    pub fn insert(&self, user_id: i64, scope: Option<i64>, permissions: HashSet<String>) {
        self.entries.write().insert(
            (user_id, scope),
            Entry {
                permissions,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every cached scope for a user. Takes a short exclusive hold.
    pub fn invalidate_user(&self, user_id: i64) {
        self.entries
            .write()
            .retain(|(user, _), _| *user != user_id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(perms: &[&str]) -> HashSet<String> {
        perms.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let cache = PermissionCache::new(Duration::from_millis(20));
        cache.insert(1, None, set(&["user:read"]));

        assert_eq!(cache.get(1, None), Some(set(&["user:read"])));

        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get(1, None), None);
    }

    #[test]
    fn invalidation_covers_every_scope_of_the_user() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        cache.insert(1, None, set(&["a:b"]));
        cache.insert(1, Some(10), set(&["a:b", "c:d"]));
        cache.insert(2, Some(10), set(&["e:f"]));

        cache.invalidate_user(1);
        assert_eq!(cache.get(1, None), None);
        assert_eq!(cache.get(1, Some(10)), None);
        assert_eq!(cache.get(2, Some(10)), Some(set(&["e:f"])));
    }
}
