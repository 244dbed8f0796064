//! Cache freshness policy and last-writer-wins request stamping.

use std::time::{Duration, Instant};

/// Cache time-to-live tiers.
///
/// Below `short` a cached snapshot is served without any refresh
/// consideration; between `short` and `long` it is still served
/// synchronously while a background revalidation may run; past `long`
/// the cache is hard-stale and a fetch must hit the network. Analytics
/// get their own, longer tier since they are expensive and less
/// time-sensitive.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub short: Duration,
    pub long: Duration,
    pub analytics_short: Duration,
    pub analytics_long: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(15),
            long: Duration::from_secs(30),
            analytics_short: Duration::from_secs(300),
            analytics_long: Duration::from_secs(600),
        }
    }
}

/// Age classification of a cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Below the short TTL: serve as-is
    Fresh,
    /// Between the TTLs: serve as-is, revalidate in the background
    Aging,
    /// Past the long TTL (or never fetched): must refetch
    Stale,
}

/// Classify the age of a snapshot. `None` (never fetched) is stale.
pub fn freshness(fetched_at: Option<Instant>, short: Duration, long: Duration) -> Freshness {
    match fetched_at {
        None => Freshness::Stale,
        Some(at) => {
            let age = at.elapsed();
            if age < short {
                Freshness::Fresh
            } else if age < long {
                Freshness::Aging
            } else {
                Freshness::Stale
            }
        }
    }
}

/// Monotonic request stamps for last-writer-wins cache commits.
///
/// Every outgoing fetch takes a stamp at request time; a response may
/// only commit if no response with a newer stamp committed first. This
/// keeps an in-flight stale response from overwriting fresher data after
/// it was superseded by a forced refetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestStamps {
    next: u64,
    committed: u64,
}

impl RequestStamps {
    /// Take a stamp for a request that is about to go out.
    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Attempt to commit a response. Returns `false` when a newer
    /// request already committed, in which case the caller must discard
    /// its data.
    pub fn try_commit(&mut self, stamp: u64) -> bool {
        if stamp <= self.committed {
            return false;
        }
        self.committed = stamp;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fetched_is_stale() {
        let ttl = CacheTtl::default();
        assert_eq!(freshness(None, ttl.short, ttl.long), Freshness::Stale);
    }

    #[test]
    fn fresh_within_short_ttl() {
        let ttl = CacheTtl::default();
        assert_eq!(
            freshness(Some(Instant::now()), ttl.short, ttl.long),
            Freshness::Fresh
        );
    }

    #[test]
    fn aging_between_ttls_and_stale_past_long() {
        let short = Duration::from_millis(10);
        let long = Duration::from_millis(30);
        let fetched = Instant::now();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(freshness(Some(fetched), short, long), Freshness::Aging);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(freshness(Some(fetched), short, long), Freshness::Stale);
    }

    #[test]
    fn stamps_are_monotonic_and_last_writer_wins() {
        let mut stamps = RequestStamps::default();
        let first = stamps.issue();
        let second = stamps.issue();
        assert!(second > first);

        // Newer response lands first; the superseded one is discarded.
        assert!(stamps.try_commit(second));
        assert!(!stamps.try_commit(first));

        // And a yet-newer request can still commit.
        let third = stamps.issue();
        assert!(stamps.try_commit(third));
    }

    #[test]
    fn in_order_commits_all_succeed() {
        let mut stamps = RequestStamps::default();
        let a = stamps.issue();
        let b = stamps.issue();
        assert!(stamps.try_commit(a));
        assert!(stamps.try_commit(b));
    }
}
