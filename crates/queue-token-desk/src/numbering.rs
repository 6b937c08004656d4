//! Per-service token numbering

use dashmap::DashMap;
use uuid::Uuid;

/// Hands out the next number of each service's sequence
///
/// Every service has its own counter. Taking a number holds the map entry of
/// that one service, so concurrent callers for the same service are
/// serialized. Callers for different services only contend when their
/// services share a map shard.
#[derive(Debug, Default)]
pub struct TokenCounter {
    issued: DashMap<Uuid, u32>,
}

impl TokenCounter {
    /// Take the next number for `service`, starting at 1.
    pub fn next(&self, service: Uuid) -> u32 {
        let mut entry = self.issued.entry(service).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Highest number handed out for `service` so far (0 if none).
    pub fn issued(&self, service: Uuid) -> u32 {
        self.issued.get(&service).map_or(0, |n| *n)
    }
}
