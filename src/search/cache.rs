//! Result cache - bounded, time-expiring first-page cache / 结果缓存
//!
//! - Entries older than the TTL are treated as absent, never evicted on read
//! - Overflow evicts the oldest entries by insertion timestamp
//! 过期条目读取时视为不存在；超出容量按时间戳从旧到新淘汰。

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::schema::PhotoSummary;

/// Default time-to-live (5 minutes) / 默认过期时间
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
/// Default capacity / 默认容量
pub const DEFAULT_CAPACITY: usize = 50;

/// Cached first page / 缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub results: Vec<PhotoSummary>,
    pub total: Option<u64>,
    pub has_more: bool,
    pub timestamp: Instant,
}

#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    /// Insertion order, breaks timestamp ties / 插入序号
    seq: u64,
}

/// Cache statistics / 缓存统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    slots: HashMap<String, Slot>,
    next_seq: u64,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            slots: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a live entry / 查询未过期的条目
    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<CacheEntry> {
        let live = self
            .slots
            .get(key)
            .filter(|slot| now.saturating_duration_since(slot.entry.timestamp) <= self.ttl)
            .map(|slot| slot.entry.clone());

        if live.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        live
    }

    /// Insert or overwrite an entry / 插入或覆盖条目
    pub fn put(&mut self, key: String, results: Vec<PhotoSummary>, total: Option<u64>, has_more: bool) {
        self.put_entry(
            key,
            CacheEntry {
                results,
                total,
                has_more,
                timestamp: Instant::now(),
            },
        );
    }

    pub fn put_entry(&mut self, key: String, entry: CacheEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(key, Slot { entry, seq });

        if self.slots.len() > self.capacity {
            let mut by_age: Vec<(Instant, u64, String)> = self
                .slots
                .iter()
                .map(|(k, slot)| (slot.entry.timestamp, slot.seq, k.clone()))
                .collect();
            by_age.sort();

            let excess = self.slots.len() - self.capacity;
            for (_, _, key) in by_age.into_iter().take(excess) {
                self.slots.remove(&key);
                self.stats.evictions += 1;
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            ..self.stats.clone()
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}
