// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Content-keyed string deduplication.
//!
//! Translation bundles repeat the same strings ("OK", "Cancel", "Settings")
//! across many keys and locales. Interning them through a [`StringPool`] makes
//! every occurrence share one `Arc<str>`.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

/// Interned strings with a use tick for recency trimming.
#[derive(Debug, Default)]
pub struct StringPool {
    entries: HashMap<Arc<str>, u64>,
    tick: u64,
    bytes: usize,
    dedup_hits: u64,
}

impl StringPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled copy of `s`, adding it on first sight.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        self.tick += 1;
        let tick = self.tick;
        if let Some(existing) = self.entries.get_key_value(s).map(|(k, _)| Arc::clone(k)) {
            self.entries.insert(Arc::clone(&existing), tick);
            self.dedup_hits += 1;
            return existing;
        }
        let pooled: Arc<str> = Arc::from(s);
        self.bytes += pooled.len();
        self.entries.insert(Arc::clone(&pooled), tick);
        pooled
    }

    /// Keep only the most recently used `ratio` of strings.
    ///
    /// Returns bytes released.
    pub fn trim_to_recent(&mut self, ratio: f64) -> usize {
        let keep = (self.entries.len() as f64 * ratio.clamp(0.0, 1.0)) as usize;
        if keep >= self.entries.len() {
            return 0;
        }
        let mut by_recency: Vec<(Arc<str>, u64)> = self.entries.drain().collect();
        by_recency.sort_by(|a, b| b.1.cmp(&a.1));

        let before = self.bytes;
        let dropped = by_recency.split_off(keep);
        self.bytes -= dropped.iter().map(|(s, _)| s.len()).sum::<usize>();
        self.entries = by_recency.into_iter().collect();
        before - self.bytes
    }

    /// Drop every pooled string. Returns bytes released.
    pub fn clear(&mut self) -> usize {
        self.entries.clear();
        mem::take(&mut self.bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    #[must_use]
    pub fn dedup_hits(&self) -> u64 {
        self.dedup_hits
    }
}

/// A JSON payload whose strings (and object keys) live in a [`StringPool`].
#[derive(Debug, Clone, PartialEq)]
pub enum PooledValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(Arc<str>),
    List(Vec<PooledValue>),
    Map(BTreeMap<Arc<str>, PooledValue>),
}

impl PooledValue {
    /// Rebuild the value, interning every string through `pool`.
    pub fn intern(value: &Value, pool: &mut StringPool) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(pool.intern(s)),
            Value::Array(items) => Self::List(items.iter().map(|v| Self::intern(v, pool)).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (pool.intern(k), Self::intern(v, pool)))
                    .collect(),
            ),
        }
    }

    /// Owned JSON copy.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.to_string()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_value()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    /// Structure bytes only; pooled string contents are shared and counted
    /// by the pool.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        let own = mem::size_of::<Self>();
        match self {
            Self::List(items) => own + items.iter().map(Self::approx_bytes).sum::<usize>(),
            Self::Map(map) => {
                own + map
                    .values()
                    .map(|v| mem::size_of::<Arc<str>>() + v.approx_bytes())
                    .sum::<usize>()
            }
            _ => own,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intern_shares_allocation() {
        let mut pool = StringPool::new();
        let a = pool.intern("Cancel");
        let b = pool.intern("Cancel");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.bytes(), 6);
        assert_eq!(pool.dedup_hits(), 1);
    }

    #[test]
    fn test_trim_keeps_most_recent() {
        let mut pool = StringPool::new();
        for word in ["one", "two", "three", "four"] {
            pool.intern(word);
        }
        // Touch "one" so it becomes the most recent
        pool.intern("one");

        let freed = pool.trim_to_recent(0.5);
        assert_eq!(pool.len(), 2);
        // "two" and "three" were least recently used
        assert_eq!(freed, 3 + 5);

        let again = pool.intern("one");
        assert_eq!(pool.dedup_hits(), 2);
        assert_eq!(&*again, "one");
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut pool = StringPool::new();
        pool.intern("Play");
        pool.intern("Quit");
        assert_eq!(pool.clear(), 8);
        assert!(pool.is_empty());
        assert_eq!(pool.bytes(), 0);
    }

    #[test]
    fn test_pooled_value_roundtrip_and_sharing() {
        let mut pool = StringPool::new();
        let value = json!({
            "ok": "OK",
            "confirm": {"ok": "OK", "cancel": "Cancel"},
            "list": ["OK", 1, true, null]
        });

        let pooled = PooledValue::intern(&value, &mut pool);
        assert_eq!(pooled.to_value(), value);
        // "ok" key twice, "OK" text three times
        assert_eq!(pool.dedup_hits(), 3);
        assert!(pooled.approx_bytes() > 0);
    }
}
