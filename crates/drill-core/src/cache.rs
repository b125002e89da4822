//! Bounded cache of personal-backend clients keyed by `(url, key)`.
//!
//! Lookups refresh an entry's recency. When the cache is full, inserting a
//! new entry first evicts the least recently used one, found by linear scan.
//! Recency comes from a logical clock, so stamps never tie.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{Result, store::Connector};

pub const DEFAULT_CAPACITY: usize = 50;

type CacheKey = (String, String);

struct Entry<T> {
  client:    Arc<T>,
  last_used: u64,
}

struct Slots<T> {
  entries: HashMap<CacheKey, Entry<T>>,
  clock:   u64,
}

impl<T> Slots<T> {
  fn tick(&mut self) -> u64 {
    self.clock += 1;
    self.clock
  }

  fn evict_oldest(&mut self) {
    let oldest = self
      .entries
      .iter()
      .min_by_key(|(_, e)| e.last_used)
      .map(|(k, _)| k.clone());
    if let Some(key) = oldest {
      debug!(url = %key.0, "evicting least recently used client");
      self.entries.remove(&key);
    }
  }
}

/// A capacity-bounded map from `(url, key)` to a shared client handle.
///
/// The whole lookup / construct / evict / insert sequence runs under one
/// async mutex, so concurrent callers never build two clients for the same
/// pair.
pub struct ClientCache<C: Connector> {
  connector: C,
  capacity:  usize,
  slots:     Mutex<Slots<C::Client>>,
}

impl<C: Connector> ClientCache<C> {
  pub fn new(connector: C) -> Self { Self::with_capacity(connector, DEFAULT_CAPACITY) }

  /// A capacity of zero is treated as one.
  pub fn with_capacity(connector: C, capacity: usize) -> Self {
    Self {
      connector,
      capacity: capacity.max(1),
      slots: Mutex::new(Slots {
        entries: HashMap::new(),
        clock:   0,
      }),
    }
  }

  pub fn connector(&self) -> &C { &self.connector }

  pub fn capacity(&self) -> usize { self.capacity }

  /// Return the cached client for `(url, key)`, constructing it on a miss.
  ///
  /// A failed construction inserts nothing.
  pub async fn get(&self, url: &str, key: &str) -> Result<Arc<C::Client>> {
    let mut slots = self.slots.lock().await;
    let stamp = slots.tick();
    let cache_key = (url.to_owned(), key.to_owned());

    if let Some(entry) = slots.entries.get_mut(&cache_key) {
      entry.last_used = stamp;
      return Ok(Arc::clone(&entry.client));
    }

    let client = Arc::new(self.connector.connect(url, key).await?);
    if slots.entries.len() >= self.capacity {
      slots.evict_oldest();
    }
    debug!(%url, "connected personal backend client");
    slots.entries.insert(cache_key, Entry {
      client:    Arc::clone(&client),
      last_used: stamp,
    });
    Ok(client)
  }

  /// Drop the entry for `(url, key)`; returns whether one existed.
  pub async fn evict(&self, url: &str, key: &str) -> bool {
    let cache_key = (url.to_owned(), key.to_owned());
    self.slots.lock().await.entries.remove(&cache_key).is_some()
  }

  pub async fn clear(&self) { self.slots.lock().await.entries.clear(); }

  pub async fn contains(&self, url: &str, key: &str) -> bool {
    let cache_key = (url.to_owned(), key.to_owned());
    self.slots.lock().await.entries.contains_key(&cache_key)
  }

  pub async fn len(&self) -> usize { self.slots.lock().await.entries.len() }

  pub async fn is_empty(&self) -> bool { self.len().await == 0 }
}
