//! Bounded TTL cache of file sizes
//!
//! Filled by successful STATs on the gateway and consulted by listings.
//! Any operation that can change a file's size invalidates its entry.
//!
//! A STAT may start before a write and finish after it. To keep such a
//! stale size out of the cache, callers take a [`SizeCache::generation`]
//! before the STAT and store through [`SizeCache::insert_if_current`],
//! which refuses the size when the name was invalidated in between.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Entry {
	size: u64,
	stored: Instant,
}

#[derive(Debug, Default)]
struct Inner {
	entries: HashMap<String, Entry>,
	/// Clock value of the latest invalidation per name
	invalidated: HashMap<String, u64>,
	/// Bumped by every invalidation
	clock: u64,
	/// Generations below this are refused for every name
	floor: u64,
}

/// Name to size cache with a capacity bound and per-entry expiry
#[derive(Debug)]
pub struct SizeCache {
	capacity: usize,
	ttl: Duration,
	inner: Mutex<Inner>,
}

impl SizeCache {
	/// Capacity 0 disables the cache: nothing is stored or returned
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		Self { capacity, ttl, inner: Mutex::new(Inner::default()) }
	}

	pub fn is_enabled(&self) -> bool {
		self.capacity > 0
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Cached size, if present and not expired
	pub fn get(&self, name: &str) -> Option<u64> {
		if !self.is_enabled() {
			return None;
		}
		let mut inner = self.lock();
		match inner.entries.get(name) {
			Some(entry) if entry.stored.elapsed() < self.ttl => Some(entry.size),
			Some(_) => {
				inner.entries.remove(name);
				None
			}
			None => None,
		}
	}

	/// Token to pass to [`SizeCache::insert_if_current`]; take it before the STAT
	pub fn generation(&self) -> u64 {
		self.lock().clock
	}

	/// Store a size, evicting the oldest entry when full
	pub fn insert(&self, name: &str, size: u64) {
		if !self.is_enabled() {
			return;
		}
		let mut inner = self.lock();
		self.store(&mut inner, name, size);
	}

	/// Store a size unless `name` was invalidated after `generation` was taken
	///
	/// Returns whether the size was stored.
	pub fn insert_if_current(&self, name: &str, generation: u64, size: u64) -> bool {
		if !self.is_enabled() {
			return false;
		}
		let mut inner = self.lock();
		if generation < inner.floor {
			return false;
		}
		if inner.invalidated.get(name).is_some_and(|at| *at > generation) {
			return false;
		}
		self.store(&mut inner, name, size);
		true
	}

	fn store(&self, inner: &mut Inner, name: &str, size: u64) {
		if !inner.entries.contains_key(name) && inner.entries.len() >= self.capacity {
			let ttl = self.ttl;
			inner.entries.retain(|_, entry| entry.stored.elapsed() < ttl);
			if inner.entries.len() >= self.capacity {
				let oldest = inner
					.entries
					.iter()
					.min_by_key(|(_, entry)| entry.stored)
					.map(|(name, _)| name.clone());
				if let Some(oldest) = oldest {
					inner.entries.remove(&oldest);
				}
			}
		}
		inner.entries.insert(name.to_string(), Entry { size, stored: Instant::now() });
	}

	/// Forget a name and refuse sizes from STATs that started before now
	pub fn invalidate(&self, name: &str) {
		if !self.is_enabled() {
			return;
		}
		let mut inner = self.lock();
		inner.clock += 1;
		let clock = inner.clock;
		inner.entries.remove(name);
		inner.invalidated.insert(name.to_string(), clock);
		// Past the bound, drop the per-name stamps and refuse every older generation
		if inner.invalidated.len() > self.capacity {
			inner.invalidated.clear();
			inner.floor = clock;
		}
	}

	pub fn len(&self) -> usize {
		self.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_insert_get_invalidate() {
		let cache = SizeCache::new(4, Duration::from_secs(60));
		cache.insert("a", 10);
		assert_eq!(cache.get("a"), Some(10));
		cache.insert("a", 20);
		assert_eq!(cache.get("a"), Some(20));
		cache.invalidate("a");
		assert_eq!(cache.get("a"), None);
	}

	#[test]
	fn test_capacity_evicts_oldest() {
		let cache = SizeCache::new(2, Duration::from_secs(60));
		cache.insert("a", 1);
		std::thread::sleep(Duration::from_millis(2));
		cache.insert("b", 2);
		std::thread::sleep(Duration::from_millis(2));
		cache.insert("c", 3);
		assert_eq!(cache.len(), 2);
		assert_eq!(cache.get("a"), None);
		assert_eq!(cache.get("b"), Some(2));
		assert_eq!(cache.get("c"), Some(3));
	}

	#[test]
	fn test_expiry() {
		let cache = SizeCache::new(4, Duration::from_millis(10));
		cache.insert("a", 1);
		std::thread::sleep(Duration::from_millis(25));
		assert_eq!(cache.get("a"), None);
		assert!(cache.is_empty());
	}

	#[test]
	fn test_disabled() {
		let cache = SizeCache::new(0, Duration::from_secs(60));
		cache.insert("a", 1);
		assert!(!cache.insert_if_current("a", cache.generation(), 1));
		assert_eq!(cache.get("a"), None);
		assert!(cache.is_empty());
	}

	#[test]
	fn test_stat_started_before_invalidation_is_refused() {
		let cache = SizeCache::new(4, Duration::from_secs(60));
		let before = cache.generation();
		cache.invalidate("f");
		assert!(!cache.insert_if_current("f", before, 5));
		assert_eq!(cache.get("f"), None);

		let after = cache.generation();
		assert!(cache.insert_if_current("f", after, 1000));
		assert_eq!(cache.get("f"), Some(1000));
	}

	#[test]
	fn test_invalidation_of_other_names_does_not_block() {
		let cache = SizeCache::new(4, Duration::from_secs(60));
		let before = cache.generation();
		cache.invalidate("other");
		assert!(cache.insert_if_current("f", before, 7));
		assert_eq!(cache.get("f"), Some(7));
	}

	#[test]
	fn test_stamp_overflow_refuses_older_generations() {
		let cache = SizeCache::new(2, Duration::from_secs(60));
		let before = cache.generation();
		for name in ["a", "b", "c"] {
			cache.invalidate(name);
		}
		// Stamps were dropped, so even an untouched name is refused
		assert!(!cache.insert_if_current("z", before, 1));
		assert!(cache.insert_if_current("z", cache.generation(), 1));
	}
}

// vim: ts=4
