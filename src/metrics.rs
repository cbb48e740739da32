//! Cache performance metrics.

/// Counters describing how a cache has been used.
///
/// Available with the `metrics` feature.
///
/// # Example
///
/// ```
/// use lru_memo::LruCache;
///
/// let cache: LruCache<u32, u32> = LruCache::new(128);
/// cache.put(1, 1);
/// cache.lookup(&1);
/// cache.lookup(&2);
///
/// let metrics = cache.metrics();
/// assert_eq!(metrics.total_accesses(), 2);
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
	/// Lookups that found their key.
	pub hits: u64,
	/// Lookups that did not find their key.
	pub misses: u64,
	/// New keys stored.
	pub inserts: u64,
	/// Existing keys overwritten.
	pub updates: u64,
	/// Entries dropped to respect the capacity.
	pub evictions: u64,
	/// Generator invocations from `get_or_compute`.
	pub generated: u64,
	/// Current number of entries.
	pub len: usize,
	/// Current capacity bound.
	pub capacity: usize,
}

impl CacheMetrics {
	/// Ratio of hits to lookups, between 0.0 and 1.0.
	///
	/// Returns 0.0 if there have been no lookups.
	pub fn hit_rate(&self) -> f64 {
		let total = self.total_accesses();
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Fraction of the capacity in use. A disabled cache reports 0.0.
	///
	/// Can exceed 1.0 briefly after the cache has been shrunk.
	pub fn utilization(&self) -> f64 {
		if self.capacity == 0 {
			0.0
		} else {
			self.len as f64 / self.capacity as f64
		}
	}

	/// Total lookups (hits + misses).
	pub fn total_accesses(&self) -> u64 {
		self.hits + self.misses
	}

	/// Total writes (inserts + updates).
	pub fn total_writes(&self) -> u64 {
		self.inserts + self.updates
	}
}
