use std::hash::Hash;

use crate::cache::{Generator, LruCache};
use crate::policy::{ConcurrencyPolicy, InstanceLock};

/// Default capacity, in entries, for caches and for registry-created caches.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Builder for configuring an [`LruCache`].
///
/// # Example
///
/// ```
/// use lru_memo::{CacheBuilder, TypeLock};
///
/// let cache = CacheBuilder::<u64, String>::new(512)
///     .generator(|n| n.to_string())
///     .policy::<TypeLock>()
///     .build();
///
/// assert_eq!(cache.get_or_compute(&7).as_deref(), Some("7"));
/// ```
pub struct CacheBuilder<K, V, P = InstanceLock> {
	capacity: usize,
	generator: Option<Generator<K, V>>,
	policy: std::marker::PhantomData<fn() -> P>,
}

impl<K, V> CacheBuilder<K, V> {
	/// Create a new builder with the given capacity in entries.
	///
	/// Zero builds a disabled cache.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			generator: None,
			policy: std::marker::PhantomData,
		}
	}
}

impl<K, V, P> CacheBuilder<K, V, P> {
	/// Set the capacity in entries.
	pub fn capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	/// Set the function used by `get_or_compute` to fill misses.
	pub fn generator<F>(mut self, generator: F) -> Self
	where
		F: Fn(&K) -> V + Send + Sync + 'static,
	{
		self.generator = Some(Box::new(generator));
		self
	}

	/// Choose the concurrency policy.
	///
	/// Default: [`InstanceLock`]
	pub fn policy<Q: ConcurrencyPolicy>(self) -> CacheBuilder<K, V, Q> {
		CacheBuilder {
			capacity: self.capacity,
			generator: self.generator,
			policy: std::marker::PhantomData,
		}
	}
}

impl<K, V, P> CacheBuilder<K, V, P>
where
	K: Hash + Eq + Clone + 'static,
	V: 'static,
	P: ConcurrencyPolicy,
{
	/// Build the cache with the configured settings.
	pub fn build(self) -> LruCache<K, V, P> {
		LruCache::with_parts(self.capacity, self.generator)
	}
}

impl<K, V> Default for CacheBuilder<K, V> {
	/// Create a builder with [`DEFAULT_CAPACITY`] and no generator.
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
