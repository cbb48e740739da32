use std::cell::{Ref, RefCell};
use std::hash::Hash;

use tracing::{debug, trace};

use crate::guard::Guard;
#[cfg(feature = "metrics")]
use crate::metrics::CacheMetrics;
use crate::policy::{ConcurrencyPolicy, InstanceLock, ThreadSafePolicy};
use crate::store::Store;

/// Function used to synthesize a value for a missing key.
pub(crate) type Generator<K, V> = Box<dyn Fn(&K) -> V + Send + Sync>;

/// Fixed-capacity cache with least-recently-used eviction.
///
/// Capacity counts entries. A capacity of zero disables the cache: puts are
/// ignored and every lookup misses.
///
/// Every operation runs under the lock supplied by the policy `P`:
///
/// - [`InstanceLock`] (default): one lock per cache. The cache is `Sync` and can
///   be shared via `Arc<LruCache<..>>`.
/// - [`TypeLock`](crate::TypeLock): one lock per `(K, V)` type pair, shared by
///   all caches of that type.
/// - [`NoLock`](crate::NoLock): no locking; the cache is not `Sync`.
///
/// # Example
///
/// ```
/// use lru_memo::LruCache;
///
/// let cache: LruCache<&str, u32> = LruCache::new(2);
/// cache.put("a", 1);
/// cache.put("b", 2);
/// assert_eq!(cache.lookup(&"a"), Some(1)); // "a" is now most recently used
/// cache.put("c", 3); // evicts "b"
///
/// assert!(!cache.exists(&"b"));
/// assert_eq!(cache.keys(), vec!["c", "a"]);
/// ```
pub struct LruCache<K, V, P = InstanceLock> {
	/// Entries. Only touched while holding a guard from `policy`.
	store: RefCell<Store<K, V>>,
	/// Optional value generator used by `get_or_compute`
	generator: Option<Generator<K, V>>,
	/// Concurrency strategy
	policy: P,
}

impl<K, V, P> LruCache<K, V, P>
where
	K: Hash + Eq + Clone + 'static,
	V: 'static,
	P: ConcurrencyPolicy,
{
	/// Create a cache holding at most `capacity` entries.
	pub fn new(capacity: usize) -> Self {
		Self::with_parts(capacity, None)
	}

	/// Create a cache that fills misses in [`get_or_compute`](Self::get_or_compute)
	/// by calling `generator`.
	pub fn with_generator<F>(capacity: usize, generator: F) -> Self
	where
		F: Fn(&K) -> V + Send + Sync + 'static,
	{
		Self::with_parts(capacity, Some(Box::new(generator)))
	}

	pub(crate) fn with_parts(capacity: usize, generator: Option<Generator<K, V>>) -> Self {
		Self {
			store: RefCell::new(Store::new(capacity)),
			generator,
			policy: P::for_cache::<K, V>(),
		}
	}

	/// Look up a key, marking it most recently used on a hit.
	///
	/// # Runtime Complexity
	///
	/// O(1) expected, plus the cost of cloning the value.
	pub fn lookup(&self, key: &K) -> Option<V>
	where
		V: Clone,
	{
		let _lock = self.policy.acquire();
		let mut store = self.store.borrow_mut();
		store.get(key).cloned()
	}

	/// Look up a key, returning `default` on a miss.
	pub fn lookup_or(&self, key: &K, default: V) -> V
	where
		V: Clone,
	{
		self.lookup(key).unwrap_or(default)
	}

	/// Look up a key and borrow the stored value in place.
	///
	/// The returned [`Guard`] keeps this cache locked until dropped; see its
	/// documentation for the rules. Prefer [`lookup`](Self::lookup) unless
	/// cloning the value is too expensive.
	pub fn lookup_ref(&self, key: &K) -> Option<Guard<'_, V, P>> {
		let lock = self.policy.acquire();
		{
			let mut store = self.store.borrow_mut();
			store.get(key)?;
		}
		let value = Ref::filter_map(self.store.borrow(), |store| store.peek(key)).ok()?;
		Some(Guard::new(value, lock))
	}

	/// Insert or update an entry, making it the most recently used.
	///
	/// When the cache is full and `key` is new, the least recently used entry is
	/// evicted first. Does nothing when the capacity is zero.
	///
	/// Returns the value previously stored under `key`, if any.
	pub fn put(&self, key: K, value: V) -> Option<V> {
		let _lock = self.policy.acquire();
		let inserted = self.store.borrow_mut().insert(key, value);
		if inserted.evicted > 0 {
			trace!(evicted = inserted.evicted, "lru cache evicted entries");
		}
		inserted.previous
	}

	/// Look up a key, generating and storing the value on a miss.
	///
	/// Returns `None` on a miss when the cache has no generator, or when the
	/// cache is disabled (capacity zero) since nothing can be stored.
	///
	/// The generator runs while the lock is held, so concurrent callers asking
	/// for the same missing key wait for the first one and then hit: the
	/// generator is invoked once per miss. The generator must not call back into
	/// this cache unless the policy is [`NoLock`](crate::NoLock). Under
	/// [`TypeLock`](crate::TypeLock) it must not touch any other cache with the
	/// same key and value types either, since they share the lock.
	pub fn get_or_compute(&self, key: &K) -> Option<V>
	where
		V: Clone,
	{
		let _lock = self.policy.acquire();

		let hit = self.store.borrow_mut().get(key).cloned();
		if hit.is_some() {
			return hit;
		}

		let generator = self.generator.as_ref()?;
		// No borrow of the store is held across the call.
		let value = generator(key);
		trace!("lru cache generated value for missing key");

		let mut store = self.store.borrow_mut();
		#[cfg(feature = "metrics")]
		{
			store.counters.generated += 1;
		}
		if store.capacity() == 0 {
			return None;
		}
		let inserted = store.insert(key.clone(), value);
		if inserted.evicted > 0 {
			trace!(evicted = inserted.evicted, "lru cache evicted entries");
		}
		// Freshly inserted, so already the most recently used.
		store.peek(key).cloned()
	}

	/// Check membership without changing the recency order.
	pub fn exists(&self, key: &K) -> bool {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		store.contains(key)
	}

	/// Snapshot of the keys, most recently used first.
	pub fn keys(&self) -> Vec<K> {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		store.keys_mru()
	}

	/// Change the capacity used by future puts.
	///
	/// Shrinking does not evict immediately; the next insert trims the cache
	/// back under the new bound.
	pub fn resize(&self, capacity: usize) {
		let _lock = self.policy.acquire();
		let mut store = self.store.borrow_mut();
		debug!(from = store.capacity(), to = capacity, "lru cache resized");
		store.set_capacity(capacity);
	}

	/// Remove a key, returning its value.
	pub fn remove(&self, key: &K) -> Option<V> {
		let _lock = self.policy.acquire();
		let mut store = self.store.borrow_mut();
		store.remove(key)
	}

	/// Remove every entry. The capacity is unchanged.
	pub fn clear(&self) {
		let _lock = self.policy.acquire();
		self.store.borrow_mut().clear();
	}

	/// Current number of entries.
	pub fn len(&self) -> usize {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		store.len()
	}

	/// Check if the cache is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Current capacity bound.
	pub fn capacity(&self) -> usize {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		store.capacity()
	}

	/// Snapshot of the hit/miss counters.
	#[cfg(feature = "metrics")]
	pub fn metrics(&self) -> CacheMetrics {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		let counters = store.counters;
		CacheMetrics {
			hits: counters.hits,
			misses: counters.misses,
			inserts: counters.inserts,
			updates: counters.updates,
			evictions: counters.evictions,
			generated: counters.generated,
			len: store.len(),
			capacity: store.capacity(),
		}
	}
}

impl<K, V, P> std::fmt::Debug for LruCache<K, V, P>
where
	K: Hash + Eq + Clone + 'static,
	V: 'static,
	P: ConcurrencyPolicy,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let _lock = self.policy.acquire();
		let store = self.store.borrow();
		f.debug_struct("LruCache")
			.field("len", &store.len())
			.field("capacity", &store.capacity())
			.field("generator", &self.generator.is_some())
			.finish()
	}
}

// SAFETY: the store's `RefCell` is only accessed while holding a guard from a
// `ThreadSafePolicy`, which excludes every other thread for the duration.
// Every `Ref`/`RefMut` is either a temporary of a statement or a local declared
// after the guard, so it is released before the guard in any edition. The one
// borrow that outlives an operation lives inside `Guard`, ahead of its lock.
// Values move between threads through the cache, hence `K: Send, V: Send`.
// The generator and the policy are `Sync` themselves.
unsafe impl<K: Send, V: Send, P: ThreadSafePolicy> Sync for LruCache<K, V, P> {}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::sync::{Arc, Barrier};
	use std::thread;
	use std::time::Duration;

	use parking_lot::Mutex;

	use super::*;
	use crate::policy::{NoLock, TypeLock};

	#[test]
	fn test_eviction_prefers_least_recently_used() {
		let cache: LruCache<char, i32> = LruCache::new(2);

		cache.put('A', 1);
		cache.put('B', 2);
		assert_eq!(cache.lookup(&'A'), Some(1));
		cache.put('C', 3);

		assert!(!cache.exists(&'B'));
		assert!(cache.exists(&'A'));
		assert!(cache.exists(&'C'));
	}

	#[test]
	fn test_read_after_write() {
		let cache: LruCache<u64, String> = LruCache::new(8);

		cache.put(7, "seven".to_string());

		assert_eq!(cache.lookup(&7).as_deref(), Some("seven"));
		assert_eq!(cache.lookup(&8), None);
		assert_eq!(cache.put(7, "sept".to_string()).as_deref(), Some("seven"));
		assert_eq!(cache.lookup(&7).as_deref(), Some("sept"));
	}

	#[test]
	fn test_lookup_or_default() {
		let cache: LruCache<u64, i64, NoLock> = LruCache::new(8);
		cache.put(1, 10);

		assert_eq!(cache.lookup_or(&1, -1), 10);
		assert_eq!(cache.lookup_or(&2, -1), -1);
	}

	#[test]
	fn test_exists_does_not_touch_recency() {
		let cache: LruCache<u8, u8> = LruCache::new(2);
		cache.put(1, 1);
		cache.put(2, 2);

		assert!(cache.exists(&1));
		cache.put(3, 3);

		assert!(!cache.exists(&1));
		assert_eq!(cache.keys(), vec![3, 2]);
	}

	#[test]
	fn test_keys_most_recent_first() {
		let cache: LruCache<u8, u8> = LruCache::new(4);
		for k in 1..=4 {
			cache.put(k, k);
		}
		cache.lookup(&2);
		cache.put(1, 10);

		let keys = cache.keys();
		assert_eq!(keys, vec![1, 2, 4, 3]);
		assert_eq!(keys.len(), cache.len());
		// Snapshots are repeatable and do not disturb the order.
		assert_eq!(cache.keys(), keys);
	}

	#[test]
	fn test_disabled_cache() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let cache: LruCache<u32, u32> = LruCache::with_generator(0, move |k| {
			counter.fetch_add(1, Ordering::SeqCst);
			k * 2
		});

		cache.put(1, 1);
		assert!(!cache.exists(&1));
		assert_eq!(cache.lookup(&1), None);
		assert_eq!(cache.get_or_compute(&5), None);
		assert_eq!(cache.get_or_compute(&5), None);
		assert!(cache.is_empty());
		assert!(cache.keys().is_empty());
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_get_or_compute_with_generator() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let cache: LruCache<u32, String> = LruCache::with_generator(4, move |k| {
			counter.fetch_add(1, Ordering::SeqCst);
			format!("value-{k}")
		});

		assert_eq!(cache.get_or_compute(&3).as_deref(), Some("value-3"));
		assert_eq!(cache.get_or_compute(&3).as_deref(), Some("value-3"));
		assert!(cache.exists(&3));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_get_or_compute_without_generator() {
		let cache: LruCache<u32, u32> = LruCache::new(4);

		assert_eq!(cache.get_or_compute(&1), None);
		cache.put(1, 11);
		assert_eq!(cache.get_or_compute(&1), Some(11));
	}

	#[test]
	fn test_no_lock_recursive_fill() {
		let cache: LruCache<u64, u64, NoLock> = LruCache::new(64);
		fn fib(cache: &LruCache<u64, u64, NoLock>, n: u64) -> u64 {
			if let Some(v) = cache.lookup(&n) {
				return v;
			}
			let v = if n < 2 { n } else { fib(cache, n - 1) + fib(cache, n - 2) };
			cache.put(n, v);
			v
		}

		assert_eq!(fib(&cache, 50), 12_586_269_025);
		assert_eq!(cache.len(), 51);
	}

	#[test]
	fn test_resize_is_lazy() {
		let cache: LruCache<u8, u8> = LruCache::new(4);
		for k in 0..4 {
			cache.put(k, k);
		}

		cache.resize(2);
		assert_eq!(cache.capacity(), 2);
		assert_eq!(cache.len(), 4);

		cache.put(9, 9);
		assert_eq!(cache.len(), 2);
		assert_eq!(cache.keys(), vec![9, 3]);
	}

	#[test]
	fn test_resize_to_zero_disables() {
		let cache: LruCache<u8, u8> = LruCache::new(4);
		cache.put(1, 1);
		cache.resize(0);

		cache.put(2, 2);
		assert!(!cache.exists(&2));
		// Existing entries stay until something trims them.
		assert!(cache.exists(&1));
	}

	#[test]
	fn test_remove_and_clear() {
		let cache: LruCache<u8, u8> = LruCache::new(4);
		cache.put(1, 1);
		cache.put(2, 2);

		assert_eq!(cache.remove(&1), Some(1));
		assert_eq!(cache.remove(&1), None);
		cache.clear();
		assert!(cache.is_empty());
		assert_eq!(cache.capacity(), 4);
	}

	#[test]
	fn test_lookup_ref_relocates_and_borrows() {
		let cache: LruCache<u8, Vec<u8>> = LruCache::new(2);
		cache.put(1, vec![1; 16]);
		cache.put(2, vec![2; 16]);

		{
			let value = cache.lookup_ref(&1).expect("key should exist");
			assert_eq!(value.len(), 16);
			assert_eq!(value, vec![1; 16]);
		}
		assert!(cache.lookup_ref(&3).is_none());

		cache.put(3, vec![3]);
		assert!(cache.exists(&1));
		assert!(!cache.exists(&2));
	}

	#[test]
	fn test_lookup_ref_holds_lock() {
		let cache: LruCache<u8, u8> = LruCache::new(2);
		cache.put(1, 1);

		let guard = cache.lookup_ref(&1).expect("key should exist");
		assert!(cache.policy.is_locked());
		drop(guard);
		assert!(!cache.policy.is_locked());
	}

	#[test]
	fn test_concurrent_single_fill() {
		const THREADS: usize = 16;

		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let cache: Arc<LruCache<u64, Arc<String>>> =
			Arc::new(LruCache::with_generator(8, move |k| {
				counter.fetch_add(1, Ordering::SeqCst);
				thread::sleep(std::time::Duration::from_millis(20));
				Arc::new(format!("generated-{k}"))
			}));
		let barrier = Arc::new(Barrier::new(THREADS));

		let handles: Vec<_> = (0..THREADS)
			.map(|_| {
				let cache = cache.clone();
				let barrier = barrier.clone();
				thread::spawn(move || {
					barrier.wait();
					cache.get_or_compute(&42).expect("value should be generated")
				})
			})
			.collect();

		let results: Vec<_> = handles
			.into_iter()
			.map(|h| h.join().expect("thread should not panic"))
			.collect();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		for value in &results {
			assert!(Arc::ptr_eq(value, &results[0]));
		}
	}

	#[test]
	fn test_operations_release_lock() {
		let cache: LruCache<u8, u8> = LruCache::with_generator(2, |k| *k);

		cache.put(1, 1);
		assert_eq!(cache.lookup(&1), Some(1));
		assert_eq!(cache.get_or_compute(&2), Some(2));
		assert!(cache.exists(&2));
		assert_eq!(cache.keys(), vec![2, 1]);
		assert_eq!(cache.len(), 2);
		assert_eq!(cache.capacity(), 2);
		assert_eq!(cache.remove(&1), Some(1));
		assert!(cache.lookup_ref(&9).is_none());
		cache.resize(3);
		cache.clear();

		assert!(!cache.policy.is_locked());
		// The store is not left borrowed either.
		assert!(cache.store.try_borrow_mut().is_ok());
	}

	#[test]
	fn test_type_lock_generator_excludes_same_type_caches() {
		let other: Arc<LruCache<i16, u32, TypeLock>> = Arc::new(LruCache::new(4));
		let helper = Arc::new(Mutex::new(None));
		let finished = Arc::new(AtomicBool::new(false));
		let finished_while_generating = Arc::new(AtomicBool::new(false));

		let cache = {
			let other = other.clone();
			let helper = helper.clone();
			let finished = finished.clone();
			let finished_while_generating = finished_while_generating.clone();
			LruCache::<i16, u32, TypeLock>::with_generator(4, move |k| {
				let other = other.clone();
				let finished_in_helper = finished.clone();
				*helper.lock() = Some(thread::spawn(move || {
					other.put(1, 1);
					finished_in_helper.store(true, Ordering::SeqCst);
				}));
				thread::sleep(Duration::from_millis(50));
				finished_while_generating.store(finished.load(Ordering::SeqCst), Ordering::SeqCst);
				u32::from(k.unsigned_abs())
			})
		};

		assert_eq!(cache.get_or_compute(&-3), Some(3));
		let handle = helper.lock().take().expect("generator should have run");
		handle.join().expect("helper should not panic");

		// The sibling cache shares the type lock, so it waited for the generator.
		assert!(!finished_while_generating.load(Ordering::SeqCst));
		assert!(other.exists(&1));
	}

	#[test]
	fn test_type_lock_cache_across_threads() {
		let caches: Vec<Arc<LruCache<u32, u32, TypeLock>>> =
			(0..4).map(|_| Arc::new(LruCache::new(64))).collect();

		let handles: Vec<_> = caches
			.iter()
			.cloned()
			.enumerate()
			.map(|(t, cache)| {
				thread::spawn(move || {
					for i in 0..100u32 {
						cache.put(i, i + t as u32);
						assert_eq!(cache.lookup(&i), Some(i + t as u32));
					}
				})
			})
			.collect();

		for handle in handles {
			handle.join().expect("thread should not panic");
		}

		for cache in &caches {
			assert_eq!(cache.len(), 64);
		}
	}

	#[test]
	fn test_cache_is_send_sync() {
		fn assert_send<T: Send>() {}
		fn assert_sync<T: Sync>() {}

		assert_send::<LruCache<u64, String>>();
		assert_sync::<LruCache<u64, String>>();
		assert_sync::<LruCache<u64, String, TypeLock>>();
		assert_send::<LruCache<u64, String, NoLock>>();
	}

	#[cfg(feature = "metrics")]
	#[test]
	fn test_metrics_counts() {
		let cache: LruCache<u8, u8> = LruCache::with_generator(2, |k| *k);

		cache.put(1, 1);
		cache.put(1, 2);
		cache.lookup(&1);
		cache.lookup(&9);
		cache.get_or_compute(&2);
		cache.get_or_compute(&3);

		let metrics = cache.metrics();
		assert_eq!(metrics.inserts, 3);
		assert_eq!(metrics.updates, 1);
		assert_eq!(metrics.evictions, 1);
		assert_eq!(metrics.generated, 2);
		assert_eq!(metrics.len, 2);
		assert_eq!(metrics.capacity, 2);
		assert_eq!(metrics.hits, 1);
		assert_eq!(metrics.misses, 3);
	}
}
