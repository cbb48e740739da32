//! Process-wide memoization registry.
//!
//! A [`MemoRegistry`] maps each [`FunctionId`] to a dedicated [`LruCache`]
//! keyed by the function's argument tuple. Caches are created on first use,
//! sized with the registry's default capacity at that moment, and live as long
//! as the registry.
//!
//! # Locking
//!
//! Two levels. The registry's own lock is held only to find or create the
//! per-function cache; it is released before that cache's lock is taken, so
//! unrelated functions never serialize on each other. The order is never
//! reversed, and no call holds both.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use ahash::RandomState;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry as HashMapEntry;
use parking_lot::Mutex;
use tracing::debug;

use crate::builder::DEFAULT_CAPACITY;
use crate::cache::LruCache;
use crate::erased::ErasedCache;
use crate::error::{RegistryError, Result};
use crate::function_id::FunctionId;
use crate::policy::{InstanceLock, ThreadSafePolicy};
use crate::traits::{CacheKey, CacheValue};

static GLOBAL: LazyLock<MemoRegistry> = LazyLock::new(MemoRegistry::new);

/// Registry of per-function caches for memoization.
///
/// Arguments are passed as a tuple, which becomes the cache key: `(n,)` for
/// one argument, `(a, b)` for two, `()` for none. Tuples hash and compare
/// element-wise, so equal arguments in the same order share a slot.
///
/// `P` is the concurrency policy given to every per-function cache.
///
/// # Example
///
/// ```
/// use lru_memo::{FunctionId, MemoRegistry};
///
/// const SQUARE: FunctionId = FunctionId::from_name("square");
///
/// let registry = MemoRegistry::new();
///
/// // First call: the cache is created empty, nothing is computed.
/// assert_eq!(registry.get::<(u32,), u64>(SQUARE, &(12,))?, None);
///
/// registry.put(SQUARE, 144u64, (12u32,))?;
/// assert_eq!(registry.get::<(u32,), u64>(SQUARE, &(12,))?, Some(144));
/// # Ok::<(), lru_memo::RegistryError>(())
/// ```
pub struct MemoRegistry<P: ThreadSafePolicy = InstanceLock> {
	/// Per-function caches, created lazily and never removed
	entries: Mutex<HashMap<FunctionId, ErasedCache, RandomState>>,
	/// Capacity given to caches created from now on
	default_capacity: AtomicUsize,
	policy: PhantomData<fn() -> P>,
}

impl MemoRegistry {
	/// Create a registry using [`DEFAULT_CAPACITY`] for new caches.
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	/// Create a registry whose new caches hold `capacity` entries.
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_policy(capacity)
	}

	/// The process-wide registry, created on first use.
	///
	/// Used by [`memoized!`](crate::memoized). Code that can take the registry
	/// as a parameter should prefer an explicit instance.
	pub fn global() -> &'static MemoRegistry {
		&GLOBAL
	}
}

impl Default for MemoRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl<P: ThreadSafePolicy> MemoRegistry<P> {
	/// Create a registry for policy `P` whose new caches hold `capacity`
	/// entries.
	///
	/// ```
	/// use lru_memo::{MemoRegistry, TypeLock};
	///
	/// let registry = MemoRegistry::<TypeLock>::with_policy(128);
	/// assert_eq!(registry.default_capacity(), 128);
	/// ```
	pub fn with_policy(capacity: usize) -> Self {
		Self {
			entries: Mutex::new(HashMap::with_hasher(RandomState::new())),
			default_capacity: AtomicUsize::new(capacity),
			policy: PhantomData,
		}
	}

	/// Look up the cached result of `id` for `args`.
	///
	/// Creates the function's cache if this is its first use, in which case
	/// the result is always `None`. Never computes anything.
	///
	/// # Errors
	///
	/// [`RegistryError::TypeMismatch`] if `id` was first used with different
	/// argument or result types.
	pub fn get<A, R>(&self, id: FunctionId, args: &A) -> Result<Option<R>>
	where
		A: CacheKey,
		R: CacheValue,
	{
		let cache = self.cache::<A, R>(id)?;
		Ok(cache.lookup(args))
	}

	/// Store `result` as the value of `id` for `args`.
	///
	/// Creates the function's cache if this is its first use.
	///
	/// # Errors
	///
	/// [`RegistryError::TypeMismatch`] if `id` was first used with different
	/// argument or result types.
	pub fn put<A, R>(&self, id: FunctionId, result: R, args: A) -> Result<()>
	where
		A: CacheKey,
		R: CacheValue,
	{
		let cache = self.cache::<A, R>(id)?;
		cache.put(args, result);
		Ok(())
	}

	/// Run the memoized call pattern: return the cached result for `args`, or
	/// compute it with `compute`, store it, and return it.
	///
	/// No lock is held while `compute` runs, so it may recurse into the
	/// registry, including for the same `id`.
	///
	/// ```
	/// use lru_memo::{FunctionId, MemoRegistry};
	///
	/// fn fib(registry: &MemoRegistry, n: u64) -> u64 {
	///     const ID: FunctionId = FunctionId::from_name("doc::fib");
	///     registry
	///         .memoize(ID, (n,), |&(n,)| {
	///             if n < 2 { n } else { fib(registry, n - 1) + fib(registry, n - 2) }
	///         })
	///         .expect("fib is only registered with (u64,) -> u64")
	/// }
	///
	/// assert_eq!(fib(&MemoRegistry::new(), 90), 2_880_067_194_370_816_120);
	/// ```
	///
	/// # Errors
	///
	/// [`RegistryError::TypeMismatch`] if `id` was first used with different
	/// argument or result types.
	pub fn memoize<A, R, F>(&self, id: FunctionId, args: A, compute: F) -> Result<R>
	where
		A: CacheKey,
		R: CacheValue,
		F: FnOnce(&A) -> R,
	{
		if let Some(result) = self.get::<A, R>(id, &args)? {
			return Ok(result);
		}
		let result = compute(&args);
		self.put(id, result.clone(), args)?;
		Ok(result)
	}

	/// Find or create the cache for `id`.
	///
	/// The returned handle stays valid for as long as it is held, whatever
	/// other threads do with the registry.
	///
	/// # Errors
	///
	/// [`RegistryError::TypeMismatch`] if `id` was first used with different
	/// argument or result types.
	pub fn cache<A, R>(&self, id: FunctionId) -> Result<Arc<LruCache<A, R, P>>>
	where
		A: CacheKey,
		R: CacheValue,
	{
		let mut entries = self.entries.lock();
		match entries.entry(id) {
			HashMapEntry::Occupied(occupied) => {
				let erased = occupied.get();
				erased.downcast::<A, R, P>().ok_or_else(|| RegistryError::TypeMismatch {
					id,
					registered: erased.type_name,
					requested: type_name::<LruCache<A, R, P>>(),
				})
			}
			HashMapEntry::Vacant(vacant) => {
				let capacity = self.default_capacity.load(Ordering::Acquire);
				let cache = Arc::new(LruCache::<A, R, P>::new(capacity));
				debug!(
					function = %id,
					capacity,
					args = type_name::<A>(),
					result = type_name::<R>(),
					"created memoization cache"
				);
				vacant.insert(ErasedCache::new(cache.clone()));
				Ok(cache)
			}
		}
	}

	/// Set the capacity of caches created from now on.
	///
	/// Caches that already exist keep their capacity; resize them through
	/// [`cache`](Self::cache) if needed.
	pub fn configure(&self, capacity: usize) {
		let previous = self.default_capacity.swap(capacity, Ordering::AcqRel);
		debug!(from = previous, to = capacity, "memoization default capacity changed");
	}

	/// Capacity given to caches created from now on.
	pub fn default_capacity(&self) -> usize {
		self.default_capacity.load(Ordering::Acquire)
	}

	/// Check whether `id` has a cache yet.
	pub fn contains(&self, id: FunctionId) -> bool {
		self.entries.lock().contains_key(&id)
	}

	/// Number of functions with a cache.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Check if no function has been used yet.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<P: ThreadSafePolicy> std::fmt::Debug for MemoRegistry<P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoRegistry")
			.field("functions", &self.len())
			.field("default_capacity", &self.default_capacity())
			.finish()
	}
}
