//! Concurrency policies for [`LruCache`](crate::LruCache).
//!
//! A policy supplies the scoped mutual exclusion every cache operation runs
//! under. The cache acquires the policy's guard at the start of each public
//! operation and holds it until the operation returns, including unwinding.
//!
//! Lookups move entries within the recency list, so they mutate the cache and
//! there is no shared/reader mode: every policy is a plain exclusive lock (or
//! no lock at all).
//!
//! | Policy | Scope | `LruCache` is `Sync` |
//! |--------|-------|----------------------|
//! | [`NoLock`] | none | no |
//! | [`InstanceLock`] | one lock per cache | yes |
//! | [`TypeLock`] | one lock per key/value type pair | yes |

use std::any::TypeId;
use std::sync::LazyLock;

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard};

/// Strategy providing scoped mutual exclusion for a cache instance.
pub trait ConcurrencyPolicy: Send + 'static {
	/// RAII guard; the critical section lasts as long as it is alive.
	type Guard<'a>
	where
		Self: 'a;

	/// Construct the policy for a cache storing `K -> V` entries.
	fn for_cache<K: 'static, V: 'static>() -> Self;

	/// Enter the critical section, blocking until it is available.
	fn acquire(&self) -> Self::Guard<'_>;
}

/// Marker for policies that provide real mutual exclusion across threads.
///
/// # Safety
///
/// Implementors must guarantee that while a guard returned by
/// [`ConcurrencyPolicy::acquire`] is alive, no other guard for the same cache
/// can be obtained from any thread. [`LruCache`](crate::LruCache) relies on
/// this to implement `Sync`.
pub unsafe trait ThreadSafePolicy: ConcurrencyPolicy + Sync {}

/// No synchronization. Single-threaded use only.
///
/// Caches using this policy are `Send` but not `Sync`, so the compiler rejects
/// sharing them between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl ConcurrencyPolicy for NoLock {
	type Guard<'a> = ();

	fn for_cache<K: 'static, V: 'static>() -> Self {
		NoLock
	}

	#[inline]
	fn acquire(&self) -> Self::Guard<'_> {}
}

/// Each cache owns a private lock; operations on different caches never contend.
#[derive(Debug, Default)]
pub struct InstanceLock {
	mutex: Mutex<()>,
}

impl ConcurrencyPolicy for InstanceLock {
	type Guard<'a> = MutexGuard<'a, ()>;

	fn for_cache<K: 'static, V: 'static>() -> Self {
		Self::default()
	}

	#[inline]
	fn acquire(&self) -> Self::Guard<'_> {
		self.mutex.lock()
	}
}

impl InstanceLock {
	#[cfg(test)]
	pub(crate) fn is_locked(&self) -> bool {
		self.mutex.is_locked()
	}
}

// SAFETY: every cache gets its own mutex and all guards come from it.
unsafe impl ThreadSafePolicy for InstanceLock {}

/// One lock shared by every cache with the same key and value types.
///
/// Coarser than [`InstanceLock`]: unrelated caches of the same type serialize
/// on each other, in exchange for a single lock per type signature.
#[derive(Debug, Clone, Copy)]
pub struct TypeLock {
	mutex: &'static Mutex<()>,
}

/// Locks handed out by [`TypeLock`], one per `(K, V)` type pair.
///
/// Entries are leaked on purpose: a type signature's lock must outlive every
/// cache of that type, and the set of type signatures in a program is finite.
static TYPE_LOCKS: LazyLock<Mutex<HashMap<TypeId, &'static Mutex<()>, RandomState>>> =
	LazyLock::new(|| Mutex::new(HashMap::with_hasher(RandomState::new())));

impl TypeLock {
	fn shared<K: 'static, V: 'static>() -> &'static Mutex<()> {
		let mut locks = TYPE_LOCKS.lock();
		*locks.entry(TypeId::of::<(K, V)>()).or_insert_with(|| &*Box::leak(Box::new(Mutex::new(()))))
	}
}

impl ConcurrencyPolicy for TypeLock {
	type Guard<'a> = MutexGuard<'static, ()>;

	fn for_cache<K: 'static, V: 'static>() -> Self {
		Self {
			mutex: Self::shared::<K, V>(),
		}
	}

	#[inline]
	fn acquire(&self) -> Self::Guard<'_> {
		self.mutex.lock()
	}
}

// SAFETY: all caches of one `(K, V)` pair share the same 'static mutex, so a
// guard excludes every other cache of that type as well as its own.
unsafe impl ThreadSafePolicy for TypeLock {}
