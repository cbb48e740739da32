use std::cell::Ref;
use std::ops::Deref;

use crate::policy::ConcurrencyPolicy;

/// Borrowed view of a cached value. Holds the cache's lock while alive.
///
/// Returned by [`LruCache::lookup_ref`](crate::LruCache::lookup_ref) to read a
/// value in place without cloning it. The reference is only valid until the
/// next mutation of the cache, so the guard keeps the cache locked: any other
/// operation on the same cache (or, under [`TypeLock`](crate::TypeLock), any
/// cache of the same type) blocks until it is dropped. Calling back into the
/// same cache from the thread holding the guard deadlocks or, under
/// [`NoLock`](crate::NoLock), panics.
///
/// The guard is `!Send`, so it cannot be held across an `.await` in a `Send`
/// future. Use [`LruCache::lookup`](crate::LruCache::lookup) there instead.
///
/// ```ignore
/// // Good: read in a tight scope
/// let len = {
///     let value = cache.lookup_ref(&key)?;
///     value.len()
/// };
/// cache.put(other_key, other_value);
/// ```
pub struct Guard<'a, V, P: ConcurrencyPolicy + 'a> {
	// Declared first so the borrow ends before the lock is released.
	value: Ref<'a, V>,
	#[allow(unused)]
	lock: P::Guard<'a>,
}

impl<'a, V, P: ConcurrencyPolicy + 'a> Guard<'a, V, P> {
	pub(crate) fn new(value: Ref<'a, V>, lock: P::Guard<'a>) -> Self {
		Self {
			value,
			lock,
		}
	}
}

impl<V, P: ConcurrencyPolicy> Deref for Guard<'_, V, P> {
	type Target = V;

	fn deref(&self) -> &V {
		&self.value
	}
}

impl<V: std::fmt::Debug, P: ConcurrencyPolicy> std::fmt::Debug for Guard<'_, V, P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		(**self).fmt(f)
	}
}

impl<V: std::fmt::Display, P: ConcurrencyPolicy> std::fmt::Display for Guard<'_, V, P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		(**self).fmt(f)
	}
}

impl<V: PartialEq, P: ConcurrencyPolicy> PartialEq<V> for Guard<'_, V, P> {
	fn eq(&self, other: &V) -> bool {
		**self == *other
	}
}
