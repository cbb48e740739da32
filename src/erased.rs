use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use crate::cache::LruCache;
use crate::policy::ThreadSafePolicy;
use crate::traits::{CacheKey, CacheValue};

/// Type-erased, reference-counted handle to a per-function cache.
///
/// This allows storing caches with different argument and result types in
/// the same registry map without a unified enum type. The concrete type is
/// recovered with [`ErasedCache::downcast`], which checks the `TypeId`.
#[derive(Clone)]
pub(crate) struct ErasedCache {
	/// TypeId of the concrete `LruCache<A, R, P>`
	pub type_id: TypeId,
	/// Name of the concrete type, for error messages
	pub type_name: &'static str,
	/// The cache itself
	cache: Arc<dyn Any + Send + Sync>,
}

impl ErasedCache {
	/// Erase a concrete cache.
	pub fn new<A, R, P>(cache: Arc<LruCache<A, R, P>>) -> Self
	where
		A: CacheKey,
		R: CacheValue,
		P: ThreadSafePolicy,
	{
		Self {
			type_id: TypeId::of::<LruCache<A, R, P>>(),
			type_name: type_name::<LruCache<A, R, P>>(),
			cache,
		}
	}

	/// Clone the `Arc` back out as the concrete cache type.
	///
	/// Returns `None` if the handle holds a different type.
	pub fn downcast<A, R, P>(&self) -> Option<Arc<LruCache<A, R, P>>>
	where
		A: CacheKey,
		R: CacheValue,
		P: ThreadSafePolicy,
	{
		if self.type_id != TypeId::of::<LruCache<A, R, P>>() {
			return None;
		}
		Arc::clone(&self.cache).downcast::<LruCache<A, R, P>>().ok()
	}
}

impl std::fmt::Debug for ErasedCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ErasedCache").field("type_name", &self.type_name).finish_non_exhaustive()
	}
}
