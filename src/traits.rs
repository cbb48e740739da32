use std::hash::Hash;

/// Bound for cache keys, including memoized argument tuples.
///
/// Implemented for every `Hash + Eq + Clone + Send + Sync + 'static` type, so
/// tuples of such types work as composite keys: `(u32, String)` hashes and
/// compares element by element, in order.
///
/// # Example
///
/// ```
/// use lru_memo::CacheKey;
///
/// fn assert_key<K: CacheKey>() {}
///
/// assert_key::<u64>();
/// assert_key::<(String, i32, bool)>();
/// assert_key::<()>();
/// ```
pub trait CacheKey: Hash + Eq + Clone + Send + Sync + 'static {}

impl<T: Hash + Eq + Clone + Send + Sync + 'static> CacheKey for T {}

/// Bound for cached values.
///
/// Lookups hand out owned clones, so values must be `Clone`. Wrap expensive
/// values in `Arc` to make that clone cheap.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CacheValue for T {}
