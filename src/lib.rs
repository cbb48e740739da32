//! # LRU Memo
//!
//! A bounded least-recently-used cache with a pluggable concurrency policy,
//! and a memoization layer built on it:
//! - **Fixed capacity** in entries, with O(1) lookup, insert and eviction
//! - **Recency order** maintained on every read and write
//! - **Compile-time concurrency policy**: none, one lock per cache, or one lock
//!   shared by every cache of the same key/value types
//! - **Optional generator** to fill misses on demand
//! - **Memoization registry** keyed by function id and argument tuple
//!
//! ## Quick Start
//!
//! ```rust
//! use lru_memo::LruCache;
//!
//! let cache: LruCache<&str, u32> = LruCache::new(2);
//!
//! cache.put("a", 1);
//! cache.put("b", 2);
//! cache.lookup(&"a"); // "a" is now the most recently used
//! cache.put("c", 3); // evicts "b"
//!
//! assert_eq!(cache.keys(), vec!["c", "a"]);
//! assert_eq!(cache.lookup(&"b"), None);
//! ```
//!
//! ## Memoization
//!
//! ```rust
//! use lru_memo::memoized;
//!
//! memoized! {
//!     fn fib(n: u64) -> u64 {
//!         if n < 2 { n } else { fib(n - 1) + fib(n - 2) }
//!     }
//! }
//!
//! assert_eq!(fib(40), 102_334_155);
//! ```
//!
//! ## Thread Safety
//!
//! [`LruCache`] is `Sync` only with a policy that takes a lock
//! ([`InstanceLock`], the default, or [`TypeLock`]). A [`NoLock`] cache is
//! `Send` but not `Sync`, so it cannot be shared between threads by mistake.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use lru_memo::LruCache;
//!
//! let cache = Arc::new(LruCache::<u32, u32>::new(1024));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let cache = cache.clone();
//!         thread::spawn(move || cache.put(i, i * 10))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(cache.len(), 4);
//! ```

mod builder;
mod cache;
mod erased;
mod error;
mod function_id;
mod guard;
#[cfg(feature = "metrics")]
mod metrics;
mod policy;
mod registry;
mod store;
mod traits;

pub use builder::{CacheBuilder, DEFAULT_CAPACITY};
pub use cache::LruCache;
pub use error::{RegistryError, Result};
pub use function_id::FunctionId;
pub use guard::Guard;
#[cfg(feature = "metrics")]
pub use metrics::CacheMetrics;
pub use policy::{ConcurrencyPolicy, InstanceLock, NoLock, ThreadSafePolicy, TypeLock};
pub use registry::MemoRegistry;
pub use traits::{CacheKey, CacheValue};

/// Define functions whose results are cached in [`MemoRegistry::global`].
///
/// Each function gets its own cache, keyed by the tuple of its arguments and
/// identified by its module path and name. Arguments must implement
/// [`CacheKey`] and the return type [`CacheValue`]. Recursive calls go through
/// the cache too, and no lock is held while the body runs.
///
/// Generic functions, `self` receivers and pattern arguments are not
/// supported.
///
/// ```rust
/// use lru_memo::memoized;
///
/// memoized! {
///     /// Number of lattice paths through a `w` by `h` grid.
///     pub fn paths(w: u32, h: u32) -> u64 {
///         if w == 0 || h == 0 { 1 } else { paths(w - 1, h) + paths(w, h - 1) }
///     }
///
///     fn greeting(name: String) -> String {
///         format!("hello, {name}")
///     }
/// }
///
/// assert_eq!(paths(16, 16), 601_080_390);
/// assert_eq!(greeting("memo".to_string()), "hello, memo");
/// ```
///
/// # Panics
///
/// If another function was registered under the same id with different
/// argument or result types, which cannot happen for ids this macro derives.
#[macro_export]
macro_rules! memoized {
	($(
		$(#[$meta:meta])*
		$vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty $body:block
	)*) => {$(
		$(#[$meta])*
		$vis fn $name($($arg: $ty),*) -> $ret {
			fn __memoized_uncached($($arg: $ty),*) -> $ret $body

			const __MEMOIZED_ID: $crate::FunctionId =
				$crate::FunctionId::from_name(concat!(module_path!(), "::", stringify!($name)));

			let args = ($(::std::clone::Clone::clone(&$arg),)*);
			$crate::MemoRegistry::global()
				.memoize(__MEMOIZED_ID, args, move |_| __memoized_uncached($($arg),*))
				.unwrap_or_else(|err| panic!("{err}"))
		}
	)*};
}
