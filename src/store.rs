//! Dual-indexed storage for a single cache instance.
//!
//! A `Store` keeps two views of the same entries:
//!
//! - a hash index from key to arena slot, for O(1) lookups;
//! - an intrusive doubly linked list threaded through the arena, ordered from
//!   least recently used (`head`) to most recently used (`tail`).
//!
//! Relocating an entry to the most recently used end is an O(1) unlink and
//! relink; nothing is ever re-sorted. Freed slots are recycled through a free
//! list so steady-state eviction does not allocate.
//!
//! The store is not thread-safe on its own; `LruCache` serializes access to it
//! through its concurrency policy.

use std::hash::Hash;

use ahash::RandomState;
use hashbrown::HashMap;

/// Sentinel for "no neighbour".
const NIL: usize = usize::MAX;

struct Node<K, V> {
	key: K,
	value: V,
	/// Towards the least recently used end.
	prev: usize,
	/// Towards the most recently used end.
	next: usize,
}

/// Result of [`Store::insert`].
pub(crate) struct Inserted<V> {
	/// Value previously stored under the key, if it was already present.
	pub previous: Option<V>,
	/// Number of entries evicted to respect the capacity.
	pub evicted: usize,
}

/// Hit/miss counters, kept under the same lock as the entries.
#[cfg(feature = "metrics")]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
	pub hits: u64,
	pub misses: u64,
	pub inserts: u64,
	pub updates: u64,
	pub evictions: u64,
	pub generated: u64,
}

pub(crate) struct Store<K, V> {
	index: HashMap<K, usize, RandomState>,
	slots: Vec<Option<Node<K, V>>>,
	free: Vec<usize>,
	head: usize,
	tail: usize,
	capacity: usize,
	#[cfg(feature = "metrics")]
	pub(crate) counters: Counters,
}

impl<K: Hash + Eq + Clone, V> Store<K, V> {
	pub fn new(capacity: usize) -> Self {
		// Don't preallocate for huge bounds; the arena grows on demand.
		let initial = capacity.min(1024);
		Self {
			index: HashMap::with_capacity_and_hasher(initial, RandomState::new()),
			slots: Vec::with_capacity(initial),
			free: Vec::new(),
			head: NIL,
			tail: NIL,
			capacity,
			#[cfg(feature = "metrics")]
			counters: Counters::default(),
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Change the bound. Excess entries are evicted by the next insert.
	pub fn set_capacity(&mut self, capacity: usize) {
		self.capacity = capacity;
	}

	pub fn len(&self) -> usize {
		self.index.len()
	}

	pub fn contains(&self, key: &K) -> bool {
		self.index.contains_key(key)
	}

	/// Look up a key and mark it most recently used.
	pub fn get(&mut self, key: &K) -> Option<&V> {
		let Some(&idx) = self.index.get(key) else {
			#[cfg(feature = "metrics")]
			{
				self.counters.misses += 1;
			}
			return None;
		};
		#[cfg(feature = "metrics")]
		{
			self.counters.hits += 1;
		}
		self.move_to_tail(idx);
		Some(&self.node(idx).value)
	}

	/// Look up a key without touching the recency order.
	pub fn peek(&self, key: &K) -> Option<&V> {
		self.index.get(key).map(|&idx| &self.node(idx).value)
	}

	/// Insert or update an entry as most recently used, then evict from the
	/// least recently used end until the store fits its capacity.
	///
	/// With a capacity of zero this is a no-op and neither index is touched.
	pub fn insert(&mut self, key: K, value: V) -> Inserted<V> {
		if self.capacity == 0 {
			return Inserted {
				previous: None,
				evicted: 0,
			};
		}

		if let Some(&idx) = self.index.get(&key) {
			let previous = std::mem::replace(&mut self.node_mut(idx).value, value);
			self.move_to_tail(idx);
			#[cfg(feature = "metrics")]
			{
				self.counters.updates += 1;
			}
			// The updated entry is now the tail, so trimming never reaches it.
			let evicted = self.evict_down_to(self.capacity);
			return Inserted {
				previous: Some(previous),
				evicted,
			};
		}

		let evicted = self.evict_down_to(self.capacity - 1);
		let idx = self.allocate(Node {
			key: key.clone(),
			value,
			prev: NIL,
			next: NIL,
		});
		self.index.insert(key, idx);
		self.link_tail(idx);
		#[cfg(feature = "metrics")]
		{
			self.counters.inserts += 1;
		}

		Inserted {
			previous: None,
			evicted,
		}
	}

	/// Pop least recently used entries until at most `limit` remain.
	fn evict_down_to(&mut self, limit: usize) -> usize {
		let mut evicted = 0;
		while self.index.len() > limit && self.pop_lru().is_some() {
			evicted += 1;
		}
		#[cfg(feature = "metrics")]
		{
			self.counters.evictions += evicted as u64;
		}
		evicted
	}

	pub fn remove(&mut self, key: &K) -> Option<V> {
		let idx = self.index.remove(key)?;
		self.unlink(idx);
		Some(self.release(idx).value)
	}

	/// Remove and return the least recently used entry.
	pub fn pop_lru(&mut self) -> Option<(K, V)> {
		if self.head == NIL {
			return None;
		}
		let idx = self.head;
		self.unlink(idx);
		let node = self.release(idx);
		self.index.remove(&node.key);
		Some((node.key, node.value))
	}

	/// Keys from most recently used to least recently used.
	pub fn keys_mru(&self) -> Vec<K> {
		let mut keys = Vec::with_capacity(self.index.len());
		let mut cursor = self.tail;
		while cursor != NIL {
			let node = self.node(cursor);
			keys.push(node.key.clone());
			cursor = node.prev;
		}
		keys
	}

	pub fn clear(&mut self) {
		self.index.clear();
		self.slots.clear();
		self.free.clear();
		self.head = NIL;
		self.tail = NIL;
	}

	fn node(&self, idx: usize) -> &Node<K, V> {
		self.slots[idx].as_ref().expect("indexed slot must be occupied")
	}

	fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
		self.slots[idx].as_mut().expect("indexed slot must be occupied")
	}

	fn allocate(&mut self, node: Node<K, V>) -> usize {
		match self.free.pop() {
			Some(idx) => {
				self.slots[idx] = Some(node);
				idx
			}
			None => {
				self.slots.push(Some(node));
				self.slots.len() - 1
			}
		}
	}

	fn release(&mut self, idx: usize) -> Node<K, V> {
		let node = self.slots[idx].take().expect("released slot must be occupied");
		self.free.push(idx);
		node
	}

	fn unlink(&mut self, idx: usize) {
		let (prev, next) = {
			let node = self.node(idx);
			(node.prev, node.next)
		};
		match prev {
			NIL => self.head = next,
			p => self.node_mut(p).next = next,
		}
		match next {
			NIL => self.tail = prev,
			n => self.node_mut(n).prev = prev,
		}
		let node = self.node_mut(idx);
		node.prev = NIL;
		node.next = NIL;
	}

	fn link_tail(&mut self, idx: usize) {
		let old_tail = self.tail;
		{
			let node = self.node_mut(idx);
			node.prev = old_tail;
			node.next = NIL;
		}
		match old_tail {
			NIL => self.head = idx,
			t => self.node_mut(t).next = idx,
		}
		self.tail = idx;
	}

	fn move_to_tail(&mut self, idx: usize) {
		if self.tail == idx {
			return;
		}
		self.unlink(idx);
		self.link_tail(idx);
	}
}
