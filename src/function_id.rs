/// Identity of one memoized function inside a [`MemoRegistry`](crate::MemoRegistry).
///
/// Ids must be unique per logical function across the process: two functions
/// sharing an id would share a cache. Derive them from a fully qualified name
/// with [`FunctionId::from_name`], which is what [`memoized!`](crate::memoized)
/// does, or hand out integers with [`FunctionId::new`].
///
/// ```
/// use lru_memo::FunctionId;
///
/// const FIB: FunctionId = FunctionId::from_name("math::fib");
///
/// assert_eq!(FIB, FunctionId::from_name("math::fib"));
/// assert_ne!(FIB, FunctionId::from_name("math::fact"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl FunctionId {
	/// Wrap a caller-assigned integer id.
	pub const fn new(id: u64) -> Self {
		Self(id)
	}

	/// Hash a name into an id (64-bit FNV-1a).
	///
	/// Stable across builds and runs, and usable in `const` items.
	pub const fn from_name(name: &str) -> Self {
		let bytes = name.as_bytes();
		let mut hash = FNV_OFFSET;
		let mut i = 0;
		while i < bytes.len() {
			hash ^= bytes[i] as u64;
			hash = hash.wrapping_mul(FNV_PRIME);
			i += 1;
		}
		Self(hash)
	}

	/// The raw 64-bit value.
	pub const fn as_u64(self) -> u64 {
		self.0
	}
}

impl From<u64> for FunctionId {
	fn from(id: u64) -> Self {
		Self(id)
	}
}

impl std::fmt::Display for FunctionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:#018x}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_name_known_values() {
		// Reference FNV-1a vectors.
		assert_eq!(FunctionId::from_name("").as_u64(), 0xcbf2_9ce4_8422_2325);
		assert_eq!(FunctionId::from_name("a").as_u64(), 0xaf63_dc4c_8601_ec8c);
	}

	#[test]
	fn test_integer_ids() {
		let id = FunctionId::new(42);

		assert_eq!(id.as_u64(), 42);
		assert_eq!(FunctionId::from(42), id);
		assert_ne!(FunctionId::new(43), id);
	}

	#[test]
	fn test_display() {
		assert_eq!(FunctionId::new(0x2a).to_string(), "0x000000000000002a");
	}
}
