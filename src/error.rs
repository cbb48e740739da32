use crate::function_id::FunctionId;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors reported by [`MemoRegistry`](crate::MemoRegistry).
///
/// These are programmer errors; none of them signal an ordinary cache miss.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	/// A function id was reused with different argument or result types.
	#[error("function {id} is registered as `{registered}` but was used as `{requested}`")]
	TypeMismatch {
		id: FunctionId,
		registered: &'static str,
		requested: &'static str,
	},
}
