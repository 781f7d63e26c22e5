//! Storage contract and built-in key/value backends for the persisted session copy.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::_prelude::*;

/// Synchronous string key/value persistence used by [`TokenStore`](crate::auth::TokenStore).
pub trait KeyValueStorage
where
	Self: Send + Sync,
{
	/// Writes `value` under `key`, replacing any previous value.
	fn persist(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Reads the value stored under `key`, if any.
	fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Removes the value stored under `key`. Removing a missing key is not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`KeyValueStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Keys must be non-empty.
	#[error("Storage key must not be empty.")]
	EmptyKey,
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn ensure_key(key: &str) -> Result<(), StoreError> {
	if key.is_empty() { Err(StoreError::EmptyKey) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_pipeline_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk unavailable"));

		let source = StdError::source(&error)
			.expect("Pipeline error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn empty_keys_are_rejected() {
		let storage = MemoryStorage::default();

		assert_eq!(storage.persist("", "value"), Err(StoreError::EmptyKey));
		assert_eq!(storage.read(""), Err(StoreError::EmptyKey));
		assert_eq!(storage.remove(""), Err(StoreError::EmptyKey));
	}
}
