//! Thread-safe in-memory [`KeyValueStorage`] for tests and demos.

// self
use crate::{
	_prelude::*,
	store::{self, KeyValueStorage, StoreError},
};

/// Storage backend that keeps values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<HashMap<String, String>>>);
impl MemoryStorage {
	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl KeyValueStorage for MemoryStorage {
	fn persist(&self, key: &str, value: &str) -> Result<(), StoreError> {
		store::ensure_key(key)?;
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
		store::ensure_key(key)?;

		Ok(self.0.read().get(key).cloned())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		store::ensure_key(key)?;
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_contents() {
		let storage = MemoryStorage::default();
		let view = storage.clone();

		storage.persist("token", "v1").expect("Persist should succeed.");

		assert_eq!(view.read("token").expect("Read should succeed."), Some("v1".into()));
		assert_eq!(view.len(), 1);

		view.remove("token").expect("Remove should succeed.");
		view.remove("token").expect("Removing a missing key should succeed.");

		assert!(storage.is_empty());
	}
}
