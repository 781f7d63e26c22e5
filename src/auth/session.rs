//! Live session state backed by a [`KeyValueStorage`] copy.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	config::ClientConfig,
	store::{FileStorage, KeyValueStorage, MemoryStorage},
};

/// Owns the live [`TokenRecord`] and mirrors every change into durable storage.
///
/// The store is the only writer of session state. Readers receive snapshots, so a
/// caller can never observe a half-updated record. Persistence failures are logged and
/// swallowed: the in-memory record stays authoritative for the running process.
pub struct TokenStore {
	record: RwLock<TokenRecord>,
	storage: Arc<dyn KeyValueStorage>,
	storage_key: String,
	expiry_buffer: Duration,
}
impl TokenStore {
	/// Opens the store, reading the persisted copy once.
	pub fn open(storage: Arc<dyn KeyValueStorage>, config: &ClientConfig) -> Self {
		let record = Self::load(storage.as_ref(), &config.storage_key);

		Self {
			record: RwLock::new(record),
			storage,
			storage_key: config.storage_key.clone(),
			expiry_buffer: config.expiry_buffer,
		}
	}

	/// Opens an empty store backed by [`MemoryStorage`].
	pub fn in_memory(config: &ClientConfig) -> Self {
		Self::open(Arc::new(MemoryStorage::default()), config)
	}

	/// Opens a store persisted to the JSON file at `path`.
	///
	/// Fails with [`Error::Storage`] when the file exists but cannot be read or parsed.
	pub fn open_file(path: impl Into<PathBuf>, config: &ClientConfig) -> Result<Self> {
		let storage = FileStorage::open(path)?;

		Ok(Self::open(Arc::new(storage), config))
	}

	/// Returns a snapshot of the current record.
	pub fn get(&self) -> TokenRecord {
		self.record.read().clone()
	}

	/// Replaces the live record and persists it.
	pub fn set(&self, record: TokenRecord) {
		let mut guard = self.record.write();

		match serde_json::to_string(&record) {
			Ok(serialized) =>
				if let Err(e) = self.storage.persist(&self.storage_key, &serialized) {
					tracing::warn!(key = %self.storage_key, error = %e, "failed to persist token record");
				},
			Err(e) => {
				tracing::warn!(key = %self.storage_key, error = %e, "failed to serialize token record");
			},
		}

		*guard = record;
	}

	/// Resets to the empty record and removes the persisted copy.
	pub fn clear(&self) {
		let mut guard = self.record.write();

		if let Err(e) = self.storage.remove(&self.storage_key) {
			tracing::warn!(key = %self.storage_key, error = %e, "failed to remove token record");
		}

		*guard = TokenRecord::empty();
	}

	/// Returns `true` if there is no access token or it expires within the safety buffer.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Same predicate as [`is_expired`](Self::is_expired) for a fixed instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.record.read().is_expired_at(now, self.expiry_buffer)
	}

	/// Returns `true` while a usable access token is held.
	pub fn is_logged_in(&self) -> bool {
		!self.is_expired()
	}

	/// Remaining lifetime of the access token, zero once expired.
	pub fn expires_in(&self) -> Duration {
		self.record.read().remaining_at(OffsetDateTime::now_utc())
	}

	/// `Authorization` header value, empty without an access token.
	pub fn auth_header(&self) -> String {
		self.record.read().auth_header()
	}

	/// Safety buffer subtracted from the expiry instant.
	pub fn expiry_buffer(&self) -> Duration {
		self.expiry_buffer
	}

	fn load(storage: &dyn KeyValueStorage, key: &str) -> TokenRecord {
		let raw = match storage.read(key) {
			Ok(Some(raw)) => raw,
			Ok(None) => return TokenRecord::empty(),
			Err(e) => {
				tracing::warn!(key, error = %e, "discarding unreadable token record");
				Self::discard(storage, key);

				return TokenRecord::empty();
			},
		};

		match serde_json::from_str(&raw) {
			Ok(record) => record,
			Err(e) => {
				tracing::warn!(key, error = %e, "discarding unparsable token record");
				Self::discard(storage, key);

				TokenRecord::empty()
			},
		}
	}

	fn discard(storage: &dyn KeyValueStorage, key: &str) {
		if let Err(e) = storage.remove(key) {
			tracing::warn!(key, error = %e, "failed to remove token record");
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("record", &*self.record.read())
			.field("storage_key", &self.storage_key)
			.field("expiry_buffer", &self.expiry_buffer)
			.finish()
	}
}
