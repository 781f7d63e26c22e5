//! Client configuration: endpoints, timeouts, envelope conventions, and storage key.

// self
use crate::{_prelude::*, error::ConfigError};

/// Settings shared by the interceptor, refresher, and orchestrator.
///
/// Every field has a default, so partial documents deserialize cleanly. Durations are
/// written as integer milliseconds (`timeout_ms`, `expiry_buffer_ms`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Base URL joined with relative request paths.
	pub base_url: Option<Url>,
	/// Timeout applied to every request that does not set its own.
	#[serde(rename = "timeout_ms", with = "duration_ms")]
	pub timeout: Duration,
	/// Path (or absolute URL) of the token refresh endpoint.
	pub refresh_path: String,
	/// Storage key holding the persisted session.
	pub storage_key: String,
	/// Tail of the token lifetime treated as already expired.
	#[serde(rename = "expiry_buffer_ms", with = "duration_ms")]
	pub expiry_buffer: Duration,
	/// Envelope code that denotes business success.
	///
	/// A refresh succeeds only with this code. Request envelopes are returned whatever their
	/// code; [`ApiClient::is_success`](crate::flows::ApiClient::is_success) checks them.
	pub success_code: i64,
	/// Envelope codes that denote an invalid or expired token.
	pub auth_failure_codes: Vec<i64>,
	/// Headers merged into every request before the interceptor runs.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfig {
	/// Default request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(15);
	/// Default expiry safety buffer.
	pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::seconds(30);
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";
	/// Default storage key for the persisted session.
	pub const DEFAULT_STORAGE_KEY: &str = "token";
	/// Default success code.
	pub const DEFAULT_SUCCESS_CODE: i64 = 200;

	/// Creates a configuration rooted at `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self { base_url: Some(base_url), ..Self::default() }
	}

	/// Overrides the request timeout; negative values clamp to zero.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the storage key.
	pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
		self.storage_key = key.into();

		self
	}

	/// Overrides the expiry buffer; negative values clamp to zero.
	pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
		self.expiry_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Overrides the success code convention.
	pub fn with_success_code(mut self, code: i64) -> Self {
		self.success_code = code;

		self
	}

	/// Replaces the set of envelope codes treated as auth failures.
	pub fn with_auth_failure_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
		self.auth_failure_codes = codes.into_iter().collect();

		self
	}

	/// Adds a header sent with every request.
	pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.into(), value.into());

		self
	}

	/// Returns `true` when `code` signals an invalid or expired token.
	pub fn is_auth_failure_code(&self, code: i64) -> bool {
		self.auth_failure_codes.contains(&code)
	}

	/// Resolves a request target: absolute URLs pass through, relative paths join the base.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => {
				let base = self
					.base_url
					.as_ref()
					.ok_or_else(|| ConfigError::RelativeUrlWithoutBase { path: target.into() })?;

				base.join(target)
					.map_err(|source| ConfigError::InvalidUrl { url: target.into(), source })
			},
			Err(source) => Err(ConfigError::InvalidUrl { url: target.into(), source }),
		}
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: None,
			timeout: Self::DEFAULT_TIMEOUT,
			refresh_path: Self::DEFAULT_REFRESH_PATH.into(),
			storage_key: Self::DEFAULT_STORAGE_KEY.into(),
			expiry_buffer: Self::DEFAULT_EXPIRY_BUFFER,
			success_code: Self::DEFAULT_SUCCESS_CODE,
			auth_failure_codes: vec![401],
			default_headers: BTreeMap::new(),
		}
	}
}

mod duration_ms {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let millis = i64::try_from(value.whole_milliseconds()).unwrap_or(i64::MAX);

		serializer.serialize_i64(millis)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let millis = u64::deserialize(deserializer)?;

		Ok(Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX)))
	}
}
