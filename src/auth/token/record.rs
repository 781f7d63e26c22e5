//! Token record struct, expiry helpers, and builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Header scheme used when the issuer does not name one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

const MAX_EXPIRY: OffsetDateTime = time::macros::datetime!(9999-12-31 23:59:59 UTC);

/// Credentials for one authenticated session.
///
/// The serialized form (camelCase, `expiresAt` in epoch milliseconds) is shared by the
/// refresh endpoint payload and the persisted copy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
	/// Bearer credential; empty means unauthenticated.
	#[serde(default)]
	pub access_token: TokenSecret,
	/// Credential used to mint a new access token.
	#[serde(default)]
	pub refresh_token: TokenSecret,
	/// Absolute expiry instant in milliseconds since the Unix epoch.
	#[serde(default)]
	pub expires_at: i64,
	/// Authorization header scheme prefix.
	#[serde(default = "default_token_type")]
	pub token_type: String,
}
impl TokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Returns the unauthenticated record.
	pub fn empty() -> Self {
		Self {
			access_token: TokenSecret::default(),
			refresh_token: TokenSecret::default(),
			expires_at: 0,
			token_type: default_token_type(),
		}
	}

	/// Returns `true` when no access token is held.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_empty()
	}

	/// Expiry instant as a [`OffsetDateTime`], saturating at the representable range.
	pub fn expires_at_datetime(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.expires_at) * 1_000_000)
			.unwrap_or(if self.expires_at < 0 {
				OffsetDateTime::UNIX_EPOCH
			} else {
				MAX_EXPIRY
			})
	}

	/// Returns `true` if the record is expired at `now`, treating the last `buffer` of its
	/// lifetime as already expired. An empty access token is always expired.
	pub fn is_expired_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		if self.is_empty() {
			return true;
		}

		self.expires_at_datetime().checked_sub(buffer).is_none_or(|cutoff| now >= cutoff)
	}

	/// Remaining lifetime at `now`, zero once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		if self.is_empty() {
			return Duration::ZERO;
		}

		let remaining = self.expires_at_datetime() - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Formats the `Authorization` header value, empty without an access token.
	pub fn auth_header(&self) -> String {
		if self.is_empty() {
			String::new()
		} else {
			format!("{} {}", self.token_type, self.access_token.expose())
		}
	}
}
impl Default for TokenRecord {
	fn default() -> Self {
		Self::empty()
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.finish()
	}
}

fn default_token_type() -> String {
	DEFAULT_TOKEN_TYPE.into()
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	token_type: Option<String>,
}
impl TokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a lifetime relative to the current clock.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Overrides the header scheme (defaults to [`DEFAULT_TOKEN_TYPE`]).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Consumes the builder. Missing fields fall back to the empty record's values.
	pub fn build(self) -> TokenRecord {
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) => Some(
				OffsetDateTime::now_utc().checked_add(delta).unwrap_or(if delta.is_negative() {
					OffsetDateTime::UNIX_EPOCH
				} else {
					MAX_EXPIRY
				}),
			),
			(None, None) => None,
		};
		let expires_at = expires_at
			.map(|instant| (instant.unix_timestamp_nanos() / 1_000_000) as i64)
			.unwrap_or(0);

		TokenRecord {
			access_token: self.access_token.unwrap_or_default(),
			refresh_token: self.refresh_token.unwrap_or_default(),
			expires_at,
			token_type: self.token_type.unwrap_or_else(default_token_type),
		}
	}
}
