//! Pipeline-level error types shared by the orchestrator, refresher, and stores.

// self
use crate::_prelude::*;

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Envelope code carried by responses whose body is not a `{code, message, data}` object.
pub const FORMAT_ERROR_CODE: i64 = -1;
/// Code reported for transport failures (network error, timeout).
pub const TRANSPORT_ERROR_CODE: i64 = -2;
/// Code reported for authentication failures that could not be recovered.
pub const AUTH_FAILURE_CODE: i64 = 401;

/// Canonical pipeline error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage backend could not be opened.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Request was still unauthorized after its one refresh-and-retry cycle.
	#[error("Request is still unauthorized after refreshing the session.")]
	AuthExpired,
	/// Refresh failed; the local session has been cleared.
	#[error("Session expired, please sign in again.")]
	RefreshFailed {
		/// Why the refresh could not produce a usable token.
		#[source]
		reason: RefreshError,
	},
}
impl Error {
	/// Returns the numeric code surfaced alongside this failure.
	///
	/// Transport failures map to [`TRANSPORT_ERROR_CODE`], authentication failures to
	/// [`AUTH_FAILURE_CODE`], and local problems to [`FORMAT_ERROR_CODE`].
	pub fn code(&self) -> i64 {
		match self {
			Self::Transport(_) => TRANSPORT_ERROR_CODE,
			Self::AuthExpired | Self::RefreshFailed { .. } => AUTH_FAILURE_CODE,
			Self::Storage(_) | Self::Config(_) => FORMAT_ERROR_CODE,
		}
	}

	/// Returns `true` for failures that end the local session.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::AuthExpired | Self::RefreshFailed { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Request URL cannot be parsed or joined onto the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL or path that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Relative request path used without a configured base URL.
	#[error("Request path `{path}` is relative but no base URL is configured.")]
	RelativeUrlWithoutBase {
		/// Relative path supplied by the caller.
		path: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within its timeout.
	#[error("Request timed out.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Reasons a refresh attempt failed.
///
/// The value is shared by every caller waiting on the same refresh, so it only carries
/// owned, cloneable data.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token is available; no network call was made.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// Refresh endpoint could not be reached.
	#[error("Refresh request failed in transport: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// Refresh endpoint answered but did not issue a token.
	#[error("Refresh endpoint rejected the request ({code}): {message}.")]
	Rejected {
		/// Envelope code (or HTTP status when the body carried none).
		code: i64,
		/// Server-supplied message.
		message: String,
	},
	/// Refresh endpoint answered with an unusable body.
	#[error("Refresh endpoint returned an unusable response: {message}.")]
	Malformed {
		/// Parsing or validation failure summary.
		message: String,
	},
	/// Refresh request could not be built from local configuration.
	#[error("Refresh request could not be built: {message}.")]
	Config {
		/// Rendered configuration failure.
		message: String,
	},
}
