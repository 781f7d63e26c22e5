//! Attaches the bearer credential to outgoing requests.

// self
use crate::{_prelude::*, auth::TokenStore, http::HttpRequest};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Reads the [`TokenStore`] and stamps `Authorization` onto requests while a usable
/// token is held.
#[derive(Clone, Debug)]
pub struct RequestInterceptor {
	store: Arc<TokenStore>,
}
impl RequestInterceptor {
	/// Creates an interceptor reading from `store`.
	pub fn new(store: Arc<TokenStore>) -> Self {
		Self { store }
	}

	/// Returns `request` with `Authorization` set when the access token is non-empty and
	/// not expired; otherwise returns it unchanged.
	pub fn apply(&self, mut request: HttpRequest) -> HttpRequest {
		let record = self.store.get();

		if !record.is_expired_at(OffsetDateTime::now_utc(), self.store.expiry_buffer()) {
			request.headers.insert(AUTHORIZATION.into(), record.auth_header());
		}

		request
	}
}
