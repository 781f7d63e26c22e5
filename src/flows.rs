//! Request orchestration and token refresh flows.

pub mod refresh;

mod request;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::TokenStore,
	config::ClientConfig,
	ext::{AuthFailureHandler, NoopAuthFailureHandler},
	http::Transport,
	interceptor::RequestInterceptor,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Issues authenticated requests and recovers from expired sessions.
///
/// The client owns the transport, token store, and configuration references so the
/// interceptor and the refresher share one view of the session. Cloning is cheap and
/// clones share the same single-flight refresh slot.
pub struct ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request, refreshes included.
	pub transport: Arc<T>,
	/// Session state shared with the interceptor and refresher.
	pub store: Arc<TokenStore>,
	/// Client configuration.
	pub config: Arc<ClientConfig>,
	interceptor: RequestInterceptor,
	refresher: TokenRefresher<T>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let transport = transport.into();
		let config = Arc::new(config);
		let refresher = TokenRefresher::new(
			transport.clone(),
			store.clone(),
			config.clone(),
			Arc::new(NoopAuthFailureHandler),
		);

		Self { interceptor: RequestInterceptor::new(store.clone()), transport, store, config, refresher }
	}

	/// Installs the hook notified when a refresh fails and the session is cleared.
	///
	/// The hook lives in the shared refresher, so clones made earlier observe it too.
	pub fn with_auth_failure_handler(self, handler: impl 'static + AuthFailureHandler) -> Self {
		self.refresher.set_auth_failure_handler(Arc::new(handler));

		self
	}

	/// Interceptor applied to every outbound request.
	pub fn interceptor(&self) -> &RequestInterceptor {
		&self.interceptor
	}

	/// Single-flight refresher shared by all clones of this client.
	pub fn refresher(&self) -> &TokenRefresher<T> {
		&self.refresher
	}

	/// Clears the local session.
	pub fn logout(&self) {
		self.store.clear();
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<TokenStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			interceptor: self.interceptor.clone(),
			refresher: self.refresher.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url)
			.field("store", &self.store)
			.finish()
	}
}
