//! Single-flight token refresh.
//!
//! [`TokenRefresher::refresh`] either joins the refresh that is already in flight or
//! installs a new one. The in-flight outcome is a [`Shared`] future, so every concurrent
//! caller observes the same result and the refresh endpoint is hit once. The slot is
//! released by a drop guard owned by the refresh future itself: it runs after the token
//! store has been updated (or cleared) and before any waiter resumes, on every exit path.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenStore},
	config::ClientConfig,
	envelope::{self, Classification},
	error::{AUTH_FAILURE_CODE, RefreshError},
	ext::SharedAuthFailureHandler,
	http::{HttpRequest, Transport, TransportResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type RefreshOutcome = Result<TokenRecord, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Guarantees at most one in-flight refresh across concurrent callers.
pub struct TokenRefresher<T>
where
	T: ?Sized + Transport,
{
	inner: Arc<RefresherInner<T>>,
}
impl<T> TokenRefresher<T>
where
	T: ?Sized + Transport,
{
	/// Creates an idle refresher.
	pub fn new(
		transport: Arc<T>,
		store: Arc<TokenStore>,
		config: Arc<ClientConfig>,
		handler: SharedAuthFailureHandler,
	) -> Self {
		Self {
			inner: Arc::new(RefresherInner {
				transport,
				store,
				config,
				handler: RwLock::new(handler),
				state: Mutex::new(RefreshState::default()),
				metrics: RefreshMetrics::default(),
			}),
		}
	}

	/// Refreshes the session, joining the in-flight refresh when there is one.
	///
	/// On success the token store already holds the returned record. On failure the
	/// store has been cleared and the auth-failure hook has fired once for the refresh,
	/// regardless of how many callers were waiting on it.
	pub async fn refresh(&self) -> Result<TokenRecord, RefreshError> {
		self.join_or_start().await
	}

	/// Replaces the hook notified when a refresh fails.
	///
	/// Every clone of this refresher shares the hook, the single-flight slot, and the
	/// metrics. A refresh already in flight notifies the hook installed when it settles.
	pub fn set_auth_failure_handler(&self, handler: SharedAuthFailureHandler) {
		*self.inner.handler.write() = handler;
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.inner.state.lock().in_flight.is_some()
	}

	/// Counters describing refresh activity.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.inner.metrics
	}

	fn join_or_start(&self) -> SharedRefresh {
		let mut state = self.inner.state.lock();

		if let Some((generation, shared)) = &state.in_flight {
			self.inner.metrics.record_join();
			tracing::debug!(generation, "joining in-flight token refresh");

			return shared.clone();
		}

		state.generation += 1;

		let generation = state.generation;
		let release = InFlightRelease { inner: self.inner.clone(), generation };
		let shared = Self::settle(release).boxed().shared();

		state.in_flight = Some((generation, shared.clone()));

		shared
	}

	async fn settle(release: InFlightRelease<T>) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		let inner = release.inner.clone();
		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		inner.metrics.record_attempt();

		let outcome = span.instrument(inner.perform()).await;

		match &outcome {
			Ok(record) => {
				inner.store.set(record.clone());
				inner.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(e) => {
				inner.store.clear();
				inner.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::warn!(generation = release.generation, error = %e, "token refresh failed; session cleared");
			},
		}

		drop(release);

		if outcome.is_err() {
			let handler = inner.handler.read().clone();

			handler.on_auth_failure();
		}

		outcome
	}
}
impl<T> Clone for TokenRefresher<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<T> Debug for TokenRefresher<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher")
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.inner.metrics)
			.finish()
	}
}

struct RefresherInner<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	store: Arc<TokenStore>,
	config: Arc<ClientConfig>,
	handler: RwLock<SharedAuthFailureHandler>,
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl<T> RefresherInner<T>
where
	T: ?Sized + Transport,
{
	async fn perform(&self) -> RefreshOutcome {
		let current = self.store.get();

		if current.refresh_token.is_empty() {
			return Err(RefreshError::MissingRefreshToken);
		}

		let url = self
			.config
			.resolve(&self.config.refresh_path)
			.map_err(|e| RefreshError::Config { message: e.to_string() })?;
		let mut request = HttpRequest::post(url)
			.with_body(serde_json::json!({ "refreshToken": current.refresh_token.expose() }))
			.with_timeout(self.config.timeout);

		for (name, value) in &self.config.default_headers {
			request.headers.entry(name.clone()).or_insert_with(|| value.clone());
		}

		let response = self
			.transport
			.send(request)
			.await
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let mut record = parse_refresh_response(&response, self.config.success_code)?;

		if record.refresh_token.is_empty() {
			record.refresh_token = current.refresh_token;
		}

		Ok(record)
	}
}

#[derive(Default)]
struct RefreshState {
	generation: u64,
	in_flight: Option<(u64, SharedRefresh)>,
}

struct InFlightRelease<T>
where
	T: ?Sized + Transport,
{
	inner: Arc<RefresherInner<T>>,
	generation: u64,
}
impl<T> Drop for InFlightRelease<T>
where
	T: ?Sized + Transport,
{
	fn drop(&mut self) {
		let mut state = self.inner.state.lock();
		let owned = state
			.in_flight
			.as_ref()
			.is_some_and(|(generation, _)| *generation == self.generation);
		let released = if owned { state.in_flight.take() } else { None };

		// The slot's future is dropped outside the lock.
		drop(state);
		drop(released);
	}
}

fn parse_refresh_response(response: &TransportResponse, success_code: i64) -> RefreshOutcome {
	match envelope::classify::<TokenRecord>(response, &[]) {
		Classification::Ok(envelope) if envelope.is_success(success_code) => match envelope.data {
			Some(record) if !record.is_empty() => Ok(record),
			_ => Err(RefreshError::Malformed {
				message: "Refresh response carried no access token".into(),
			}),
		},
		Classification::Ok(envelope) =>
			Err(RefreshError::Rejected { code: envelope.code, message: envelope.message }),
		Classification::AuthFailed => Err(RefreshError::Rejected {
			code: AUTH_FAILURE_CODE,
			message: "Refresh token was rejected".into(),
		}),
		Classification::Malformed(_) =>
			Err(RefreshError::Malformed { message: "Refresh response is not an envelope".into() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(body: serde_json::Value) -> TransportResponse {
		TransportResponse::json(200, &body)
	}

	#[test]
	fn successful_payload_becomes_record() {
		let record = parse_refresh_response(
			&response(serde_json::json!({
				"code": 200,
				"message": "ok",
				"data": {
					"accessToken": "new-access",
					"refreshToken": "new-refresh",
					"expiresAt": 4_102_444_800_000_i64,
					"tokenType": "Bearer"
				}
			})),
			200,
		)
		.expect("Successful refresh payload should parse.");

		assert_eq!(record.access_token.expose(), "new-access");
		assert_eq!(record.refresh_token.expose(), "new-refresh");
		assert_eq!(record.expires_at, 4_102_444_800_000);
	}

	#[test]
	fn business_failure_is_rejected() {
		let err = parse_refresh_response(
			&response(serde_json::json!({ "code": 500, "message": "refresh expired", "data": null })),
			200,
		)
		.expect_err("Non-success codes should reject the refresh.");

		assert_eq!(err, RefreshError::Rejected { code: 500, message: "refresh expired".into() });
	}

	#[test]
	fn success_without_token_is_malformed() {
		for data in [serde_json::Value::Null, serde_json::json!({ "accessToken": "" })] {
			let err = parse_refresh_response(
				&response(serde_json::json!({ "code": 200, "message": "ok", "data": data })),
				200,
			)
			.expect_err("A success envelope without an access token is unusable.");

			assert!(matches!(err, RefreshError::Malformed { .. }));
		}
	}

	#[test]
	fn unauthorized_status_is_rejected() {
		let err = parse_refresh_response(&TransportResponse::new(401, ""), 200)
			.expect_err("HTTP 401 from the refresh endpoint should reject.");

		assert!(matches!(err, RefreshError::Rejected { code: 401, .. }));
	}

	#[test]
	fn success_code_convention_is_configurable() {
		let body = serde_json::json!({
			"code": 0,
			"message": "ok",
			"data": { "accessToken": "a", "expiresAt": 1 }
		});

		assert!(parse_refresh_response(&response(body.clone()), 0).is_ok());
		assert!(parse_refresh_response(&response(body), 200).is_err());
	}
}
