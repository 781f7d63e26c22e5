//! Request orchestration with one refresh-and-retry cycle per logical request.
//!
//! [`ApiClient::request`] resolves the target, stamps the bearer header, sends, and
//! classifies. An auth failure triggers (or joins) the shared refresh and replays the
//! original request once with the updated header; a second auth failure is terminal.

// self
use crate::{
	_prelude::*,
	envelope::{self, Classification, Envelope},
	error::ConfigError,
	flows::ApiClient,
	http::{HttpRequest, Method, Transport},
	interceptor::AUTHORIZATION,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const MAX_AUTH_RETRIES: u8 = 1;

struct PendingRequest {
	request: HttpRequest,
	auth_retries: u8,
}

impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Sends `request` and resolves with its envelope.
	///
	/// Conforming envelopes resolve as-is, whatever their business code. Bodies that are
	/// not envelopes resolve with the `-1` sentinel. Transport failures, a failed refresh,
	/// and a request still unauthorized after its retry are the only errors.
	pub async fn request<R>(&self, request: HttpRequest) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Returns `true` when `envelope` carries the configured success code.
	pub fn is_success<R>(&self, envelope: &Envelope<R>) -> bool {
		envelope.is_success(self.config.success_code)
	}

	/// `GET path`.
	pub async fn get<R>(&self, path: &str) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
	{
		self.request(HttpRequest::get(path)).await
	}

	/// `GET path` with `query` sent as query parameters.
	pub async fn get_with<R, Q>(&self, path: &str, query: &Q) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
		Q: ?Sized + Serialize,
	{
		self.request(HttpRequest::get(path).with_body(to_body(query)?)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<R, B>(&self, path: &str, body: &B) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(HttpRequest::post(path).with_body(to_body(body)?)).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<R, B>(&self, path: &str, body: &B) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(HttpRequest::new(Method::Put, path).with_body(to_body(body)?)).await
	}

	/// `DELETE path`.
	pub async fn delete<R>(&self, path: &str) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
	{
		self.request(HttpRequest::new(Method::Delete, path)).await
	}

	/// `DELETE path` with a JSON body.
	pub async fn delete_with<R, B>(&self, path: &str, body: &B) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(HttpRequest::new(Method::Delete, path).with_body(to_body(body)?)).await
	}

	async fn run<R>(&self, request: HttpRequest) -> Result<Envelope<R>>
	where
		R: DeserializeOwned,
	{
		let mut pending = PendingRequest { request: self.prepare(request)?, auth_retries: 0 };

		loop {
			let outgoing = self.interceptor.apply(pending.request.clone());
			let sent_auth = outgoing.header(AUTHORIZATION).map(str::to_owned);
			let response = self.transport.send(outgoing).await?;

			match envelope::classify::<R>(&response, &self.config.auth_failure_codes) {
				Classification::Ok(envelope) | Classification::Malformed(envelope) =>
					return Ok(envelope),
				Classification::AuthFailed => {},
			}

			if pending.auth_retries >= MAX_AUTH_RETRIES {
				tracing::warn!(
					method = %pending.request.method,
					url = %pending.request.url,
					"request still unauthorized after refreshing the session"
				);

				return Err(Error::AuthExpired);
			}

			if self.session_replaced(sent_auth.as_deref()) {
				tracing::debug!(
					method = %pending.request.method,
					url = %pending.request.url,
					"request unauthorized with a superseded token; replaying"
				);
			} else {
				tracing::debug!(
					method = %pending.request.method,
					url = %pending.request.url,
					"request unauthorized; refreshing session"
				);

				self.refresher.refresh().await.map_err(|reason| Error::RefreshFailed { reason })?;
			}

			pending.auth_retries += 1;
		}
	}

	// A live token other than the one sent means another caller already refreshed.
	fn session_replaced(&self, sent_auth: Option<&str>) -> bool {
		if self.store.is_expired() {
			return false;
		}

		sent_auth != Some(self.store.auth_header().as_str())
	}

	fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest> {
		request.url = self.config.resolve(&request.url)?.into();

		for (name, value) in &self.config.default_headers {
			request.headers.entry(name.clone()).or_insert_with(|| value.clone());
		}

		request.timeout.get_or_insert(self.config.timeout);

		Ok(request)
	}
}

fn to_body<B>(body: &B) -> Result<serde_json::Value>
where
	B: ?Sized + Serialize,
{
	serde_json::to_value(body).map_err(|e| ConfigError::BodySerialize(e).into())
}
