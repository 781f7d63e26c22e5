//! Scripted in-process transport and fixtures shared by integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use bearer_pipeline::{
	auth::{TokenRecord, TokenStore},
	config::ClientConfig,
	error::TransportError,
	flows::ApiClient,
	http::{HttpRequest, Transport, TransportFuture, TransportResponse},
	store::MemoryStorage,
};

pub const BASE_URL: &str = "http://api.test/";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const USER_PATH: &str = "/api/user";

type Responder =
	Box<dyn Fn(&HttpRequest) -> Result<TransportResponse, TransportError> + Send + Sync>;

/// Transport answering from a closure and recording every request it sees.
pub struct FakeTransport {
	responder: Responder,
	refresh_delay: Option<std::time::Duration>,
	calls: Mutex<Vec<HttpRequest>>,
}
impl FakeTransport {
	pub fn new(
		responder: impl 'static + Fn(&HttpRequest) -> Result<TransportResponse, TransportError> + Send + Sync,
	) -> Self {
		Self { responder: Box::new(responder), refresh_delay: None, calls: Mutex::new(Vec::new()) }
	}

	/// Holds refresh calls open for `millis` before answering.
	pub fn with_refresh_delay(mut self, millis: u64) -> Self {
		self.refresh_delay = Some(std::time::Duration::from_millis(millis));

		self
	}

	pub fn calls(&self) -> Vec<HttpRequest> {
		self.calls.lock().expect("Call log lock should not be poisoned.").clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<HttpRequest> {
		self.calls().into_iter().filter(|request| request.url.ends_with(path)).collect()
	}

	pub fn refresh_calls(&self) -> usize {
		self.calls_to(REFRESH_PATH).len()
	}
}
impl Transport for FakeTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.calls.lock().expect("Call log lock should not be poisoned.").push(request.clone());

			if let Some(delay) = self.refresh_delay {
				if request.url.ends_with(REFRESH_PATH) {
					tokio::time::sleep(delay).await;
				}
			}

			(self.responder)(&request)
		})
	}
}

/// Counts auth-failure notifications.
#[derive(Clone, Default)]
pub struct HookCounter(Arc<AtomicUsize>);
impl HookCounter {
	pub fn count(&self) -> usize {
		self.0.load(Ordering::SeqCst)
	}

	pub fn handler(&self) -> impl 'static + Fn() + Send + Sync {
		let counter = self.0.clone();

		move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}
	}
}

pub fn config() -> ClientConfig {
	ClientConfig::new(Url::parse(BASE_URL).expect("Fixture base URL should parse."))
}

pub fn store_with(record: Option<TokenRecord>) -> (Arc<TokenStore>, MemoryStorage) {
	let storage = MemoryStorage::default();
	let store = Arc::new(TokenStore::open(Arc::new(storage.clone()), &config()));

	if let Some(record) = record {
		store.set(record);
	}

	(store, storage)
}

pub fn live_record(access: &str, refresh: &str) -> TokenRecord {
	TokenRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_in(Duration::hours(1))
		.build()
}

pub fn client(
	transport: Arc<FakeTransport>,
	store: Arc<TokenStore>,
	hook: &HookCounter,
) -> ApiClient<FakeTransport> {
	ApiClient::with_transport(config(), store, transport).with_auth_failure_handler(hook.handler())
}

pub fn envelope(code: i64, message: &str, data: Value) -> TransportResponse {
	TransportResponse::json(200, &json!({ "code": code, "message": message, "data": data }))
}

pub fn ok(data: Value) -> TransportResponse {
	envelope(200, "ok", data)
}

pub fn unauthorized() -> TransportResponse {
	TransportResponse::new(401, "Unauthorized")
}

pub fn refreshed(access: &str, refresh: &str) -> TransportResponse {
	refreshed_with_code(200, access, refresh)
}

pub fn refreshed_with_code(code: i64, access: &str, refresh: &str) -> TransportResponse {
	let expires_at =
		((OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp_nanos() / 1_000_000) as i64;

	envelope(code, "ok", json!({
		"accessToken": access,
		"refreshToken": refresh,
		"expiresAt": expires_at,
		"tokenType": "Bearer"
	}))
}

pub fn bearer(request: &HttpRequest) -> Option<&str> {
	request.header("Authorization")
}
