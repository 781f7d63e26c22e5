//! Demonstrates the pipeline recovering from an expired session: the first call is rejected
//! with `401`, the client refreshes once, replays the call, and persists the new session.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::Duration;
use url::Url;
// self
use bearer_pipeline::{
	auth::{TokenRecord, TokenStore},
	config::ClientConfig,
	flows::ReqwestApiClient,
	store::MemoryStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user").header("authorization", "Bearer demo-stale");
			then.status(401);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"code": 200,
				"message": "ok",
				"data": {
					"accessToken": "demo-fresh",
					"refreshToken": "demo-refresh-2",
					"expiresAt": 4_102_444_800_000_i64,
					"tokenType": "Bearer"
				}
			}));
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user").header("authorization", "Bearer demo-fresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "code": 200, "message": "ok", "data": { "name": "Ada" } }));
		})
		.await;
	let config =
		ClientConfig::new(Url::parse(&server.base_url())?).with_default_header("X-Platform", "demo");
	let storage = MemoryStorage::default();
	let store = Arc::new(TokenStore::open(Arc::new(storage.clone()), &config));

	store.set(
		TokenRecord::builder()
			.access_token("demo-stale")
			.refresh_token("demo-refresh-1")
			.expires_in(Duration::minutes(10))
			.build(),
	);

	let client = ReqwestApiClient::new(config, store.clone())
		.with_auth_failure_handler(|| println!("Session ended; redirect to sign-in."));
	let envelope = client.get::<Value>("/api/user").await?;

	println!("Resolved {} with {:?}.", envelope.code, envelope.data);
	println!("Session now expires in {} seconds.", store.expires_in().whole_seconds());
	println!("Refreshes issued: {}.", client.refresher().metrics().attempts());

	stale_mock.assert_async().await;
	refresh_mock.assert_async().await;
	user_mock.assert_async().await;

	Ok(())
}
