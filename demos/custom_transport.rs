//! Demonstrates plugging a custom [`Transport`] into the pipeline and persisting the session
//! to a JSON file.
//!
//! 1. Implement [`Transport::send`] and return the raw status + body.
//! 2. Wrap the transport in `Arc` and pass it to [`ApiClient::with_transport`].
//! 3. Open the [`TokenStore`] from a JSON file, reload it, then log out to remove the copy.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use bearer_pipeline::{
	auth::{TokenRecord, TokenStore},
	config::ClientConfig,
	flows::ApiClient,
	http::{HttpRequest, Transport, TransportFuture, TransportResponse},
};

/// Answers every request locally, echoing the method, URL, and credential it saw.
struct EchoTransport;
impl Transport for EchoTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let body = json!({
				"code": 200,
				"message": "ok",
				"data": {
					"method": request.method.as_str(),
					"url": request.url,
					"authorization": request.header("Authorization"),
				}
			});

			Ok(TransportResponse::json(200, &body))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = std::env::temp_dir().join(format!(
		"bearer-pipeline-demo-{}-{}.json",
		std::process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	));
	let config = ClientConfig::new(Url::parse("https://api.example.com/")?)
		.with_storage_key("demo-session");
	let store = Arc::new(TokenStore::open_file(&path, &config)?);

	store.set(
		TokenRecord::builder()
			.access_token("demo-access")
			.refresh_token("demo-refresh")
			.expires_in(Duration::hours(1))
			.build(),
	);

	let client = <ApiClient<EchoTransport>>::with_transport(config.clone(), store, EchoTransport);
	let envelope = client.post::<Value, _>("/api/orders", &json!({ "sku": "pen" })).await?;

	println!("Echoed request: {}.", envelope.data.unwrap_or_default());

	let reloaded = TokenStore::open_file(&path, &config)?;

	println!(
		"Session reloaded from {}: logged in = {}.",
		path.display(),
		reloaded.is_logged_in()
	);

	client.logout();

	let after_logout = TokenStore::open_file(&path, &config)?;

	println!("After logout: logged in = {}.", after_logout.is_logged_in());

	std::fs::remove_file(&path)?;

	Ok(())
}
