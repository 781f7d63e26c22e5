//! Transport primitives for the request pipeline.
//!
//! [`Transport`] is the pipeline's only dependency on an HTTP stack. It performs exactly
//! one network exchange per call and reports either the raw status + body or a
//! [`TransportError`]; status codes never turn into errors at this layer, because
//! classification belongs to [`envelope::classify`](crate::envelope::classify).

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// orchestrator and the refresher, and the futures they return must be `Send` so the
/// pipeline's own futures stay `Send`.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request`, honouring its timeout.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP methods supported by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`; bodies travel as query parameters.
	#[default]
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outbound request descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
	/// Absolute URL, or a path resolved against the configured base URL.
	pub url: String,
	/// Request method.
	pub method: Method,
	/// Request headers; names are matched case-sensitively as written.
	pub headers: BTreeMap<String, String>,
	/// JSON body (query parameters for [`Method::Get`]).
	pub body: Option<serde_json::Value>,
	/// Per-request timeout; the client default applies when unset.
	pub timeout: Option<Duration>,
}
impl HttpRequest {
	/// Creates a request without headers, body, or timeout override.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self { url: url.into(), method, headers: BTreeMap::new(), body: None, timeout: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: impl Into<String>) -> Self {
		Self::new(Method::Get, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: impl Into<String>) -> Self {
		Self::new(Method::Post, url)
	}

	/// Sets a header, replacing any previous value.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sets the JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Overrides the timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the header value for `name`, if set.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}
}

/// Raw status + body produced by a [`Transport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Creates a response with a JSON body.
	pub fn json(status: u16, body: &serde_json::Value) -> Self {
		Self { status, body: body.to_string().into_bytes() }
	}
}

/// Thin wrapper around [`ReqwestClient`] implementing [`Transport`].
///
/// JSON bodies are serialized with `Content-Type: application/json`; `GET` bodies that are
/// JSON objects are flattened into query parameters instead.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.0.request(method, &request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}
		if let Some(timeout) = request.timeout {
			builder = builder.timeout(std::time::Duration::try_from(timeout).unwrap_or_default());
		}

		match (request.method, request.body) {
			(_, None) => {},
			(Method::Get, Some(body)) => builder = builder.query(&query_pairs(&body)),
			(_, Some(body)) => {
				let payload = serde_json::to_vec(&body).map_err(TransportError::network)?;

				if !request.headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
					builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json");
				}

				builder = builder.body(payload);
			},
		}

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let response = self.build(request)?.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn query_pairs(body: &serde_json::Value) -> Vec<(String, String)> {
	let serde_json::Value::Object(map) = body else {
		return Vec::new();
	};

	map.iter()
		.filter(|(_, value)| !value.is_null())
		.map(|(key, value)| {
			let rendered = match value {
				serde_json::Value::String(s) => s.clone(),
				other => other.to_string(),
			};

			(key.clone(), rendered)
		})
		.collect()
}
