//! `{code, message, data}` response envelope and the response classifier.

// self
use crate::{_prelude::*, error::FORMAT_ERROR_CODE, http::TransportResponse};

/// Message carried by the sentinel envelope for non-conforming bodies.
pub const FORMAT_ERROR_MESSAGE: &str = "Response body does not match the envelope format.";

/// HTTP status that always denotes an authentication failure.
pub const UNAUTHORIZED_STATUS: u16 = 401;

/// Wire-level response wrapper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
	/// Business status code.
	pub code: i64,
	/// Human-readable message.
	pub message: String,
	/// Payload; `null` on the wire decodes to `None`.
	pub data: Option<T>,
}
impl<T> Envelope<T> {
	/// Sentinel returned when a body does not conform to the envelope shape.
	pub fn format_error() -> Self {
		Self { code: FORMAT_ERROR_CODE, message: FORMAT_ERROR_MESSAGE.into(), data: None }
	}

	/// Returns `true` if this is the non-conforming-body sentinel.
	pub fn is_format_error(&self) -> bool {
		self.code == FORMAT_ERROR_CODE
	}

	/// Returns `true` when `code` matches the configured success code.
	pub fn is_success(&self, success_code: i64) -> bool {
		self.code == success_code
	}
}

/// Outcome of classifying one transport response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification<T> {
	/// Conforming envelope that does not signal an auth failure.
	Ok(Envelope<T>),
	/// HTTP 401 or an envelope code listed as an auth failure.
	AuthFailed,
	/// Body did not conform; carries the `-1` sentinel envelope.
	Malformed(Envelope<T>),
}
impl<T> Classification<T> {
	/// Returns `true` for [`Classification::AuthFailed`].
	pub fn is_auth_failed(&self) -> bool {
		matches!(self, Self::AuthFailed)
	}
}

/// Classifies `response`: HTTP 401 and envelope codes contained in `auth_failure_codes`
/// are auth failures, conforming bodies become [`Classification::Ok`], and anything else
/// degrades to the sentinel in [`Classification::Malformed`].
///
/// A body conforms when it is a JSON object carrying `code`, `message`, and `data`, with an
/// integer `code`. A `null` message reads as empty and other non-string messages are
/// rendered as JSON.
pub fn classify<T>(response: &TransportResponse, auth_failure_codes: &[i64]) -> Classification<T>
where
	T: DeserializeOwned,
{
	if response.status == UNAUTHORIZED_STATUS {
		return Classification::AuthFailed;
	}

	let Some(raw) = RawEnvelope::parse(&response.body) else {
		tracing::debug!(status = response.status, "response body is not an envelope");

		return Classification::Malformed(Envelope::format_error());
	};

	if auth_failure_codes.contains(&raw.code) {
		return Classification::AuthFailed;
	}

	match raw.decode() {
		Ok(envelope) => Classification::Ok(envelope),
		Err(e) => {
			tracing::debug!(
				status = response.status,
				path = %e.path(),
				error = %e.inner(),
				"envelope data does not match the expected type"
			);

			Classification::Malformed(Envelope::format_error())
		},
	}
}

struct RawEnvelope {
	code: i64,
	message: String,
	data: serde_json::Value,
}
impl RawEnvelope {
	fn parse(body: &[u8]) -> Option<Self> {
		let value = serde_json::from_slice::<serde_json::Value>(body).ok()?;
		let serde_json::Value::Object(mut map) = value else {
			return None;
		};
		let code = map.get("code")?.as_i64()?;
		let message = match map.get("message")? {
			serde_json::Value::String(message) => message.clone(),
			serde_json::Value::Null => String::new(),
			other => other.to_string(),
		};
		let data = map.remove("data")?;

		Some(Self { code, message, data })
	}

	fn decode<T>(self) -> Result<Envelope<T>, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let data = if self.data.is_null() {
			None
		} else {
			Some(serde_path_to_error::deserialize(self.data)?)
		};

		Ok(Envelope { code: self.code, message: self.message, data })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const AUTH_CODES: &[i64] = &[401];

	#[derive(Debug, PartialEq, Eq, Deserialize)]
	struct Profile {
		name: String,
	}

	fn json(status: u16, body: serde_json::Value) -> TransportResponse {
		TransportResponse::json(status, &body)
	}

	#[test]
	fn conforming_envelopes_are_ok() {
		let response = json(
			200,
			serde_json::json!({ "code": 200, "message": "ok", "data": { "name": "ada" } }),
		);
		let Classification::Ok(envelope) = classify::<Profile>(&response, AUTH_CODES) else {
			panic!("Conforming envelope should classify as ok.");
		};

		assert_eq!(envelope.code, 200);
		assert_eq!(envelope.data, Some(Profile { name: "ada".into() }));
	}

	#[test]
	fn null_data_decodes_to_none() {
		let response = json(200, serde_json::json!({ "code": 200, "message": "ok", "data": null }));

		assert_eq!(
			classify::<Profile>(&response, AUTH_CODES),
			Classification::Ok(Envelope { code: 200, message: "ok".into(), data: None })
		);
	}

	#[test]
	fn status_401_is_auth_failure_regardless_of_body() {
		let response = TransportResponse::new(401, "Unauthorized");

		assert!(classify::<serde_json::Value>(&response, AUTH_CODES).is_auth_failed());
	}

	#[test]
	fn embedded_auth_code_is_auth_failure() {
		let response = json(
			200,
			serde_json::json!({ "code": 401, "message": "token invalid", "data": null }),
		);

		assert!(classify::<serde_json::Value>(&response, AUTH_CODES).is_auth_failed());
		assert!(!classify::<serde_json::Value>(&response, &[40101]).is_auth_failed());
	}

	#[test]
	fn missing_fields_degrade_to_sentinel() {
		for body in [
			serde_json::json!({ "code": 200, "message": "ok" }),
			serde_json::json!({ "code": "200", "message": "ok", "data": 1 }),
			serde_json::json!({ "message": "ok", "data": 1 }),
			serde_json::json!("plain string"),
		] {
			let classification = classify::<serde_json::Value>(&json(200, body), AUTH_CODES);

			assert_eq!(classification, Classification::Malformed(Envelope::format_error()));
		}
	}

	#[test]
	fn non_string_messages_keep_the_envelope() {
		let expired = json(
			200,
			serde_json::json!({ "code": 401, "message": null, "data": null }),
		);

		assert!(classify::<serde_json::Value>(&expired, AUTH_CODES).is_auth_failed());

		let response = json(
			200,
			serde_json::json!({ "code": 200, "message": null, "data": { "name": "ada" } }),
		);
		let Classification::Ok(envelope) = classify::<Profile>(&response, AUTH_CODES) else {
			panic!("A null message should not make the envelope malformed.");
		};

		assert_eq!(envelope.message, "");
		assert_eq!(envelope.data, Some(Profile { name: "ada".into() }));

		let numeric =
			json(200, serde_json::json!({ "code": 7, "message": 42, "data": null }));
		let Classification::Ok(envelope) = classify::<serde_json::Value>(&numeric, AUTH_CODES)
		else {
			panic!("A numeric message should be rendered, not rejected.");
		};

		assert_eq!(envelope.message, "42");
	}

	#[test]
	fn non_json_and_mistyped_data_degrade_to_sentinel() {
		let plain = TransportResponse::new(200, "hello");
		let Classification::Malformed(envelope) = classify::<Profile>(&plain, AUTH_CODES) else {
			panic!("Plain text should be malformed.");
		};

		assert!(envelope.is_format_error());
		assert_eq!(envelope.message, FORMAT_ERROR_MESSAGE);

		let mistyped = json(
			200,
			serde_json::json!({ "code": 200, "message": "ok", "data": { "name": 7 } }),
		);

		assert!(matches!(classify::<Profile>(&mistyped, AUTH_CODES), Classification::Malformed(_)));
	}

	#[test]
	fn server_errors_with_envelopes_stay_ok() {
		let response = json(
			500,
			serde_json::json!({ "code": 500, "message": "boom", "data": null }),
		);
		let Classification::Ok(envelope) = classify::<serde_json::Value>(&response, AUTH_CODES)
		else {
			panic!("Server error envelopes should be surfaced to the caller.");
		};

		assert!(!envelope.is_success(200));
	}
}
