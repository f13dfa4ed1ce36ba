use std::collections::BTreeMap;

use http::header::CONTENT_TYPE;
use serde_json::Value;

use crate::params::FORM_CONTENT_TYPE;
use crate::transport::HttpResponse;
use crate::DecodeError;

/// How a successful response body is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Choose by `Content-Type`: form bodies as objects, `text/*` as text
    /// unless it parses as JSON, JSON otherwise.
    Auto,
    Json,
    /// `key=value&...` into an object of strings. Token endpoints answer
    /// this way.
    Form,
    Text,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        ResponseFormat::Auto
    }
}

/// Decode the body of a successful response. An empty body is `null`.
pub fn decode_body(response: &HttpResponse, format: ResponseFormat) -> Result<Value, DecodeError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match format {
        ResponseFormat::Json => Ok(serde_json::from_slice(&response.body)?),
        ResponseFormat::Form => decode_form(&response.body),
        ResponseFormat::Text => Ok(Value::String(String::from_utf8(response.body.clone())?)),
        ResponseFormat::Auto => {
            let content_type = response
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if content_type.starts_with(FORM_CONTENT_TYPE) {
                decode_form(&response.body)
            } else if content_type.starts_with("text/") {
                match serde_json::from_slice(&response.body) {
                    Ok(value) => Ok(value),
                    Err(_) => Ok(Value::String(String::from_utf8(response.body.clone())?)),
                }
            } else {
                Ok(serde_json::from_slice(&response.body)?)
            }
        }
    }
}

fn decode_form(body: &[u8]) -> Result<Value, DecodeError> {
    let pairs: BTreeMap<String, String> = serde_urlencoded::from_bytes(body)?;
    Ok(Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    ))
}
