use std::convert::TryFrom;
use std::fmt;

use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde_json::Value;
use url::Url;

use crate::params::FORM_CONTENT_TYPE;
use crate::response::{decode_body, ResponseFormat};
use crate::transport::{HttpRequest, Transport};
use crate::{Credentials, Error, OAuthParameters, Params, Result, SignError, SignResult, Signer};

/// Lifecycle of a single request. `Succeeded` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Signed,
    Sent,
    Succeeded,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Created => "created",
            RequestState::Signed => "signed",
            RequestState::Sent => "sent",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A signed request that has not been sent yet.
///
/// Built by [`PendingRequest::prepare`], it cannot be modified afterwards.
/// [`dispatch`](PendingRequest::dispatch) consumes it, so it is sent at most
/// once.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    request: HttpRequest,
}

impl PendingRequest {
    /// Encode `params`, sign with `credentials`, and attach the
    /// `Authorization` header.
    ///
    /// GET, HEAD and DELETE carry form parameters in the query string; other
    /// methods carry them as a form body. Query parameters already present
    /// in `url` are kept and signed.
    pub fn prepare(
        method: Method,
        mut url: Url,
        params: Params,
        credentials: &Credentials,
        parameters: &OAuthParameters,
    ) -> SignResult<Self> {
        tracing::debug!(state = %RequestState::Created, %method, %url, "preparing request");
        let in_query = matches!(method, Method::GET | Method::HEAD | Method::DELETE);

        let mut headers = HeaderMap::new();
        let mut body = None;
        // form-encoded data that takes part in the signature, besides the url query
        let mut signed_body = String::new();

        match params {
            Params::Empty => {}
            Params::Form(_) if in_query => {
                let encoded = params.encode_form().unwrap_or_default();
                if !encoded.is_empty() {
                    let query = match url.query() {
                        None | Some("") => encoded,
                        Some(q) => format!("{}&{}", q, encoded),
                    };
                    url.set_query(Some(&query));
                }
            }
            Params::Form(_) => {
                let encoded = params.encode_form().unwrap_or_default();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                signed_body = encoded.clone();
                body = Some(encoded.into_bytes());
            }
            Params::Raw { content_type, body: raw } => {
                let value = HeaderValue::try_from(content_type.as_str())
                    .map_err(|e| SignError::InvalidHeader(e.to_string()))?;
                if content_type.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE) {
                    signed_body = String::from_utf8(raw.clone())
                        .map_err(|e| SignError::UnencodableParameters(e.to_string()))?;
                }
                headers.insert(CONTENT_TYPE, value);
                body = Some(raw);
            }
        }

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);
        let payload = match (url.query(), signed_body.is_empty()) {
            (None, _) | (Some(""), _) => signed_body,
            (Some(q), true) => q.to_string(),
            (Some(q), false) => format!("{}&{}", q, signed_body),
        };

        let authorization = Signer::new(credentials, parameters).generate_signature(
            &method,
            base_url,
            &payload,
            in_query,
        )?;
        let value = HeaderValue::try_from(authorization)
            .map_err(|e| SignError::InvalidHeader(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        tracing::debug!(state = %RequestState::Signed, %method, %url, "request signed");

        Ok(PendingRequest {
            request: HttpRequest {
                method,
                url,
                headers,
                body,
            },
        })
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn url(&self) -> &Url {
        &self.request.url
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.request.body.as_deref()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn http_request(&self) -> &HttpRequest {
        &self.request
    }

    /// Send the request and classify the outcome.
    ///
    /// 2xx with a decodable body is a success; everything else is an
    /// [`Error`] that says whether the network, the server, or the body was
    /// at fault.
    pub async fn dispatch(self, transport: &dyn Transport, format: ResponseFormat) -> Result<Value> {
        let method = self.request.method.clone();
        let url = self.request.url.clone();
        tracing::debug!(state = %RequestState::Sent, %method, %url, "sending request");

        let outcome = match transport.send(self.request).await {
            Err(err) => Err(Error::from(err)),
            Ok(response) if !response.status.is_success() => Err(Error::Protocol {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }),
            Ok(response) => decode_body(&response, format).map_err(Error::from),
        };

        match &outcome {
            Ok(_) => tracing::debug!(state = %RequestState::Succeeded, %method, %url, "request finished"),
            Err(err) => tracing::debug!(
                state = %RequestState::Failed,
                %method,
                %url,
                error = %err,
                "request finished"
            ),
        }
        outcome
    }
}
