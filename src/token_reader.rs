use std::collections::HashMap;
use std::convert::TryFrom;

use serde::Deserialize;
use serde_json::Value;

use crate::{TokenReaderError, TokenReaderResult};

const OAUTH_TOKEN_KEY: &str = "oauth_token";

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

/// Read a token pair out of a decoded response.
///
/// Accepts the object a form-encoded token response decodes to, or the raw
/// text when the server labelled it as something else.
impl TryFrom<&Value> for TokenResponse {
    type Error = TokenReaderError;

    fn try_from(value: &Value) -> TokenReaderResult<Self> {
        match value {
            Value::String(text) => read_oauth_token(text.clone()),
            Value::Object(map) => {
                let mut destructured = map
                    .iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    })
                    .collect::<HashMap<String, String>>();
                take_token_pair(&mut destructured, value.to_string())
            }
            other => Err(TokenReaderError::TokenKeyNotFound(
                OAUTH_TOKEN_KEY,
                other.to_string(),
            )),
        }
    }
}

/// Read a token pair out of a form-encoded response body.
pub fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    take_token_pair(&mut destructured, text)
}

fn take_token_pair(
    destructured: &mut HashMap<String, String>,
    source: String,
) -> TokenReaderResult<TokenResponse> {
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured.drain().collect(),
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, source)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            source,
        )),
    }
}
