use http::Method;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::{SecretsProvider, SignError, SignResult};

const OAUTH_IDENTIFIER: &str = "oauth_";
const OAUTH_PREFIX: &str = "OAuth ";
const REALM_IDENTIFIER: &str = "realm";

/// Everything but the RFC 3986 unreserved characters.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(s: &str) -> String {
    utf8_percent_encode(s, RFC3986).to_string()
}

/// Computes the `Authorization` value of one request.
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: &'a OAuthParameters,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: &'a OAuthParameters) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Sign `method` and `url` together with the url-encoded `payload`.
    ///
    /// `url` must not carry a query; query parameters travel in `payload`
    /// along with any form body. Keys starting with `oauth_` belong to the
    /// protocol and are rejected with [`SignError::ReservedParameter`].
    ///
    /// The returned value lists its fields in byte order, separated by
    /// `", "`, with `realm` last when one is set.
    pub fn generate_signature(
        &self,
        method: &Method,
        url: Url,
        payload: &str,
        is_url_query: bool,
    ) -> SignResult<String> {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        if consumer_key.is_empty() {
            return Err(SignError::MissingConsumerKey);
        }
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let options = self
            .parameters
            .build_options(token, self.secrets.get_verifier());

        // RFC 5849 3.4.1.3.2: encode first, then sort
        let mut encoded = Vec::new();
        for (key, value) in url::form_urlencoded::parse(payload.as_bytes()) {
            if key.starts_with(OAUTH_IDENTIFIER) {
                return Err(SignError::ReservedParameter(key.into_owned()));
            }
            encoded.push((encode(&key), encode(&value)));
        }
        encoded.sort();

        // protocol parameters are inserted where "oauth_" sorts
        let split = encoded.partition_point(|(k, _)| k.as_str() < OAUTH_IDENTIFIER);
        let (query_before_oauth, query_after_oauth) = encoded.split_at(split);

        let mut signer = if is_url_query {
            OAuthSigner::with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        } else {
            OAuthSigner::form_with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        };

        // the key reaches the base string as given, the value gets one more encoding
        for (key, value) in query_before_oauth {
            signer.parameter_encoded(&encode(key), value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in query_after_oauth {
            signer.parameter_encoded(&encode(key), value);
        }

        let sign = signer.finish().authorization;
        Ok(self.sorted_header(&sign))
    }

    fn sorted_header(&self, authorization: &str) -> String {
        let fields = authorization
            .strip_prefix(OAUTH_PREFIX)
            .unwrap_or(authorization);
        // values are percent-encoded, so ',' only ever separates fields
        let mut fields: Vec<&str> = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        fields.sort_unstable();

        let mut header = format!("{}{}", OAUTH_PREFIX, fields.join(", "));
        if let Some(ref realm) = self.parameters.realm {
            // OAuth oauth_..., realm="realm"
            header.push_str(&format!(", {}=\"{}\"", REALM_IDENTIFIER, realm));
        }
        header
    }
}

/// Protocol parameters that are not part of the credential set.
///
/// `nonce` and `timestamp` are normally left unset so every request gets a
/// fresh pair; fixing them makes signatures reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthParameters {
    callback: Option<String>,
    nonce: Option<String>,
    realm: Option<String>,
    timestamp: Option<u64>,
    version: bool,
}

impl OAuthParameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value
    pub fn callback<T: Into<String>>(self, callback: T) -> Self {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<T: Into<String>>(self, nonce: T) -> Self {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value
    pub fn realm<T: Into<String>>(self, realm: T) -> Self {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T: Into<u64>>(self, timestamp: T) -> Self {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// When the version has value `true`, oauth_version will be set with "1.0".
    /// Otherwise, oauth_version will not be included in your request.
    pub fn version<T: Into<bool>>(self, version: T) -> Self {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build_options<'a>(
        &'a self,
        token: Option<&'a str>,
        verifier: Option<&'a str>,
    ) -> Options<'a> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_str());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_str());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(verifier) = verifier {
            opt.verifier(verifier);
        }
        opt.version(self.version);

        opt
    }
}
