use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{IntoUrl, Method};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::response::ResponseFormat;
use crate::transport::{ReqwestTransport, Transport};
use crate::{
    Callback, Credentials, Error, OAuthParameters, Params, PendingRequest, Result, SignError,
    SignResult, TokenResponse,
};

/// Signs requests with a shared credential set and resolves their
/// callbacks.
///
/// Cloning a `Client` is cheap; clones share the credentials and the
/// transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    credentials: Arc<RwLock<Credentials>>,
    parameters: OAuthParameters,
    format: ResponseFormat,
}

impl Client {
    /// Constructs a client that only knows the consumer pair, for the
    /// request-token and access-token steps.
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Client::from_credentials(Credentials::new(consumer_key, consumer_secret))
    }

    /// Constructs an authorized client.
    pub fn with_token<TKey, TSecret, TToken, TTokenSecret>(
        consumer_key: TKey,
        consumer_secret: TSecret,
        token: TToken,
        token_secret: TTokenSecret,
    ) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
        TToken: Into<String>,
        TTokenSecret: Into<String>,
    {
        Client::from_credentials(
            Credentials::new(consumer_key, consumer_secret).token(token, token_secret),
        )
    }

    /// Restores a previously authorized session.
    ///
    /// The consumer pair must be supplied with
    /// [`update_credentials`](Client::update_credentials) before requests can
    /// be signed; until then they fail with [`SignError::MissingConsumerKey`].
    pub fn with_access_token<TToken, TTokenSecret>(token: TToken, token_secret: TTokenSecret) -> Self
    where
        TToken: Into<String>,
        TTokenSecret: Into<String>,
    {
        Client::from_credentials(Credentials::from_access_token(token, token_secret))
    }

    /// Constructs a client over `reqwest` with `oauth_version="1.0"` sent.
    pub fn from_credentials(credentials: Credentials) -> Self {
        Client {
            transport: Arc::new(ReqwestTransport::new()),
            credentials: Arc::new(RwLock::new(credentials)),
            parameters: OAuthParameters::new().version(true),
            format: ResponseFormat::default(),
        }
    }

    pub fn with_transport<T: Transport + 'static>(self, transport: T) -> Self {
        Client {
            transport: Arc::new(transport),
            ..self
        }
    }

    pub fn with_parameters(self, parameters: OAuthParameters) -> Self {
        Client { parameters, ..self }
    }

    pub fn with_response_format(self, format: ResponseFormat) -> Self {
        Client { format, ..self }
    }

    /// A copy of the current credential set.
    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the credential set. Requests already signed are unaffected.
    pub fn update_credentials<F>(&self, f: F)
    where
        F: FnOnce(&mut Credentials),
    {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut credentials);
    }

    pub fn set_token<TToken, TTokenSecret>(&self, token: TToken, token_secret: TTokenSecret)
    where
        TToken: Into<String>,
        TTokenSecret: Into<String>,
    {
        self.update_credentials(|c| c.set_token(token, token_secret));
    }

    pub fn set_verifier<T: Into<String>>(&self, verifier: T) {
        self.update_credentials(|c| c.set_verifier(verifier));
    }

    pub fn apply_token_response(&self, response: &TokenResponse) {
        self.update_credentials(|c| c.apply_token_response(response));
    }

    /// Sign a request against a snapshot of the current credentials.
    ///
    /// # Errors
    ///
    /// This method fails whenever supplied `Url` cannot be parsed, the
    /// credentials lack a consumer key, or a parameter key starts with
    /// `oauth_`.
    pub fn prepare<U: IntoUrl>(&self, method: Method, url: U, params: Params) -> SignResult<PendingRequest> {
        let url = url
            .into_url()
            .map_err(|e| SignError::InvalidUrl(e.to_string()))?;
        let snapshot = self.credentials();
        PendingRequest::prepare(method, url, params, &snapshot, &self.parameters)
    }

    /// Sign, send, and decode one request.
    pub async fn execute<U, P>(&self, method: Method, url: U, params: P) -> Result<Value>
    where
        U: IntoUrl,
        P: Into<Params>,
    {
        let request = self.prepare(method, url, params.into())?;
        request.dispatch(self.transport.as_ref(), self.format).await
    }

    /// Send a request in the background and resolve `callback` with its
    /// outcome.
    ///
    /// Returns immediately. The callback is resolved exactly once, on the
    /// runtime thread that observes the response; failures to sign are
    /// reported through it as well. Must be called within a tokio runtime.
    ///
    /// ```no_run
    /// use oauth1_dispatch::{Callback, Client, Method, Params};
    ///
    /// # async fn run() {
    /// let client = Client::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
    /// let handle = client.send_request(
    ///     Method::GET,
    ///     "https://api.example.com/thing",
    ///     Params::from([("q", "1")]),
    ///     Callback::with_closures(
    ///         |body| println!("got {}", body),
    ///         |err| eprintln!("failed: {}", err),
    ///     ),
    /// );
    /// handle.await.unwrap();
    /// # }
    /// ```
    pub fn send_request<U, P>(&self, method: Method, url: U, params: P, callback: Callback) -> JoinHandle<()>
    where
        U: IntoUrl,
        P: Into<Params>,
    {
        let prepared = self.prepare(method, url, params.into());
        let transport = Arc::clone(&self.transport);
        let format = self.format;

        tokio::spawn(async move {
            let outcome = match prepared {
                Ok(request) => request.dispatch(transport.as_ref(), format).await,
                Err(err) => Err(Error::from(err)),
            };
            // dispatch errors are logged by the callback itself
            let _ = match outcome {
                Ok(value) => callback.resolve_success(value),
                Err(err) => callback.resolve_failure(err),
            };
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials())
            .field("parameters", &self.parameters)
            .field("format", &self.format)
            .finish()
    }
}
