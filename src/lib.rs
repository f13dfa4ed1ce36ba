/*!
oauth1-dispatch: OAuth1-signed requests, resolved through callbacks.

# Overview

A [`Client`] owns a credential set, signs every outgoing request with
OAuth 1.0 HMAC-SHA1 (through [oauth1-request](https://crates.io/crates/oauth1-request)),
sends it over [reqwest](https://crates.io/crates/reqwest) in the background,
and resolves the request's [`Callback`] exactly once: with the decoded body
on success, or with a classified [`Error`] on failure.

# How to use

## Basic usecase 1 - closures

```no_run
use oauth1_dispatch::{Callback, Client, Method, Params};

# async fn run() {
let client = Client::with_token(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "[ACCESS_TOKEN]",
    "[TOKEN_SECRET]",
);

let callback = Callback::with_closures(
    |body| println!("posted: {}", body),
    |err| eprintln!("failed: {}", err),
);
client.send_request(
    Method::POST,
    "https://api.twitter.com/1.1/statuses/update.json",
    Params::from([("status", "Hello, Twitter!")]),
    callback,
);
# }
```

## Basic usecase 2 - a receiver with methods

```no_run
use std::sync::Arc;
use oauth1_dispatch::{Callback, Client, Error, Method};
use serde_json::Value;

struct Timeline;

impl Timeline {
    fn loaded(&self, body: Value) { println!("{}", body) }
    fn failed(&self, err: Error) { eprintln!("{}", err) }
}

# async fn run() {
let timeline = Arc::new(Timeline);
let client = Client::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
client.send_request(
    Method::GET,
    "https://api.example.com/timeline",
    (),
    Callback::with_delegate(&timeline, Some(Timeline::loaded), Some(Timeline::failed)),
);
# }
```

## Basic usecase 3 - acquiring OAuth token & secret

```no_run
use std::convert::TryFrom;
use oauth1_dispatch::{Client, Method, OAuthParameters, Params, TokenResponse};

# async fn run() -> oauth1_dispatch::Result<()> {
let client = Client::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");

// step 1: acquire request token & token secret
// oauth_callback belongs to this request only; the clone shares the credentials
let initiate = client
    .clone()
    .with_parameters(OAuthParameters::new().callback("oob").version(true));
let body = initiate
    .execute(Method::POST, "https://api.twitter.com/oauth/request_token", ())
    .await?;
let request_token = TokenResponse::try_from(&body)?;
client.apply_token_response(&request_token);

// step 2: the user authorizes and reads back a pin
client.set_verifier("[PIN]");

// step 3: exchange for the access token
let body = client
    .execute(Method::POST, "https://api.twitter.com/oauth/access_token", Params::Empty)
    .await?;
client.apply_token_response(&TokenResponse::try_from(&body)?);
# Ok(())
# }
```
*/
mod callback;
mod client;
mod credentials;
mod error;
mod params;
mod request;
mod response;
mod signer;
mod token_reader;
mod transport;

// exposed to external program
pub use callback::{Callback, DispatchError, Outcome};
pub use client::Client;
pub use credentials::{Credentials, SecretsProvider};
pub use error::{
    DecodeError, Error, Result, SignError, SignResult, TokenReaderError, TokenReaderResult,
};
pub use http::StatusCode;
pub use params::{ParamValue, Params};
pub use request::{PendingRequest, RequestState};
pub use reqwest::Method;
pub use response::{decode_body, ResponseFormat};
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{read_oauth_token, TokenResponse};
pub use transport::{
    HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind,
};
