use std::fmt;

use crate::TokenResponse;

/// Read access to the secrets a request is signed with.
pub trait SecretsProvider {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str);

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)>;

    fn get_verifier<'a>(&'a self) -> Option<&'a str> {
        None
    }

    fn get_token_option_pair<'a>(&'a self) -> (Option<&'a str>, Option<&'a str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or_else(|| (None, None))
    }
}

/// The credential set of a client.
///
/// Consumer key and secret identify the application. The access token pair
/// is present once the user has authorized it; the verifier only lives
/// during the authorization handshake.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    token: Option<(String, String)>,
    verifier: Option<String>,
}

impl Credentials {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Credentials {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
            verifier: None,
        }
    }

    /// Restore an authorized session from a stored token pair.
    ///
    /// The consumer pair is left empty; supply it with
    /// [`set_consumer`](Credentials::set_consumer) before sending requests.
    pub fn from_access_token<TKey, TSecret>(token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Credentials::default().token(token, token_secret)
    }

    pub fn token<TKey, TSecret>(mut self, token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        self.set_token(token, token_secret);
        self
    }

    pub fn verifier<T: Into<String>>(mut self, verifier: T) -> Self {
        self.set_verifier(verifier);
        self
    }

    pub fn set_consumer<TKey, TSecret>(&mut self, consumer_key: TKey, consumer_secret: TSecret)
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        self.consumer_key = consumer_key.into();
        self.consumer_secret = consumer_secret.into();
    }

    pub fn set_token<TKey, TSecret>(&mut self, token: TKey, token_secret: TSecret)
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        self.token = Some((token.into(), token_secret.into()));
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn set_verifier<T: Into<String>>(&mut self, verifier: T) {
        self.verifier = Some(verifier.into());
    }

    pub fn clear_verifier(&mut self) {
        self.verifier = None;
    }

    /// Adopt the token pair returned by a request-token or access-token
    /// exchange. The verifier is spent by then and gets cleared.
    pub fn apply_token_response(&mut self, response: &TokenResponse) {
        self.set_token(
            response.oauth_token.as_str(),
            response.oauth_token_secret.as_str(),
        );
        self.verifier = None;
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(|(token, _)| token.as_str())
    }

    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }
}

impl SecretsProvider for Credentials {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        self.token
            .as_ref()
            .map(|(token, secret)| (token.as_str(), secret.as_str()))
    }

    fn get_verifier<'a>(&'a self) -> Option<&'a str> {
        self.verifier.as_deref()
    }
}

// secrets never reach logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token", &self.access_token())
            .field("token_secret", &self.token.as_ref().map(|_| "<redacted>"))
            .field("verifier", &self.verifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    static CONSUMER_KEY: &str = "<CONSUMER_KEY>";
    static CONSUMER_SECRET: &str = "<CONSUMER_SECRET>";
    static TOKEN: &str = "<ACCESS_TOKEN>";
    static TOKEN_SECRET: &str = "<ACCESS_TOKEN_SECRET>";

    #[test]
    fn consumer_only() {
        let creds = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET);
        assert_eq!(creds.get_consumer_key_pair(), (CONSUMER_KEY, CONSUMER_SECRET));
        assert_eq!(creds.get_token_option_pair(), (None, None));
        assert!(!creds.is_authorized());
    }

    #[test]
    fn consumer_and_token() {
        let creds = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET).token(TOKEN, TOKEN_SECRET);
        assert_eq!(creds.get_token_pair_option(), Some((TOKEN, TOKEN_SECRET)));
        assert_eq!(creds.access_token(), Some(TOKEN));
    }

    #[test]
    fn restored_session_needs_consumer() {
        let mut creds = Credentials::from_access_token(TOKEN, TOKEN_SECRET);
        assert_eq!(creds.get_consumer_key_pair(), ("", ""));
        assert!(creds.is_authorized());

        creds.set_consumer(CONSUMER_KEY, CONSUMER_SECRET);
        assert_eq!(creds.consumer_key(), CONSUMER_KEY);
    }

    #[test]
    fn token_response_replaces_token_and_spends_verifier() {
        let mut creds = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET)
            .token("request", "request-secret")
            .verifier("pin");
        assert_eq!(creds.get_verifier(), Some("pin"));

        creds.apply_token_response(&TokenResponse {
            oauth_token: "access".to_string(),
            oauth_token_secret: "access-secret".to_string(),
            remain: HashMap::new(),
        });
        assert_eq!(creds.get_token_pair_option(), Some(("access", "access-secret")));
        assert_eq!(creds.get_verifier(), None);

        creds.clear_token();
        assert!(!creds.is_authorized());
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET).token(TOKEN, TOKEN_SECRET);
        let printed = format!("{:?}", creds);
        assert!(printed.contains(CONSUMER_KEY));
        assert!(!printed.contains(CONSUMER_SECRET));
        assert!(!printed.contains(TOKEN_SECRET));
    }
}
