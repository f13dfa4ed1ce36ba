use http::StatusCode;
use thiserror::Error;

use crate::callback::DispatchError;
use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

/// Every way a dispatched request can fail.
///
/// All of these end up at the failure path of the request's
/// [`Callback`](crate::Callback).
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport failed : {0}")]
    Transport(#[from] TransportError),
    #[error("server responded with {status} : {body}")]
    Protocol { status: StatusCode, body: String },
    #[error("response could not be decoded : {0}")]
    Decode(#[from] DecodeError),
    #[error("callback dispatch failed : {0}")]
    InternalDispatch(#[from] DispatchError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
}

impl Error {
    /// Status code of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignError {
    #[error("consumer key is not configured.")]
    MissingConsumerKey,
    #[error("invalid request url : {0}")]
    InvalidUrl(String),
    #[error("parameter {0} uses the reserved oauth_ prefix")]
    ReservedParameter(String),
    #[error("parameters could not be url-encoded : {0}")]
    UnencodableParameters(String),
    #[error("authorization value is not a valid header : {0}")]
    InvalidHeader(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed json : {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed form body : {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("body is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}
