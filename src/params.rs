use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::{SignError, SignResult};

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A single scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

macro_rules! int_param {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(i: $t) -> Self {
                    ParamValue::Int(i64::from(i))
                }
            }
        )*
    };
}

int_param!(i8, i16, i32, i64, u8, u16, u32);

/// The payload of a request.
///
/// Form parameters become the query string of GET, HEAD and DELETE requests
/// and an `application/x-www-form-urlencoded` body otherwise. Raw bodies are
/// sent untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Empty,
    Form(BTreeMap<String, ParamValue>),
    Raw { content_type: String, body: Vec<u8> },
}

impl Default for Params {
    fn default() -> Self {
        Params::Empty
    }
}

impl Params {
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Params::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn raw<C, B>(content_type: C, body: B) -> Self
    where
        C: Into<String>,
        B: Into<Vec<u8>>,
    {
        Params::Raw {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Flatten any url-encodable value (a struct, a map, a sequence of
    /// pairs) into form parameters.
    ///
    /// # Errors
    /// This method will fail if the value cannot be serialized into a
    /// query string.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> SignResult<Self> {
        let encoded = serde_urlencoded::to_string(value)
            .map_err(|e| SignError::UnencodableParameters(e.to_string()))?;
        Ok(Params::form(
            url::form_urlencoded::parse(encoded.as_bytes()).map(|(k, v)| (k, v.into_owned())),
        ))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::Empty => true,
            Params::Form(map) => map.is_empty(),
            Params::Raw { body, .. } => body.is_empty(),
        }
    }

    /// The url-encoded form of the parameters, or `None` for raw bodies.
    pub(crate) fn encode_form(&self) -> Option<String> {
        match self {
            Params::Empty => Some(String::new()),
            Params::Form(map) => Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(map.iter().map(|(k, v)| (k, v.to_string())))
                    .finish(),
            ),
            Params::Raw { .. } => None,
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Params::form(IntoIterator::into_iter(pairs))
    }
}

impl<K, V> From<BTreeMap<K, V>> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        Params::form(map)
    }
}

impl<K, V> From<HashMap<K, V>> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(map: HashMap<K, V>) -> Self {
        Params::form(map)
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::Empty
    }
}
