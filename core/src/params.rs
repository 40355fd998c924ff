//! Request parameter encoding.
//!
//! # Design
//! `Params` is a closed set of body shapes. Anything the encoder cannot handle
//! has no `From` impl, so it is rejected by the compiler instead of silently
//! becoming an empty body. The one runtime escape hatch is `Params::form`,
//! which accepts any `Serialize` value and falls back to `Params::None` when
//! the value has no form representation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Read};

use serde::Serialize;

/// A request parameter value, dispatched on its shape by `encode`.
#[derive(Default)]
pub enum Params {
    /// No body.
    #[default]
    None,
    /// Sent as the raw UTF-8 bytes of the string.
    Text(String),
    /// Joined with `&`. Items are NOT escaped; pre-escape them if needed.
    Pairs(Vec<String>),
    /// Sent unchanged.
    Bytes(Vec<u8>),
    /// Form-encoded with keys in sorted order and values percent-escaped.
    Map(HashMap<String, String>),
    /// A pre-built query, form-encoded in its own order.
    Query(Vec<(String, String)>),
    /// Streamed unchanged.
    Reader(Box<dyn Read + Send>),
}

/// An encoded request body.
pub enum Body {
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl Params {
    /// Wrap a reader that is streamed as the request body.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Params::Reader(Box::new(reader))
    }

    /// Form-encode any serializable value (structs, maps, sequences of pairs).
    ///
    /// Values `serde_urlencoded` cannot represent (nested structs, bare
    /// scalars) produce `Params::None`: the request is sent without a body and
    /// no error is reported.
    pub fn form<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => Params::Text(encoded),
            Err(_) => Params::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Params::None)
    }

    /// Turn the parameters into a body, or `None` when there is nothing to send.
    pub fn encode(self) -> Option<Body> {
        match self {
            Params::None => None,
            Params::Text(text) => Some(Body::Bytes(text.into_bytes())),
            Params::Pairs(items) => {
                let joined = items.join("&");
                Some(Body::Bytes(joined.trim_matches('&').as_bytes().to_vec()))
            }
            Params::Bytes(bytes) => Some(Body::Bytes(bytes)),
            Params::Map(map) => {
                let sorted: BTreeMap<_, _> = map.into_iter().collect();
                Some(Body::Bytes(form_encode(sorted).into_bytes()))
            }
            Params::Query(pairs) => Some(Body::Bytes(form_encode(pairs).into_bytes())),
            Params::Reader(reader) => Some(Body::Reader(reader)),
        }
    }
}

impl Body {
    /// Read the whole body into a string (used to move GET parameters into
    /// the query). Invalid UTF-8 is replaced.
    pub fn into_text(self) -> io::Result<String> {
        let bytes = match self {
            Body::Bytes(bytes) => bytes,
            Body::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                buf
            }
        };
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

impl From<Body> for reqwest::blocking::Body {
    fn from(body: Body) -> Self {
        match body {
            Body::Bytes(bytes) => reqwest::blocking::Body::from(bytes),
            Body::Reader(reader) => reqwest::blocking::Body::new(reader),
        }
    }
}

fn form_encode<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::None => f.write_str("None"),
            Params::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Params::Pairs(items) => f.debug_tuple("Pairs").field(items).finish(),
            Params::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Params::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Params::Query(pairs) => f.debug_tuple("Query").field(pairs).finish(),
            Params::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}

impl From<&str> for Params {
    fn from(text: &str) -> Self {
        Params::Text(text.to_string())
    }
}

impl From<String> for Params {
    fn from(text: String) -> Self {
        Params::Text(text)
    }
}

impl From<Vec<String>> for Params {
    fn from(items: Vec<String>) -> Self {
        Params::Pairs(items)
    }
}

impl From<&[&str]> for Params {
    fn from(items: &[&str]) -> Self {
        Params::Pairs(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Params {
    fn from(items: [&str; N]) -> Self {
        Params::Pairs(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<u8>> for Params {
    fn from(bytes: Vec<u8>) -> Self {
        Params::Bytes(bytes)
    }
}

impl From<&[u8]> for Params {
    fn from(bytes: &[u8]) -> Self {
        Params::Bytes(bytes.to_vec())
    }
}

impl From<HashMap<String, String>> for Params {
    fn from(map: HashMap<String, String>) -> Self {
        Params::Map(map)
    }
}

impl From<BTreeMap<String, String>> for Params {
    fn from(map: BTreeMap<String, String>) -> Self {
        Params::Query(map.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Params::Query(pairs)
    }
}

impl<T: Into<Params>> From<Option<T>> for Params {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
