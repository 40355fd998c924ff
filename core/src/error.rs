//! Error types for the request pipeline.
//!
//! # Design
//! Every failure is returned to the caller of the call that caused it; nothing
//! is retried and nothing is logged here. Redirect rejections get their own
//! variants because callers frequently distinguish "the server bounced us too
//! often" from a plain network failure. An unsupported body shape is not an
//! error at all (see `Params::form`).

use std::io;

use crate::redirect::TooManyRedirects;

/// Boxed error returned by caller-supplied redirect handlers and dialers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `Request` and `Response`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target URL could not be parsed.
    #[error("invalid url {url:?}: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The proxy URL was malformed. Raised by `set_proxy`, never deferred.
    #[error("invalid proxy {proxy:?}: {reason}")]
    ProxyConfig { proxy: String, reason: String },

    /// A header name or value cannot be sent on the wire.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The default redirect policy stopped the chain.
    #[error(transparent)]
    TooManyRedirects(#[from] TooManyRedirects),

    /// A caller-supplied redirect handler rejected a hop.
    #[error("redirect rejected: {0}")]
    Redirect(#[source] BoxError),

    /// Connect, TLS, timeout or protocol failure from the underlying exchange.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be drained.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// A streamed request body could not be read while turning it into a query string.
    #[error("failed to read request parameters: {0}")]
    Params(#[source] io::Error),

    /// The response body is not valid JSON for the requested type.
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The response body is not valid XML for the requested type.
    #[error("xml decode failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Writing a downloaded body to disk failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the underlying exchange gave up because a timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) | Error::BodyRead(e) if e.is_timeout())
    }

    /// True for either redirect rejection variant.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Error::TooManyRedirects(_) | Error::Redirect(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_redirects_displays_limit() {
        let err = Error::from(TooManyRedirects { limit: 3 });
        assert_eq!(err.to_string(), "stopped after 3 redirects");
        assert!(err.is_redirect());
        assert!(!err.is_timeout());
    }

    #[test]
    fn proxy_config_mentions_input() {
        let err = Error::ProxyConfig {
            proxy: "::bad".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("::bad"));
    }
}
