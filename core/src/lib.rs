//! Pooled, configurable blocking HTTP requests.
//!
//! # Overview
//! `Request` collects method-independent configuration (headers, proxy, TLS,
//! timeouts, redirect policy, cookie jar) through chained setters, then runs
//! any number of exchanges through clients borrowed from a `ClientPool`. Each
//! exchange yields a fully buffered `Response` with JSON, XML, HTML and raw
//! byte views.
//!
//! # Design
//! - Request bodies are a closed `Params` enum; the encoder dispatches on the
//!   variant.
//! - The pool is an explicit `Arc<ClientPool>` dependency, never a global.
//! - Pooled clients are not reset on release; the transport, redirect policy,
//!   timeouts and cookie jar are re-applied on every checkout.
//! - Redirects are governed by a `RedirectPolicy` strategy with the named
//!   `LimitRedirects` default.
//! - Errors are returned, never retried and never logged.
//!
//! ```no_run
//! use httpreq_core::{Request, Result};
//!
//! fn fetch() -> Result<String> {
//!     let mut req = Request::new();
//!     req.set_user_agent("httpreq/0.1").set_redirect_limit(3);
//!     let resp = req.get("http://example.com/search", ["q=rust"])?;
//!     Ok(resp.text().into_owned())
//! }
//! ```

pub mod client;
pub mod error;
pub mod headers;
pub mod params;
pub mod pool;
pub mod redirect;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{Client, Configured};
pub use error::{BoxError, Error, Result};
pub use headers::HeaderStore;
pub use params::{Body, Params};
pub use pool::ClientPool;
pub use redirect::{LimitRedirects, RedirectAction, RedirectPolicy, TooManyRedirects};
pub use request::Request;
pub use response::{RequestInfo, Response};
pub use transport::{Dialer, Timeouts, Transport, TransportConfig};

pub use reqwest::cookie::{CookieStore, Jar};
pub use reqwest::Method;
pub use url::Url;
