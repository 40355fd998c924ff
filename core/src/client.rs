//! Pooled client entries.
//!
//! # Design
//! A `Client` is reusable connection infrastructure: it owns a
//! `reqwest::blocking::Client` (and with it a connection pool and an I/O
//! thread), plus the settings it was last configured with. Nothing is reset
//! when a client goes back to the pool, so `configure` must run on every
//! checkout. It only rebuilds the inner client when the transport
//! generation, redirect policy or cookie jar actually differ from what was
//! applied last time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::redirect::{RedirectAction, RedirectPolicy, TooManyRedirects};
use crate::transport::Transport;

/// Reusable client capability handed out by `ClientPool`.
pub struct Client {
    id: Uuid,
    inner: Option<reqwest::blocking::Client>,
    transport: Option<Arc<Transport>>,
    redirect: Option<Arc<dyn RedirectPolicy>>,
    cookie_jar: Option<Arc<dyn CookieStore>>,
}

impl Client {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: None,
            transport: None,
            redirect: None,
            cookie_jar: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Generation of the transport last applied, if any.
    pub fn transport_generation(&self) -> Option<u64> {
        self.transport.as_ref().map(|t| t.generation())
    }

    /// Apply per-request settings, rebuilding the inner client if they changed.
    pub fn configure(
        &mut self,
        transport: Arc<Transport>,
        redirect: Arc<dyn RedirectPolicy>,
        cookie_jar: Option<Arc<dyn CookieStore>>,
    ) -> Result<Configured<'_>> {
        let current = self.transport_generation() == Some(transport.generation())
            && self.redirect.as_ref().is_some_and(|r| same(r, &redirect))
            && match (&self.cookie_jar, &cookie_jar) {
                (Some(a), Some(b)) => same(a, b),
                (None, None) => true,
                _ => false,
            };

        let inner = match self.inner.take() {
            Some(inner) if current => inner,
            _ => {
                let mut builder = transport
                    .client_builder()
                    .timeout(None::<Duration>)
                    .redirect(redirect_policy(redirect.clone()));
                if let Some(jar) = &cookie_jar {
                    builder = builder.cookie_provider(Arc::new(SharedJar(jar.clone())));
                }
                let inner = builder.build().map_err(Error::Transport)?;
                log::debug!(
                    "client {} configured with transport generation {}",
                    self.id,
                    transport.generation()
                );
                inner
            }
        };

        self.transport = Some(transport);
        self.redirect = Some(redirect);
        self.cookie_jar = cookie_jar;
        Ok(Configured {
            client: self.inner.insert(inner),
        })
    }
}

/// A client with per-request settings applied, ready to dispatch.
pub struct Configured<'a> {
    client: &'a reqwest::blocking::Client,
}

impl Configured<'_> {
    /// Send a request and wait for the response headers.
    pub fn dispatch(self, request: reqwest::blocking::Request) -> Result<reqwest::blocking::Response> {
        self.client.execute(request).map_err(classify)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("transport", &self.transport_generation())
            .field("cookie_jar", &self.cookie_jar.is_some())
            .finish()
    }
}

fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn redirect_policy(policy: Arc<dyn RedirectPolicy>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        match policy.check(attempt.url(), attempt.previous()) {
            Ok(RedirectAction::Follow) => attempt.follow(),
            Ok(RedirectAction::Stop) => attempt.stop(),
            Err(e) => attempt.error(e),
        }
    })
}

/// Map a send failure onto the error taxonomy, pulling redirect-limit
/// rejections back out of reqwest's wrapper.
fn classify(err: reqwest::Error) -> Error {
    if !err.is_redirect() {
        return Error::Transport(err);
    }
    let mut source = std::error::Error::source(&err);
    while let Some(e) = source {
        if let Some(limit) = e.downcast_ref::<TooManyRedirects>() {
            return Error::TooManyRedirects(*limit);
        }
        source = e.source();
    }
    Error::Redirect(Box::new(err))
}

/// Adapter letting a shared `dyn CookieStore` be handed to reqwest.
struct SharedJar(Arc<dyn CookieStore>);

impl CookieStore for SharedJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0.set_cookies(cookie_headers, url)
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0.cookies(url)
    }
}
