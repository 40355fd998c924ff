//! Request builder and transmission pipeline.
//!
//! # Design
//! `Request` accumulates configuration through chained `set_*` calls and can
//! be executed any number of times. Method, URL and parameters are transient:
//! each `execute` overwrites them. Setters take `&mut self`, so one builder
//! cannot be driven by two requests at once without the caller adding a lock.
//!
//! Clients come from an explicit `Arc<ClientPool>`. Because pooled clients
//! keep whatever they were last configured with, the transport, redirect
//! policy, timeouts and cookie jar are re-applied on every checkout.
//!
//! Calls block the current thread. The underlying client runs its own
//! runtime, so do not call into this from inside an async executor.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderValue, HOST};
use reqwest::Method;
use url::Url;

use crate::error::{Error, Result};
use crate::headers::HeaderStore;
use crate::params::Params;
use crate::pool::ClientPool;
use crate::redirect::{LimitRedirects, RedirectPolicy, DEFAULT_REDIRECT_LIMIT};
use crate::response::Response;
use crate::transport::{self, Timeouts, Transport, TransportConfig};

/// Reusable, chainable HTTP request builder.
pub struct Request {
    pool: Arc<ClientPool>,

    host: Option<String>,
    headers: HeaderStore,
    timeouts: Timeouts,

    transport_config: TransportConfig,
    transport: Option<Arc<Transport>>,

    redirect_limit: usize,
    default_redirect: Arc<dyn RedirectPolicy>,
    redirect_handler: Option<Arc<dyn RedirectPolicy>>,

    cookie_jar: Option<Arc<dyn CookieStore>>,

    method: Method,
    url: String,
    params: Params,

    exec_time: Duration,
}

impl Request {
    /// Builder with a private, unbounded client pool.
    pub fn new() -> Self {
        Self::with_pool(Arc::new(ClientPool::unbounded()))
    }

    /// Builder drawing clients from a shared pool.
    pub fn with_pool(pool: Arc<ClientPool>) -> Self {
        Self {
            pool,
            host: None,
            headers: HeaderStore::new(),
            timeouts: Timeouts::default(),
            transport_config: TransportConfig::default(),
            transport: None,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            default_redirect: Arc::new(LimitRedirects::new(DEFAULT_REDIRECT_LIMIT)),
            redirect_handler: None,
            cookie_jar: None,
            method: Method::GET,
            url: String::new(),
            params: Params::None,
            exec_time: Duration::ZERO,
        }
    }

    pub fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    pub fn get(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::GET, url, params)
    }

    pub fn post(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::POST, url, params)
    }

    /// POST with `Content-Type: application/x-www-form-urlencoded`. The header
    /// stays set on the builder afterwards.
    pub fn post_form(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.headers
            .set("Content-Type", "application/x-www-form-urlencoded");
        self.execute(Method::POST, url, params)
    }

    pub fn put(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::PUT, url, params)
    }

    pub fn patch(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::PATCH, url, params)
    }

    pub fn head(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::HEAD, url, params)
    }

    pub fn options(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::OPTIONS, url, params)
    }

    pub fn delete(&mut self, url: &str, params: impl Into<Params>) -> Result<Response> {
        self.execute(Method::DELETE, url, params)
    }

    /// GET `url` and write the body to `path` (mode `0o644` when created).
    pub fn download(&mut self, url: &str, path: impl AsRef<Path>) -> Result<()> {
        let resp = self.get(url, Params::None)?;
        write_file(path.as_ref(), resp.bytes())?;
        Ok(())
    }

    /// Run one request/response cycle.
    ///
    /// For GET and HEAD, encoded parameters replace the URL's query string
    /// instead of being sent as a body.
    pub fn execute(
        &mut self,
        method: Method,
        url: &str,
        params: impl Into<Params>,
    ) -> Result<Response> {
        self.method = method;
        self.url = url.to_string();
        self.params = params.into();
        self.transmit()
    }

    fn transmit(&mut self) -> Result<Response> {
        let method = self.method.clone();
        let mut body = std::mem::take(&mut self.params).encode();

        let mut url = Url::parse(&self.url).map_err(|source| Error::UrlParse {
            url: self.url.clone(),
            source,
        })?;
        if is_query_method(&method) {
            if let Some(params) = body.take() {
                let query = params.into_text().map_err(Error::Params)?;
                url.set_query(Some(&query));
                self.url = url.to_string();
            }
        }

        let mut request = reqwest::blocking::Request::new(method.clone(), url);
        *request.body_mut() = body.map(Into::into);

        let sent_headers = self.headers.clone();
        let mut header_map = sent_headers.to_header_map()?;
        if let Some(host) = &self.host {
            let value = HeaderValue::from_str(host).map_err(|e| Error::InvalidHeader {
                name: HOST.to_string(),
                reason: e.to_string(),
            })?;
            header_map.insert(HOST, value);
        }
        *request.headers_mut() = header_map;
        *request.timeout_mut() = self.timeouts.request();

        let transport = self.transport()?;
        let redirect = self.redirect_policy();
        let cookie_jar = self.cookie_jar.clone();

        let start = Instant::now();
        let mut client = self.pool.acquire();
        let outcome = client
            .configure(transport, redirect, cookie_jar)
            .and_then(|ready| ready.dispatch(request));
        self.exec_time = start.elapsed();
        self.pool.release(client);

        let resp = outcome?;
        log::debug!(
            "{} {} -> {} in {:?}",
            method,
            self.url,
            resp.status(),
            self.exec_time
        );
        Response::materialize(resp, method, sent_headers)
    }

    /// Transport for the current settings, built on first use after a change.
    pub fn transport(&mut self) -> Result<Arc<Transport>> {
        if let Some(transport) = &self.transport {
            return Ok(transport.clone());
        }
        let transport = Arc::new(Transport::build(&self.transport_config, self.timeouts)?);
        self.transport = Some(transport.clone());
        Ok(transport)
    }

    fn redirect_policy(&self) -> Arc<dyn RedirectPolicy> {
        self.redirect_handler
            .clone()
            .unwrap_or_else(|| self.default_redirect.clone())
    }

    fn invalidate_transport(&mut self) -> &mut Self {
        self.transport = None;
        self
    }

    /// Override the `Host` header sent on the wire.
    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Route requests through `proxy`, e.g. `http://127.0.0.1:8081`.
    ///
    /// A malformed URL is rejected here rather than at dispatch.
    pub fn set_proxy(&mut self, proxy: &str) -> Result<&mut Self> {
        self.transport_config.proxy = Some(transport::parse_proxy(proxy)?);
        Ok(self.invalidate_transport())
    }

    /// Maximum requests in a redirect chain for the default policy.
    pub fn set_redirect_limit(&mut self, limit: usize) -> &mut Self {
        self.redirect_limit = limit;
        self.default_redirect = Arc::new(LimitRedirects::new(limit));
        self
    }

    pub fn redirect_limit(&self) -> usize {
        self.redirect_limit
    }

    /// Replace the default redirect policy. The last handler set wins.
    pub fn set_redirect_handler(&mut self, handler: impl RedirectPolicy + 'static) -> &mut Self {
        self.redirect_handler = Some(Arc::new(handler));
        self
    }

    /// Skip TLS certificate verification.
    pub fn set_insecure_skip_verify(&mut self, skip: bool) -> &mut Self {
        self.transport_config.insecure_skip_verify = skip;
        self.invalidate_transport()
    }

    /// Share a cookie jar across requests; `reqwest::cookie::Jar` works.
    pub fn set_cookie_jar<C: CookieStore + 'static>(&mut self, jar: Arc<C>) -> &mut Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Choose the socket addresses used for each host.
    pub fn set_dialer<F>(&mut self, dialer: F) -> &mut Self
    where
        F: Fn(&str) -> io::Result<Vec<SocketAddr>> + Send + Sync + 'static,
    {
        self.transport_config.dialer = Some(Arc::new(dialer));
        self.invalidate_transport()
    }

    /// Send every connection to `ip`, keeping the URL's host name and port.
    pub fn set_backend(&mut self, ip: IpAddr) -> &mut Self {
        self.transport_config.dialer = Some(transport::fixed_backend(ip));
        self.invalidate_transport()
    }

    pub fn set_referer(&mut self, referer: &str) -> &mut Self {
        self.set_header("Referer", referer)
    }

    pub fn set_charset(&mut self, charset: &str) -> &mut Self {
        self.set_header("Accept-Charset", charset)
    }

    pub fn set_user_agent(&mut self, ua: &str) -> &mut Self {
        self.set_header("User-Agent", ua)
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.headers.set(key, value);
        self
    }

    pub fn header(&self, key: &str) -> &str {
        self.headers.get(key)
    }

    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Replace every header.
    pub fn set_headers(&mut self, headers: HeaderStore) -> &mut Self {
        self.headers = headers;
        self
    }

    /// Merge `headers` into the current set (see `HeaderStore::merge`).
    pub fn add_headers(&mut self, headers: &HeaderStore) -> &mut Self {
        self.headers.merge(headers);
        self
    }

    /// Limit for the whole exchange, redirects included.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.total = timeout;
        self.invalidate_transport()
    }

    pub fn set_dial_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.dial = timeout;
        self.invalidate_transport()
    }

    pub fn set_tls_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.tls = timeout;
        self.invalidate_transport()
    }

    /// Wait for the response headers.
    ///
    /// The underlying client has no headers-only deadline, so this becomes the
    /// per-request deadline and also bounds reading the body. A slow body can
    /// fail with `Error::BodyRead` even when the headers arrived in time.
    pub fn set_response_header_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.response_header = timeout;
        self.invalidate_transport()
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) -> &mut Self {
        self.timeouts = timeouts;
        self.invalidate_transport()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// How long the last `execute` spent between client checkout and the
    /// response headers (or the failure).
    pub fn exec_time(&self) -> Duration {
        self.exec_time
    }

    /// Restore transport, headers and redirect settings to their defaults.
    ///
    /// Timeouts, the host override and the cookie jar are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.transport_config = TransportConfig::default();
        self.headers = HeaderStore::new();
        self.redirect_handler = None;
        self.set_redirect_limit(DEFAULT_REDIRECT_LIMIT);
        self.invalidate_transport()
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("host", &self.host)
            .field("headers", &self.headers)
            .field("timeouts", &self.timeouts)
            .field("transport", &self.transport_config)
            .field("redirect_limit", &self.redirect_limit)
            .field("redirect_handler", &self.redirect_handler.is_some())
            .field("cookie_jar", &self.cookie_jar.is_some())
            .field("exec_time", &self.exec_time)
            .finish()
    }
}

fn is_query_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
