//! Connection-level configuration: proxy, dialing, TLS and timeouts.
//!
//! # Design
//! `TransportConfig` is the mutable description kept on a `Request`;
//! `Transport` is the immutable snapshot built from it. The request caches the
//! snapshot behind an `Arc` and throws it away whenever a transport field
//! changes, so pooled clients can tell from the generation number alone
//! whether their connection setup is still current.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BoxError, Error, Result};

/// Chooses the socket addresses used to reach a host.
///
/// Only the IP part is honored: the port always comes from the request URL.
/// The function runs on the client's I/O thread and should return quickly.
pub type Dialer = Arc<dyn Fn(&str) -> io::Result<Vec<SocketAddr>> + Send + Sync>;

/// Timeout knobs. `Duration::ZERO` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Whole exchange, redirects included.
    pub total: Duration,
    /// TCP connect; also used as the keepalive interval.
    pub dial: Duration,
    /// TLS handshake, added on top of the dial budget.
    pub tls: Duration,
    /// Wait for the response headers after the request is written. Also
    /// bounds the body read, since it is applied as the request deadline.
    pub response_header: Duration,
}

impl Timeouts {
    /// Connect budget covering TCP connect plus TLS handshake.
    fn connect(&self) -> Option<Duration> {
        non_zero(self.dial.saturating_add(self.tls))
    }

    /// Per-request deadline: the tighter of `total` and `response_header`.
    pub(crate) fn request(&self) -> Option<Duration> {
        match (non_zero(self.total), non_zero(self.response_header)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

/// Mutable transport settings kept on a `Request`.
#[derive(Clone, Default)]
pub struct TransportConfig {
    /// Explicit proxy. `None` uses the `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY`
    /// environment.
    pub proxy: Option<Url>,
    pub dialer: Option<Dialer>,
    pub insecure_skip_verify: bool,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("proxy", &self.proxy.as_ref().map(Url::as_str))
            .field("dialer", &self.dialer.is_some())
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

/// Parse a proxy URL eagerly so configuration mistakes surface at the setter.
pub fn parse_proxy(proxy: &str) -> Result<Url> {
    let url = Url::parse(proxy).map_err(|e| Error::ProxyConfig {
        proxy: proxy.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(Error::ProxyConfig {
            proxy: proxy.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Dialer sending every connection to `ip`, whatever the host name.
pub fn fixed_backend(ip: IpAddr) -> Dialer {
    Arc::new(move |_host: &str| Ok(vec![SocketAddr::new(ip, 0)]))
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Immutable connection setup applied to pooled clients.
pub struct Transport {
    generation: u64,
    proxy: Option<reqwest::Proxy>,
    dialer: Option<Dialer>,
    insecure_skip_verify: bool,
    timeouts: Timeouts,
}

impl Transport {
    pub fn build(config: &TransportConfig, timeouts: Timeouts) -> Result<Self> {
        let proxy = match &config.proxy {
            Some(url) => Some(reqwest::Proxy::all(url.as_str()).map_err(|e| Error::ProxyConfig {
                proxy: url.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        let transport = Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            proxy,
            dialer: config.dialer.clone(),
            insecure_skip_verify: config.insecure_skip_verify,
            timeouts,
        };
        log::debug!("built transport {transport:?}");
        Ok(transport)
    }

    /// Unique per build; equal generations mean identical settings.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Start a client builder carrying the connection-level settings.
    pub(crate) fn client_builder(&self) -> reqwest::blocking::ClientBuilder {
        let mut builder = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .connect_timeout(self.timeouts.connect())
            .tcp_keepalive(non_zero(self.timeouts.dial));
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(proxy.clone());
        }
        if let Some(dialer) = &self.dialer {
            builder = builder.dns_resolver(Arc::new(DialResolver(dialer.clone())));
        }
        builder
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("generation", &self.generation)
            .field("proxy", &self.proxy.is_some())
            .field("dialer", &self.dialer.is_some())
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

struct DialResolver(Dialer);

impl Resolve for DialResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let result = (self.0)(name.as_str())
            .map(|addrs| Box::new(addrs.into_iter()) as Addrs)
            .map_err(|e| Box::new(e) as BoxError);
        Box::pin(std::future::ready(result))
    }
}
