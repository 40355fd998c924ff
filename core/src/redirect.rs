//! Redirect policies.
//!
//! The underlying client asks the active policy once per redirect hop,
//! passing the URL it is about to request and the chain already requested
//! (original URL first). Only one policy is active per request: a handler
//! installed with `Request::set_redirect_handler` replaces `LimitRedirects`
//! entirely.

use std::fmt;

use url::Url;

use crate::error::BoxError;

/// Redirect limit used when none is configured.
pub const DEFAULT_REDIRECT_LIMIT: usize = 5;

/// What to do with a redirect the policy did not reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectAction {
    /// Request the next URL.
    Follow,
    /// Hand the redirect response back to the caller as the final response.
    Stop,
}

/// Strategy invoked for every redirect hop.
pub trait RedirectPolicy: Send + Sync {
    /// `next` is the redirect target, `via` every URL requested so far.
    /// Returning an error aborts the request with that error.
    fn check(&self, next: &Url, via: &[Url]) -> Result<RedirectAction, BoxError>;
}

impl<F> RedirectPolicy for F
where
    F: Fn(&Url, &[Url]) -> Result<RedirectAction, BoxError> + Send + Sync,
{
    fn check(&self, next: &Url, via: &[Url]) -> Result<RedirectAction, BoxError> {
        self(next, via)
    }
}

/// The default policy: give up once `limit` requests have been made in the
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRedirects {
    limit: usize,
}

impl LimitRedirects {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for LimitRedirects {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_LIMIT)
    }
}

impl RedirectPolicy for LimitRedirects {
    fn check(&self, _next: &Url, via: &[Url]) -> Result<RedirectAction, BoxError> {
        if via.len() >= self.limit {
            return Err(Box::new(TooManyRedirects { limit: self.limit }));
        }
        Ok(RedirectAction::Follow)
    }
}

/// Returned by `LimitRedirects` when the chain reaches its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyRedirects {
    pub limit: usize,
}

impl fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stopped after {} redirects", self.limit)
    }
}

impl std::error::Error for TooManyRedirects {}
