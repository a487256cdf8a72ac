//! Base URL resolution with a persisted preference and a tunnel fallback.
//!
//! The backend may be reached directly at its origin, through a tunnel whose
//! public address changes between sessions, or through a dynamic DNS name.
//! The resolver asks the origin which of these is current, remembers the
//! answer, and re-asks once when the remembered address stops answering.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;
use crate::traits::{PreferenceStore, Transport};
use crate::transport::{ApiRequest, ApiResponse, FetchOptions};
use crate::types::TunnelStatus;

/// Preference key the resolved base URL is stored under.
pub const BASE_URL_KEY: &str = "addarr_base_url";

/// Status document listing the tunnel and dynamic DNS addresses.
pub const TUNNEL_STATUS_PATH: &str = "/api/tunnel/status";

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(4000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Address the client was pointed at. Returned verbatim when nothing
    /// better is known.
    pub origin: String,
    /// Bound on each status document request.
    pub resolve_timeout: Duration,
    /// Default bound on business calls.
    pub request_timeout: Duration,
}

impl ResolverOptions {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct EndpointResolver<T, S> {
    transport: T,
    store: S,
    options: ResolverOptions,
}

impl<T: Transport, S: PreferenceStore> EndpointResolver<T, S> {
    pub fn new(transport: T, store: S, options: ResolverOptions) -> Self {
        Self {
            transport,
            store,
            options,
        }
    }

    /// The persisted base URL, if any.
    pub fn cached(&self) -> Option<String> {
        self.store.get(BASE_URL_KEY).filter(|url| !url.is_empty())
    }

    /// Forget the persisted base URL.
    pub fn reset(&self) -> std::io::Result<()> {
        self.store.remove(BASE_URL_KEY)
    }

    /// Base URL to prefix API calls with. Never fails: anything that goes
    /// wrong while asking the status endpoint yields the origin.
    pub async fn resolve(&self) -> String {
        if let Some(saved) = self.cached() {
            debug!(base = %saved, "using cached base URL");
            return saved;
        }

        match self.tunnel_status().await {
            Ok(status) => match status
                .public_url()
                .filter(|url| is_base_url(url))
                .or_else(|| status.duckdns_url().filter(|url| is_base_url(url)))
            {
                Some(url) => {
                    debug!(base = %url, "resolved base URL from tunnel status");
                    self.remember(url);
                    return url.to_string();
                }
                None => debug!("tunnel status lists no usable public address"),
            },
            Err(e) => warn!(error = %e, "tunnel status unavailable, using origin"),
        }

        self.options.origin.clone()
    }

    /// Send `path` to the resolved base, re-resolving and retrying once if
    /// the base cannot be reached.
    ///
    /// Any HTTP response counts as reached. The retry's outcome is returned
    /// as-is, error included.
    pub async fn fetch_resilient(
        &self,
        path: &str,
        options: &FetchOptions,
        timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let base = self.resolve().await;
        let first = match join(&base, path) {
            Ok(url) => {
                self.send_bounded(ApiRequest::from_options(url, options), timeout)
                    .await
            }
            Err(e) => Err(e),
        };

        match first {
            Err(e) if e.is_transport() => {
                warn!(base = %base, path, error = %e, "base URL unreachable, falling back");
                let fallback = self.fallback_base().await;
                let url = join(&fallback, path)?;
                self.send_bounded(ApiRequest::from_options(url, options), timeout)
                    .await
            }
            other => other,
        }
    }

    /// [`fetch_resilient`](Self::fetch_resilient) with the default request timeout.
    pub async fn fetch(&self, path: &str, options: &FetchOptions) -> Result<ApiResponse, ApiError> {
        self.fetch_resilient(path, options, self.options.request_timeout)
            .await
    }

    /// Re-read the status document after a transport failure. Only the
    /// dynamic DNS address is considered here, never the tunnel URL.
    ///
    /// A status answer is persisted even when it names no address and the
    /// origin is chosen. An unanswered status request leaves the stored
    /// base alone, so one outage cannot replace a working tunnel address.
    async fn fallback_base(&self) -> String {
        match self.tunnel_status().await {
            Ok(status) => {
                let base = status
                    .duckdns_url()
                    .filter(|url| is_base_url(url))
                    .map(str::to_string)
                    .unwrap_or_else(|| self.options.origin.clone());
                self.remember(&base);
                base
            }
            Err(e) => {
                warn!(error = %e, "fallback status unavailable, using origin for this request");
                self.options.origin.clone()
            }
        }
    }

    async fn tunnel_status(&self) -> Result<TunnelStatus, ApiError> {
        let url = join(&self.options.origin, TUNNEL_STATUS_PATH)?;
        let resp = self
            .send_bounded(ApiRequest::get(url), self.options.resolve_timeout)
            .await?
            .error_for_status()?;
        resp.json()
    }

    async fn send_bounded(
        &self,
        request: ApiRequest,
        limit: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let url = request.url.clone();
        match tokio::time::timeout(limit, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                url,
                after_ms: limit.as_millis() as u64,
            }),
        }
    }

    fn remember(&self, base: &str) {
        if let Err(e) = self.store.set(BASE_URL_KEY, base) {
            warn!(base, error = %e, "failed to persist base URL");
        }
    }
}

/// An absolute URL that paths can be joined onto.
fn is_base_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| !u.cannot_be_a_base())
}

/// Resolve `path` against `base` the way a browser resolves a relative URL.
pub fn join(base: &str, path: &str) -> Result<String, ApiError> {
    Url::parse(base)
        .and_then(|b| b.join(path))
        .map(String::from)
        .map_err(|source| ApiError::InvalidUrl {
            url: base.to_string(),
            source,
        })
}
