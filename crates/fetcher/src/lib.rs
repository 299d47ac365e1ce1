//! Proxy-aware HTTP client bound to the Tor SOCKS transport, with the
//! allow/disallow/visited gating the dispatch engine runs before every
//! request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use onioncrawl_core::config::TorConfig;
use onioncrawl_core::{CrawlError, FetchResponse};

/// v2 (16-char) and v3 (56-char) onion hostnames. Anything else is
/// rejected before a request is ever issued.
static ONION_V2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[a-zA-Z2-7]{16}\.onion.*").unwrap());
static ONION_V3: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[a-zA-Z2-7]{56}\.onion.*").unwrap());

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0",
];

/// Returns true iff `url` matches one of the four `.onion` allow-list
/// patterns (v2 and v3, http and https).
pub fn is_onion_url(url: &str) -> bool {
    ONION_V2.is_match(url) || ONION_V3.is_match(url)
}

pub struct TorFetcher {
    client: Client,
    disallow: Vec<Regex>,
}

impl TorFetcher {
    /// Build the client against the SOCKS proxy. `disallow_patterns` is
    /// the compiled blacklist loaded from the `-b` file, one regex per
    /// line; an unparseable proxy URL is startup-fatal.
    ///
    /// reqwest has no standalone TLS-handshake-timeout knob, so
    /// `tor.tls_handshake_timeout_seconds` is applied as the overall
    /// per-request timeout, the closest available equivalent.
    pub fn new(tor: &TorConfig, disallow_patterns: &[String]) -> Result<Self, CrawlError> {
        let proxy = reqwest::Proxy::all(&tor.proxy_uri)
            .map_err(|e| CrawlError::StartupFatal(format!("invalid PROXY_URI: {e}")))?;

        let client = Client::builder()
            .proxy(proxy)
            .connect_timeout(Duration::from_secs(tor.connect_timeout_seconds))
            .timeout(Duration::from_secs(tor.tls_handshake_timeout_seconds))
            .tcp_keepalive(None)
            .pool_idle_timeout(Duration::from_secs(tor.idle_timeout_seconds))
            // Keep-alives off: never reuse a pooled connection across requests.
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| CrawlError::StartupFatal(format!("cannot build http client: {e}")))?;

        let disallow = disallow_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| CrawlError::Config(format!("bad blacklist regex {p:?}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { client, disallow })
    }

    /// Step 1 of the fetch protocol: allow-list, then disallow-list. The
    /// visited-store check is the caller's responsibility since it needs
    /// the shared `VisitedStore` handle.
    pub fn is_fetchable(&self, url: &str) -> bool {
        is_onion_url(url) && self.passes_disallow_list(url)
    }

    /// Disallow-list only, skipping the onion-hostname allow-list. Used by
    /// the input-collector path, which re-crawls arbitrary seed URLs
    /// regardless of hostname shape but must still honor the blacklist.
    pub fn passes_disallow_list(&self, url: &str) -> bool {
        !self.disallow.iter().any(|re| re.is_match(url))
    }

    /// Issue the GET. Caps the body at `max_body_bytes`, attaches a
    /// randomized User-Agent, and propagates `referer` when given.
    pub async fn fetch(
        &self,
        url: &Url,
        max_body_bytes: usize,
        referer: Option<&str>,
    ) -> Result<FetchResponse, CrawlError> {
        let start = Instant::now();
        let user_agent = USER_AGENTS.choose(&mut rand::thread_rng()).copied().unwrap_or(USER_AGENTS[0]);

        let mut req = self.client.get(url.as_str()).header("User-Agent", user_agent);
        if let Some(referer) = referer {
            req = req.header("Referer", referer);
        }

        debug!(url = %url, "fetching via tor");
        let resp = req.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            CrawlError::TransientFetch(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        let body = resp
            .bytes()
            .await
            .map_err(|e| CrawlError::TransientFetch(e.to_string()))?;

        if body.len() > max_body_bytes {
            return Err(CrawlError::BodyTooLarge {
                size: body.len(),
                max: max_body_bytes,
            });
        }

        Ok(FetchResponse {
            url: url.clone(),
            status,
            headers,
            body: body.to_vec(),
            content_type,
            fetched_at: chrono::Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_v2_and_v3_onion_hosts() {
        assert!(is_onion_url("http://abcdefghijklmnop.onion/"));
        assert!(is_onion_url(
            "https://abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz2345.onion/path"
        ));
    }

    #[test]
    fn rejects_clear_web() {
        assert!(!is_onion_url("https://evil.example.com/"));
    }
}
