//! Auto-proxy discovery
//!
//! Fetches a public newline-separated proxy list, samples a handful of
//! candidates, and probes them sequentially until one answers. Every
//! failure mode degrades to "no proxy" so the download stage can proceed
//! with a direct connection.

use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::joblog::JobLog;

/// Fetch timeout for the candidate list itself
const LIST_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Probes public proxies per the configured list/probe URLs
#[derive(Clone, Debug)]
pub struct ProxySelector {
    config: ProxyConfig,
}

impl ProxySelector {
    /// Create a selector from the proxy sub-config
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Find a responsive proxy, or None when the list is unreachable or no
    /// sampled candidate answers the probe. Progress is narrated into the
    /// job log; nothing here is ever fatal.
    pub async fn find_working_proxy(&self, log: &JobLog) -> Option<String> {
        let candidates = match self.fetch_candidates().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "proxy list fetch failed");
                log.append_line(&format!("[proxy] list fetch failed: {e}"))
                    .await
                    .ok();
                return None;
            }
        };

        if candidates.is_empty() {
            log.append_line("[proxy] list is empty").await.ok();
            return None;
        }

        let sample = self.sample(candidates);
        log.append_line(&format!("[proxy] probing {} candidates", sample.len()))
            .await
            .ok();

        for candidate in sample {
            if self.probe(&candidate).await {
                debug!(proxy = %candidate, "proxy probe succeeded");
                log.append_line(&format!("[proxy] selected {candidate}"))
                    .await
                    .ok();
                return Some(candidate);
            }
        }

        log.append_line("[proxy] no candidate answered the probe")
            .await
            .ok();
        None
    }

    async fn fetch_candidates(&self) -> reqwest::Result<Vec<String>> {
        let client = reqwest::Client::builder()
            .timeout(LIST_FETCH_TIMEOUT)
            .build()?;
        let body = client
            .get(&self.config.proxy_list_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(normalize_proxy_url)
            .collect())
    }

    /// Random sample without replacement, at most `proxy_sample_size`.
    fn sample(&self, mut candidates: Vec<String>) -> Vec<String> {
        // ThreadRng is not Send; keep it out of any await scope.
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(self.config.proxy_sample_size);
        candidates
    }

    async fn probe(&self, proxy_url: &str) -> bool {
        let proxy = match reqwest::Proxy::all(proxy_url) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let client = match reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.config.proxy_probe_timeout)
            .build()
        {
            Ok(c) => c,
            Err(_) => return false,
        };

        match client.get(&self.config.proxy_probe_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Lists publish bare `host:port` entries; reqwest wants a full URL.
fn normalize_proxy_url(entry: &str) -> String {
    if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{entry}")
    }
}
