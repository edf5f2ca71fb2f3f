//! Round-robin proxy rotation with enforced politeness delays.
//!
//! The hiscores endpoint blacklists IPs that request too quickly, so every
//! request goes through [`ProxyRotator::next`], which blocks the caller
//! until both the per-proxy cool-down and the global inter-request pacing
//! have elapsed. Rotation never fails; it only waits.

use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// An upstream endpoint to send a request through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proxy {
    /// Contact the target host directly.
    Direct,
    /// Forward through the proxy at this URL.
    Via(String),
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proxy::Direct => f.write_str("direct"),
            Proxy::Via(url) => f.write_str(url),
        }
    }
}

/// Cyclic iterator over proxy endpoints with two enforced delays.
///
/// An empty proxy list degrades to a single [`Proxy::Direct`] entry, so the
/// same pacing applies when talking to the upstream host without proxies.
pub struct ProxyRotator {
    proxies: Vec<Proxy>,
    delay: Duration,
    pacing: Duration,
    cursor: usize,
    last_use: Vec<Option<Instant>>,
    last_handout: Option<Instant>,
}

impl ProxyRotator {
    /// `delay` is the per-proxy cool-down, `pacing` the minimum gap between
    /// any two handouts.
    pub fn new(proxies: Vec<String>, delay: Duration, pacing: Duration) -> Self {
        let proxies: Vec<Proxy> = if proxies.is_empty() {
            vec![Proxy::Direct]
        } else {
            proxies.into_iter().map(Proxy::Via).collect()
        };

        let last_use = vec![None; proxies.len()];

        Self {
            proxies,
            delay,
            pacing,
            cursor: 0,
            last_use,
            last_handout: None,
        }
    }

    /// Construct with the default 1 s inter-request pacing.
    pub fn with_default_pacing(proxies: Vec<String>, delay: Duration) -> Self {
        Self::new(proxies, delay, Duration::from_secs(1))
    }

    /// Number of endpoints in the rotation.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Current per-proxy cool-down.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Add one second to the per-proxy cool-down and return the new value.
    ///
    /// Bumps are one-way: the delay never decreases within a run.
    pub fn bump_delay(&mut self) -> Duration {
        self.delay += Duration::from_secs(1);
        self.delay
    }

    /// Hand out the next endpoint, sleeping as needed to honor the delays.
    pub fn next(&mut self) -> Proxy {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.proxies.len();

        if let Some(prev) = self.last_use[index] {
            let since = prev.elapsed();
            if since < self.delay {
                let wait = self.delay - since;
                tracing::debug!(
                    proxy = %self.proxies[index],
                    wait_ms = wait.as_millis() as u64,
                    "sleeping before re-using proxy"
                );
                sleep(wait);
            }
        }

        if let Some(prev) = self.last_handout {
            let since = prev.elapsed();
            if since < self.pacing {
                let wait = self.pacing - since;
                tracing::debug!(
                    proxy = %self.proxies[index],
                    wait_ms = wait.as_millis() as u64,
                    "sleeping before next request"
                );
                sleep(wait);
            }
        }

        let now = Instant::now();
        self.last_use[index] = Some(now);
        self.last_handout = Some(now);

        self.proxies[index].clone()
    }
}
