//! Connection warm-up for hovered links.
//!
//! The background answers `preconnect` by opening a connection to the link's
//! origin ahead of a likely preview. A `HEAD` request is enough to get DNS,
//! TCP and TLS out of the way; the response itself is discarded.

use std::time::Duration;

use tracing::{debug, warn};

/// Upper bound for one warm-up request.
pub const PRECONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct HttpPreconnector {
    client: reqwest::Client,
}

impl HttpPreconnector {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PRECONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("link-previewer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Warms up a connection to `origin`. Failures are logged, never returned:
    /// a missed warm-up only costs latency.
    pub async fn warm(&self, origin: &str) {
        match self.client.head(origin).send().await {
            Ok(resp) => debug!(%origin, status = %resp.status(), "preconnected"),
            Err(e) => warn!(%origin, error = %e, "preconnect failed"),
        }
    }
}
