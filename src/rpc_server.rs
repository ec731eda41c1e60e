//! Link previewer background process: the coordinator over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"prepareToPreview", "params":{"tab":3,"url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use link_previewer::rpc_handler::{handle_message, BackgroundState};
use link_previewer::services::logging;
use link_previewer::services::settings_engine::SettingsEngine;

/// Requests accepted per second before the server starts refusing.
const MAX_REQUESTS_PER_SECOND: u32 = 200;

/// Simple rate limiter: max requests per one-second window.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

async fn write_line(out: &mut io::Stdout, value: &Value) -> io::Result<()> {
    out.write_all(format!("{}\n", value).as_bytes()).await?;
    out.flush().await
}

#[cfg(feature = "network")]
fn warm_up(preconnector: &Option<link_previewer::services::preconnect::HttpPreconnector>, params: &Value) {
    let (Some(preconnector), Some(url)) = (preconnector, params.get("url").and_then(|v| v.as_str())) else {
        return;
    };
    let Ok(parsed) = url::Url::parse(url) else {
        return;
    };
    let origin = parsed.origin().ascii_serialization();
    let preconnector = preconnector.clone();
    tokio::spawn(async move { preconnector.warm(&origin).await });
}

#[tokio::main]
async fn main() {
    logging::init(std::env::var("LINK_PREVIEWER_DEBUG").is_ok());

    // Honors LINK_PREVIEWER_DATA_DIR through the platform data dir.
    let settings = match SettingsEngine::open(None) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "failed to open settings storage");
            std::process::exit(1);
        }
    };
    let state = Mutex::new(BackgroundState::new(settings));

    #[cfg(feature = "network")]
    let preconnector = match link_previewer::services::preconnect::HttpPreconnector::new() {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "preconnect disabled");
            None
        }
    };

    let mut stdout = io::stdout();
    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    if write_line(&mut stdout, &ready).await.is_err() {
        return;
    }
    info!("background ready");

    let mut rate_limiter = RateLimiter::new(MAX_REQUESTS_PER_SECOND);
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => json!({"id": null, "error": format!("parse error: {}", e)}),
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                if !rate_limiter.check() {
                    json!({"id": id, "error": "rate limit exceeded"})
                } else {
                    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    match handle_message(&state, method, &params) {
                        Ok(val) => {
                            #[cfg(feature = "network")]
                            if method == "preconnect" && val.get("fresh") == Some(&Value::Bool(true)) {
                                warm_up(&preconnector, &params);
                            }
                            json!({"id": id, "result": val})
                        }
                        Err(err) => json!({"id": id, "error": err}),
                    }
                }
            }
        };
        if write_line(&mut stdout, &response).await.is_err() {
            break;
        }
    }
    info!("stdin closed, shutting down");
}
