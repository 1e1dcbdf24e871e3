//! Remote-debugging target discovery.
//!
//! Polls the `<base>/json` endpoint of a Chromium-embedded application until
//! it lists a page target with a control address, then selects one.
//!
//! # Selection
//!
//! | Step | Rule |
//! |------|------|
//! | Candidates | `type == "page"` with a `webSocketDebuggerUrl` |
//! | Preferred | First candidate whose title contains the preferred substring |
//! | Fallback | First candidate in returned order |
//!
//! # Example
//!
//! ```no_run
//! use cef_probe::{ProbeConfig, TargetDiscovery};
//!
//! # async fn example() -> cef_probe::Result<()> {
//! let config = ProbeConfig::builder().port(9222).build()?;
//! let discovery = TargetDiscovery::new(&config)?;
//!
//! if let Some(target) = discovery.discover().await {
//!     println!("{} -> {:?}", target.title, target.control_address);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Target type of a top-level renderer.
const PAGE_TARGET: &str = "page";

// ============================================================================
// Target
// ============================================================================

/// One entry of the `/json` target list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Target {
    /// Target type (`page`, `service_worker`, `other`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Window or document title.
    #[serde(default)]
    pub title: String,

    /// Document locator.
    #[serde(rename = "url", default)]
    pub locator: String,

    /// WebSocket address of the control channel, absent if already attached.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub control_address: Option<String>,
}

impl Target {
    /// Returns `true` for page targets.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.kind == PAGE_TARGET
    }

    /// Returns `true` if this target can be attached to.
    #[inline]
    #[must_use]
    pub fn is_candidate(&self) -> bool {
        self.is_page() && self.control_address.as_deref().is_some_and(|a| !a.is_empty())
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Selects a target from one listing.
///
/// Returns the first candidate whose title contains `preferred_title`, else
/// the first candidate, else `None`.
#[must_use]
pub fn select_target<'a>(targets: &'a [Target], preferred_title: Option<&str>) -> Option<&'a Target> {
    let mut candidates = targets.iter().filter(|t| t.is_candidate());
    let first = candidates.clone().next();

    preferred_title
        .and_then(|title| candidates.find(|t| t.title.contains(title)))
        .or(first)
}

// ============================================================================
// TargetDiscovery
// ============================================================================

/// Polls the target list of one debugging endpoint.
#[derive(Debug, Clone)]
pub struct TargetDiscovery {
    client: reqwest::Client,
    endpoint: String,
    attempts: u32,
    poll_interval: Duration,
    preferred_title: Option<String>,
}

impl TargetDiscovery {
    /// Creates a discovery client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the HTTP client cannot
    /// be built.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.poll_interval())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.json_endpoint(),
            attempts: config.discovery_attempts(),
            poll_interval: config.poll_interval(),
            preferred_title: config.preferred_title().map(str::to_string),
        })
    }

    /// Returns the `/json` endpoint being polled.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the target list once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the endpoint is
    /// unreachable, answers with an error status, or does not return a JSON
    /// array of targets.
    pub async fn list(&self) -> Result<Vec<Target>> {
        let targets = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Target>>()
            .await?;

        Ok(targets)
    }

    /// Polls until a target is selected or the attempts run out.
    ///
    /// Each attempt, request plus wait, takes at most one poll interval, so
    /// the call returns within `attempts * poll_interval`. Returns `None`
    /// when no attempt yields a candidate.
    pub async fn discover(&self) -> Option<Target> {
        for attempt in 1..=self.attempts {
            let deadline = Instant::now() + self.poll_interval;

            match timeout_at(deadline, self.list()).await {
                Ok(Ok(targets)) => {
                    for target in &targets {
                        debug!(
                            kind = %target.kind,
                            title = %target.title,
                            url = %target.locator,
                            "Listed target"
                        );
                    }

                    if let Some(target) = select_target(&targets, self.preferred_title.as_deref()) {
                        info!(title = %target.title, url = %target.locator, "Selected target");
                        return Some(target.clone());
                    }
                    debug!(attempt, listed = targets.len(), "No attachable page target");
                }
                Ok(Err(e)) => debug!(attempt, error = %e, "Debug endpoint not ready"),
                Err(_) => debug!(attempt, "Debug endpoint poll timed out"),
            }

            if attempt < self.attempts {
                sleep_until(deadline).await;
            }
        }

        warn!(endpoint = %self.endpoint, attempts = self.attempts, "No debugging target found");
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(kind: &str, title: &str, control: Option<&str>) -> Target {
        Target {
            kind: kind.to_string(),
            title: title.to_string(),
            locator: format!("app://{title}"),
            control_address: control.map(str::to_string),
        }
    }

    fn config_for(base: &str, attempts: u32, interval_ms: u64) -> ProbeConfig {
        ProbeConfig::builder()
            .debug_base(base)
            .discovery_attempts(attempts)
            .poll_interval(Duration::from_millis(interval_ms))
            .build()
            .expect("valid config")
    }

    #[test]
    fn test_target_deserializes_wire_names() {
        let target: Target = serde_json::from_value(json!({
            "type": "page",
            "title": "TeamSpeak Client UI",
            "url": "file:///app/index.html",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/ABC",
            "id": "ABC"
        }))
        .expect("deserialize");

        assert!(target.is_candidate());
        assert_eq!(target.locator, "file:///app/index.html");
    }

    #[test]
    fn test_target_without_control_address() {
        let target: Target = serde_json::from_value(json!({ "type": "page", "title": "x" }))
            .expect("deserialize");
        assert!(target.is_page());
        assert!(!target.is_candidate());
    }

    #[test]
    fn test_select_prefers_title() {
        let targets = vec![
            target("page", "Updater", Some("ws://a")),
            target("service_worker", "TeamSpeak Client UI", Some("ws://b")),
            target("page", "TeamSpeak Client UI", Some("ws://c")),
        ];
        let selected = select_target(&targets, Some("TeamSpeak Client UI")).expect("selected");
        assert_eq!(selected.control_address.as_deref(), Some("ws://c"));
    }

    #[test]
    fn test_select_falls_back_to_first_candidate() {
        let targets = vec![
            target("page", "Attached", None),
            target("page", "Updater", Some("ws://a")),
            target("page", "Other", Some("ws://b")),
        ];
        let selected = select_target(&targets, Some("Main")).expect("selected");
        assert_eq!(selected.title, "Updater");

        let selected = select_target(&targets, None).expect("selected");
        assert_eq!(selected.title, "Updater");
    }

    #[test]
    fn test_select_none_without_candidates() {
        let targets = vec![target("worker", "w", Some("ws://a")), target("page", "p", None)];
        assert!(select_target(&targets, None).is_none());
        assert!(select_target(&[], Some("x")).is_none());
    }

    #[tokio::test]
    async fn test_discover_selects_from_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "type": "page", "title": "Splash", "url": "a", "webSocketDebuggerUrl": "ws://a" },
                { "type": "page", "title": "TeamSpeak Client UI", "url": "b", "webSocketDebuggerUrl": "ws://b" }
            ])))
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::new(&config_for(&server.uri(), 3, 500)).expect("client");
        let target = discovery.discover().await.expect("found");
        assert_eq!(target.control_address.as_deref(), Some("ws://b"));
    }

    #[tokio::test]
    async fn test_list_returns_all_targets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "type": "page", "title": "a", "url": "a" },
                { "type": "other", "title": "b", "url": "b" }
            ])))
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::new(&config_for(&server.uri(), 1, 500)).expect("client");
        let targets = discovery.list().await.expect("list");
        assert_eq!(targets.len(), 2);
    }

    #[tokio::test]
    async fn test_discover_treats_non_array_as_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not": "a list" })))
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::new(&config_for(&server.uri(), 2, 50)).expect("client");
        assert!(discovery.discover().await.is_none());
    }

    #[tokio::test]
    async fn test_discover_is_time_bounded_on_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let attempts = 3;
        let interval = 100;
        let discovery = TargetDiscovery::new(&config_for(
            &format!("http://127.0.0.1:{port}"),
            attempts,
            interval,
        ))
        .expect("client");

        let started = std::time::Instant::now();
        assert!(discovery.discover().await.is_none());

        let bound = Duration::from_millis(u64::from(attempts) * interval);
        assert!(started.elapsed() < bound + Duration::from_millis(250));
    }
}
