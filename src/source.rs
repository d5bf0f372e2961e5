//! Request URLs for the report API.
//!
//! Every URL carries a `t=<millis>` query parameter so intermediate caches
//! never serve a stale summary. The stamp is strictly increasing within the
//! process, even for two URLs built in the same millisecond.

use crate::config::DashboardConfig;
use crate::view;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Summary,
    /// 1-based history shard index.
    History(usize),
}

impl Endpoint {
    pub fn file_name(self) -> String {
        match self {
            Endpoint::Summary => "summary.json".to_string(),
            Endpoint::History(index) => format!("{index:02}_history.json"),
        }
    }
}

#[derive(Debug)]
pub struct SnapshotSource {
    scheme: String,
    host: String,
    port: Option<u16>,
    /// Path segments between the host and the endpoint, without separators.
    segments: Vec<String>,
    last_stamp: AtomicI64,
}

impl SnapshotSource {
    pub fn new(config: &DashboardConfig) -> Self {
        Self::from_parts(&config.base_url, config.port, &config.path)
    }

    /// `base` may itself carry a path (`https://host/mirror`); it is kept in
    /// front of `path`.
    pub fn from_parts(base: &str, port: Option<u16>, path: &str) -> Self {
        let (scheme, rest) = base.split_once("://").unwrap_or(("https", base));
        let (host, base_path) = rest.split_once('/').unwrap_or((rest, ""));
        let segments = base_path
            .split('/')
            .chain(path.split('/'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
            segments,
            last_stamp: AtomicI64::new(0),
        }
    }

    fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{port}", self.scheme, self.host),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> String {
        let mut url = self.origin();
        for segment in segments
            .into_iter()
            .flat_map(|s| s.split('/'))
            .filter(|s| !s.is_empty())
        {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Absolute URL for `endpoint`, with a fresh cache-busting parameter.
    pub fn build_url(&self, endpoint: Endpoint) -> String {
        let file = endpoint.file_name();
        let base = self.join(self.segments.iter().map(String::as_str).chain([file.as_str()]));
        format!("{base}?t={}", self.cache_bust())
    }

    /// Absolute URL of the raw build log for `origin`. The log lives one
    /// directory above the report (`../category___name.log`).
    pub fn log_url(&self, origin: &str) -> String {
        let relative = view::log_file_path(origin);
        let file = relative.trim_start_matches("../");
        let parent = self.segments.len().saturating_sub(1);
        self.join(
            self.segments[..parent]
                .iter()
                .map(String::as_str)
                .chain([file]),
        )
    }

    fn cache_bust(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = match self
            .last_stamp
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
                Some(now.max(prev + 1))
            }) {
            Ok(prev) | Err(prev) => prev,
        };
        now.max(prev + 1)
    }
}
