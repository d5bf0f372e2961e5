use crate::cli::Cli;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://ironman.dragonflybsd.org";
pub const DEFAULT_PATH: &str = "dports/logs/Report";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_TITLE: &str = "Synth build report";

/// Immutable configuration set at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub base_url: String,
    pub port: Option<u16>,
    pub path: String,
    pub poll_interval: Duration,
    pub title: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            port: None,
            path: DEFAULT_PATH.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Rejects base URLs the HTTP client cannot reach and zero intervals.
    pub fn validate(&self) -> Result<(), String> {
        let Some((scheme, rest)) = self.base_url.split_once("://") else {
            return Err(format!(
                "Invalid base URL '{}'. Expected e.g. 'https://ironman.dragonflybsd.org'.",
                self.base_url
            ));
        };
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(format!("Unsupported scheme '{scheme}'. Use http or https."));
        }
        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(format!("Invalid host in base URL '{}'.", self.base_url));
        }
        if host.contains(':') && self.port.is_some() {
            return Err("Port given both in the base URL and as --port.".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("Poll interval must be at least 1 ms.".to_string());
        }
        Ok(())
    }
}

impl TryFrom<&Cli> for DashboardConfig {
    type Error = String;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let config = Self {
            base_url: cli.url.trim().to_string(),
            port: cli.port,
            path: cli.path.trim().to_string(),
            poll_interval: Duration::from_millis(cli.interval_ms),
            title: cli.title.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}
