//! HTTP GET with a bounded retry budget.
//!
//! Attempts run back to back with no delay. A transport error, a non-2xx
//! status and an undecodable body all count as a failed attempt; each one is
//! logged so operators can see flapping endpoints even when a later attempt
//! succeeds.

use crate::error::{FetchError, FetchExhausted};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// One GET request. Implementations return the body of a 2xx response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("synthw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    max_attempts: u32,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Budget of at least one attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn fetch_json<T>(&self, url: &str) -> Result<T, FetchExhausted>
    where
        T: DeserializeOwned + Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.transport.get(url).await {
                Ok(body) => match serde_json::from_str::<T>(&body) {
                    Ok(value) => return Ok(value),
                    Err(e) => FetchError::from(e),
                },
                Err(e) => e,
            };
            tracing::warn!(url = %url, attempt, max_attempts = self.max_attempts, "fetch attempt failed: {error}");
            if attempt >= self.max_attempts {
                return Err(FetchExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }
        }
    }
}

/// Scripted in-memory transport for tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::Transport;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub(crate) enum Reply {
        Body(String),
        Status(u16),
        Down,
    }

    /// Replies are keyed by the last path segment (`summary.json`,
    /// `01_history.json`), ignoring the query. The final reply of each queue
    /// repeats forever.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        routes: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub(crate) fn route(&self, file: &str, replies: impl IntoIterator<Item = Reply>) {
            self.routes
                .lock()
                .unwrap()
                .insert(file.to_string(), replies.into_iter().collect());
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn calls_to(&self, file: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == file).count()
        }
    }

    fn file_of(url: &str) -> String {
        let path = url.split('?').next().unwrap_or(url);
        path.rsplit('/').next().unwrap_or(path).to_string()
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &str) -> Result<String, FetchError> {
            let file = file_of(url);
            self.calls.lock().unwrap().push(file.clone());
            let reply = {
                let mut routes = self.routes.lock().unwrap();
                match routes.get_mut(&file) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };
            match reply {
                Some(Reply::Body(body)) => Ok(body),
                Some(Reply::Status(code)) => Err(FetchError::Status(code)),
                Some(Reply::Down) | None => Err(FetchError::Transport("connection refused".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeTransport, Reply};
    use super::*;

    const URL: &str = "https://example.org/Report/summary.json?t=1";

    fn fetcher(transport: &Arc<FakeTransport>) -> RetryingFetcher {
        RetryingFetcher::new(transport.clone())
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let transport = Arc::new(FakeTransport::default());
        transport.route("summary.json", [Reply::Body(r#"{"a": 1}"#.to_string())]);
        let value: serde_json::Value = fetcher(&transport).fetch_json(URL).await.unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(transport.calls_to("summary.json"), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let transport = Arc::new(FakeTransport::default());
        transport.route(
            "summary.json",
            [Reply::Status(502), Reply::Down, Reply::Body("[1, 2]".to_string())],
        );
        let value: Vec<u32> = fetcher(&transport).fetch_json(URL).await.unwrap();
        assert_eq!(value, vec![1, 2]);
        assert_eq!(transport.calls_to("summary.json"), 3);
    }

    #[tokio::test]
    async fn exhausted_carries_last_cause() {
        let transport = Arc::new(FakeTransport::default());
        transport.route("summary.json", [Reply::Down, Reply::Status(404)]);
        let err = fetcher(&transport)
            .fetch_json::<serde_json::Value>(URL)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.url, URL);
        assert!(matches!(err.source, FetchError::Status(404)));
        assert_eq!(transport.calls_to("summary.json"), 3);
    }

    #[tokio::test]
    async fn undecodable_body_counts_as_failure() {
        let transport = Arc::new(FakeTransport::default());
        transport.route("summary.json", [Reply::Body("<html>".to_string())]);
        let err = fetcher(&transport)
            .with_max_attempts(2)
            .fetch_json::<serde_json::Value>(URL)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert!(matches!(err.source, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn zero_budget_still_tries_once() {
        let transport = Arc::new(FakeTransport::default());
        let fetcher = fetcher(&transport).with_max_attempts(0);
        assert_eq!(fetcher.max_attempts(), 1);
        assert!(fetcher.fetch_json::<serde_json::Value>(URL).await.is_err());
        assert_eq!(transport.calls().len(), 1);
    }
}
