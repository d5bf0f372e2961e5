use thiserror::Error;

/// Banner shown when the first load fails. There is no automatic retry.
pub const INIT_FAILURE_BANNER: &str = "Failed to load data. Please try refreshing.";

/// A single failed GET attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Every attempt for one URL failed; carries the last cause.
#[derive(Debug, Error)]
#[error("{url}: giving up after {attempts} attempts: {source}")]
pub struct FetchExhausted {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub source: FetchError,
}

/// Failure of one poll cycle (summary plus any history shards).
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchExhausted),
    #[error("history shard task failed: {0}")]
    Join(String),
}

/// Any unrecovered error during the first load.
#[derive(Debug, Error)]
#[error("initialization failed: {0}")]
pub struct InitError(#[from] pub PollError);

/// An `info` string without the delimiter its result kind requires. Always
/// recovered by the caller with an empty detail.
#[derive(Debug, Error)]
#[error("{kind} info {info:?} has no {delimiter:?} delimiter")]
pub struct MalformedInfoField {
    pub kind: &'static str,
    pub info: String,
    pub delimiter: &'static str,
}
