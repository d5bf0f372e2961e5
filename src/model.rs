//! Wire types for the Synth report API (`summary.json`, `NN_history.json`).
//!
//! The report generator is loose about scalar types: the same field shows up
//! as `"ID": "03"` in one file and `"ID": 3` in another, and `active` may be a
//! number or a boolean. Every scalar goes through one of the lenient decoders
//! in [`de`]. Anything that still does not fit is a decode error, which the
//! fetcher counts as a failed attempt.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Outcome of one port build as reported in the history shards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildResult {
    Built,
    Failed,
    Skipped,
    Ignored,
    Meta,
    Other(String),
}

impl BuildResult {
    /// Every known result kind, in the order the stats badges list them.
    pub const KNOWN: [BuildResult; 5] = [
        BuildResult::Built,
        BuildResult::Meta,
        BuildResult::Failed,
        BuildResult::Ignored,
        BuildResult::Skipped,
    ];

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "built" => Self::Built,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "ignored" => Self::Ignored,
            "meta" => Self::Meta,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Built => "built",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Ignored => "ignored",
            Self::Meta => "meta",
            Self::Other(raw) => raw,
        }
    }

    /// Case-insensitive comparison, so `Other("FAILED")` matches `Failed`.
    pub fn matches(&self, other: &BuildResult) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One row of build history. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildResultRecord {
    #[serde(rename = "ID", alias = "id", deserialize_with = "de::number")]
    pub id: u64,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub entry: Option<u64>,
    pub origin: String,
    pub result: BuildResult,
    #[serde(default, deserialize_with = "de::text")]
    pub info: String,
    #[serde(default, deserialize_with = "de::text")]
    pub elapsed: String,
    #[serde(default, deserialize_with = "de::text")]
    pub duration: String,
}

/// A builder's pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active(String),
}

impl Phase {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("idle") {
            Self::Idle
        } else {
            Self::Active(trimmed.to_string())
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Active(name) => name,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = de::text(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuilderStatus {
    #[serde(rename = "ID", alias = "id", deserialize_with = "de::number")]
    pub id: u64,
    #[serde(default, deserialize_with = "de::text")]
    pub elapsed: String,
    pub phase: Phase,
    /// Port currently being processed; `None` while idle.
    #[serde(default, deserialize_with = "de::optional_text")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub lines: String,
}

/// Aggregate counters plus the free-form secondary metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Stats {
    #[serde(default, deserialize_with = "de::number")]
    pub queued: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub built: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub meta: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub failed: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub ignored: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub skipped: u64,
    #[serde(default, deserialize_with = "de::text")]
    pub remains: String,
    #[serde(default, deserialize_with = "de::text")]
    pub load: String,
    #[serde(default, deserialize_with = "de::text")]
    pub swapinfo: String,
    #[serde(default, deserialize_with = "de::text")]
    pub elapsed: String,
    #[serde(default, deserialize_with = "de::text")]
    pub pkghour: String,
    #[serde(default, deserialize_with = "de::text")]
    pub impulse: String,
}

impl Stats {
    pub fn count(&self, result: &BuildResult) -> u64 {
        match result {
            BuildResult::Built => self.built,
            BuildResult::Failed => self.failed,
            BuildResult::Skipped => self.skipped,
            BuildResult::Ignored => self.ignored,
            BuildResult::Meta => self.meta,
            BuildResult::Other(_) => 0,
        }
    }

    /// Denominator of the progress bar: everything finished plus the queue.
    pub fn total(&self) -> u64 {
        self.queued + self.built + self.meta + self.failed + self.ignored + self.skipped
    }

    /// Secondary metrics as `(label, value)` pairs in display order.
    pub fn secondary(&self) -> [(&'static str, &str); 6] {
        [
            ("Remains", &self.remains),
            ("Load", &self.load),
            ("Swapinfo", &self.swapinfo),
            ("Elapsed", &self.elapsed),
            ("Pkghour", &self.pkghour),
            ("Impulse", &self.impulse),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SummarySnapshot {
    #[serde(default, deserialize_with = "de::text")]
    pub profile: String,
    #[serde(default, deserialize_with = "de::text")]
    pub kickoff: String,
    #[serde(default, deserialize_with = "de::flag")]
    pub active: bool,
    #[serde(default, deserialize_with = "de::number")]
    pub kfiles: usize,
    #[serde(default)]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub builders: Vec<BuilderStatus>,
}

impl SummarySnapshot {
    /// A build is in progress while any builder is outside `Idle`.
    pub fn any_builder_active(&self) -> bool {
        self.builders.iter().any(|b| !b.phase.is_idle())
    }
}

/// Lenient scalar decoders used by the wire types above.
pub mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::fmt;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Number(serde_json::Number),
        Text(String),
    }

    impl Scalar {
        fn as_u64(&self) -> Option<u64> {
            match self {
                Scalar::Number(n) => n.as_u64(),
                Scalar::Text(s) => s.trim().parse().ok(),
                Scalar::Bool(_) => None,
            }
        }
    }

    impl fmt::Display for Scalar {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Scalar::Bool(b) => write!(f, "{b}"),
                Scalar::Number(n) => write!(f, "{n}"),
                Scalar::Text(s) => f.write_str(s),
            }
        }
    }

    /// Non-negative integer sent either as a JSON number or a numeric string.
    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let raw = Scalar::deserialize(deserializer)?;
        let n = raw
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {raw:?}")))?;
        T::try_from(n).map_err(|_| D::Error::custom(format!("{n} is out of range")))
    }

    /// Like [`number`], with `null` and `""` mapping to `None`.
    pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .as_u64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {raw:?}"))),
        }
    }

    /// Any scalar rendered as display text; `null` becomes the empty string.
    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Scalar>::deserialize(deserializer)?
            .map(|raw| raw.to_string())
            .unwrap_or_default())
    }

    /// Like [`text`], with blank values mapping to `None`.
    pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = text(deserializer)?;
        Ok(if value.trim().is_empty() { None } else { Some(value) })
    }

    /// Boolean-as-int: `1`, `true`, `"1"` and `"true"` are set, the rest unset.
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Scalar>::deserialize(deserializer)? {
            None => false,
            Some(Scalar::Bool(b)) => b,
            Some(Scalar::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Scalar::Text(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s.parse::<i64>().is_ok_and(|v| v != 0)
            }
        })
    }

    impl fmt::Debug for Scalar {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Scalar::Text(s) => write!(f, "{s:?}"),
                other => write!(f, "{other}"),
            }
        }
    }
}
