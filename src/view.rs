//! Projection of the history log into report rows.
//!
//! Rows are annotated with their discovery order before any filtering, so a
//! row's `original_index` is the same whatever filter, search or sort is
//! applied. Projection never touches the records it reads.

use crate::error::MalformedInfoField;
use crate::model::{BuildResult, BuildResultRecord};
use crate::state::{SortDirection, ViewState};
use std::cmp::Reverse;
use std::fmt;

const FAILED_DELIMITER: &str = ":";
/// Ignore reasons are free text and may contain single colons.
const IGNORED_DELIMITER: &str = ":|:";

/// Headline of the "information" column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Information {
    MetaComplete,
    LogFile { path: String },
    FailedPhase { phase: String, path: String },
    Issue(String),
    Ignored(String),
    Unknown,
}

impl Information {
    /// Relative log path for rows that link to one.
    pub fn log_path(&self) -> Option<&str> {
        match self {
            Information::LogFile { path } | Information::FailedPhase { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Information::MetaComplete => f.write_str("meta-node complete."),
            Information::LogFile { .. } => f.write_str("logfile"),
            Information::FailedPhase { phase, .. } => write!(f, "Failed {phase} phase (logfile)"),
            Information::Issue(info) => write!(f, "Issue with {info}"),
            Information::Ignored(reason) => f.write_str(reason),
            Information::Unknown => f.write_str("??"),
        }
    }
}

/// `(category, name)` of `category/name[@variant]`, variant stripped. An origin
/// without a category yields an empty category.
pub fn split_origin(origin: &str) -> (&str, &str) {
    let (category, name) = origin.split_once('/').unwrap_or(("", origin));
    let name = name.split_once('@').map_or(name, |(port, _)| port);
    (category, name)
}

/// `www/nginx@php81` → `../www___nginx.log`.
pub fn log_file_path(origin: &str) -> String {
    let (category, name) = split_origin(origin);
    format!("../{category}___{name}.log")
}

pub fn freshports_url(origin: &str) -> String {
    let (category, name) = split_origin(origin);
    format!("https://www.freshports.org/{category}/{name}")
}

fn split_info<'a>(
    kind: &'static str,
    info: &'a str,
    delimiter: &'static str,
) -> Result<(&'a str, &'a str), MalformedInfoField> {
    info.split_once(delimiter).ok_or_else(|| MalformedInfoField {
        kind,
        info: info.to_string(),
        delimiter,
    })
}

/// Head and detail of a `failed`/`ignored` info field. A missing delimiter
/// keeps the whole text as head and leaves the detail empty.
fn head_and_detail<'a>(kind: &'static str, info: &'a str, delimiter: &'static str) -> (&'a str, &'a str) {
    split_info(kind, info, delimiter).unwrap_or_else(|e| {
        tracing::debug!("{e}");
        (info, "")
    })
}

pub fn information(record: &BuildResultRecord) -> Information {
    match &record.result {
        BuildResult::Meta => Information::MetaComplete,
        BuildResult::Built => Information::LogFile {
            path: log_file_path(&record.origin),
        },
        BuildResult::Failed => {
            let (phase, _) = head_and_detail("failed", &record.info, FAILED_DELIMITER);
            Information::FailedPhase {
                phase: phase.to_string(),
                path: log_file_path(&record.origin),
            }
        }
        BuildResult::Skipped => Information::Issue(record.info.clone()),
        BuildResult::Ignored => {
            let (reason, _) = head_and_detail("ignored", &record.info, IGNORED_DELIMITER);
            Information::Ignored(reason.to_string())
        }
        BuildResult::Other(_) => Information::Unknown,
    }
}

/// Detail column: failure details or the skip reason of an ignored port.
pub fn skip_info(record: &BuildResultRecord) -> String {
    let detail = match record.result {
        BuildResult::Failed => head_and_detail("failed", &record.info, FAILED_DELIMITER).1,
        BuildResult::Ignored => head_and_detail("ignored", &record.info, IGNORED_DELIMITER).1,
        _ => "",
    };
    detail.to_string()
}

/// Leading digits of the detail of `failed`/`ignored` rows; 0 otherwise.
pub fn skip_count(record: &BuildResultRecord) -> u64 {
    if !matches!(record.result, BuildResult::Failed | BuildResult::Ignored) {
        return 0;
    }
    let detail = skip_info(record);
    let digits: String = detail
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// 1-based discovery order in the unfiltered log.
    pub original_index: usize,
    pub record: BuildResultRecord,
    pub information: Information,
    pub skip_info: String,
    pub skip_count: u64,
}

impl ReportRow {
    pub fn new(original_index: usize, record: &BuildResultRecord) -> Self {
        Self {
            original_index,
            information: information(record),
            skip_info: skip_info(record),
            skip_count: skip_count(record),
            record: record.clone(),
        }
    }

    pub fn entry_cell(&self) -> String {
        self.record
            .entry
            .map_or_else(|| self.original_index.to_string(), |e| e.to_string())
    }

    pub fn builder_cell(&self) -> String {
        format!("[{}]", self.record.id)
    }

    /// Lowercased text of every displayed cell except the result badge.
    pub fn search_text(&self) -> String {
        [
            self.entry_cell(),
            self.record.elapsed.clone(),
            self.builder_cell(),
            self.record.origin.clone(),
            self.information.to_string(),
            self.skip_info.clone(),
            self.record.duration.clone(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

pub fn project(records: &[BuildResultRecord], view: &ViewState) -> Vec<ReportRow> {
    let needle = view.search.trim().to_lowercase();
    let mut rows: Vec<ReportRow> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| view.status_filter.matches(&record.result))
        .map(|(i, record)| ReportRow::new(i + 1, record))
        .filter(|row| needle.is_empty() || row.search_text().contains(&needle))
        .collect();

    match view.sort {
        Some(SortDirection::Ascending) => rows.sort_by_key(|row| row.skip_count),
        Some(SortDirection::Descending) => rows.sort_by_key(|row| Reverse(row.skip_count)),
        None => {}
    }
    rows
}
