//! The dashboard context: latest snapshot, accumulated history, view state and
//! the transient UI bits around them. The UI loop is its only writer.

use crate::config::DashboardConfig;
use crate::history::HistoryStore;
use crate::model::{BuildResult, BuilderStatus, SummarySnapshot};
use crate::poller::PollSnapshot;
use crate::state::{StatusFilter, Tab, UiEvent, ViewState};
use crate::view::{self, ReportRow};
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub const NOTIFICATION_TTL_SECS: u64 = 5;
/// Must match the length of `BRAILLE_FRAMES` in `tui::spinner`.
pub const SPINNER_FRAME_COUNT: usize = 10;
pub const ERROR_TTL_SECS: u64 = 10;
/// Below 80 cols the report drops its secondary columns.
pub const NARROW_WIDTH_THRESHOLD: u16 = 80;
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
}

/// What changed about the build run with one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollTransition {
    pub active: bool,
    pub started: bool,
    pub completed: bool,
    pub forced_tab: Option<Tab>,
}

pub struct Dashboard {
    pub config: DashboardConfig,
    pub version_string: String,

    pub summary: SummarySnapshot,
    pub history: HistoryStore,
    pub view: ViewState,
    /// Projection of `history` under `view`; rebuilt on every change to either.
    pub rows: Vec<ReportRow>,

    pub report_cursor: usize,
    pub builder_cursor: usize,
    /// Search text from before the current edit, restored on cancel.
    search_backup: Option<String>,

    // Polling
    pub polling: bool,
    /// Generation of the current poller; events from older ones are stale.
    pub poll_generation: u64,
    /// When the running poller fetches next: one interval after a success,
    /// the backoff delay after a failure.
    pub next_poll_due: Option<Instant>,
    pub last_updated: Option<DateTime<Local>>,
    /// Last poll failure while the previous snapshot is still shown.
    pub degraded: Option<String>,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    pub spinner_frame: usize,
    pub loading_count: u16,
    pub should_quit: bool,
    pub desktop_notify: bool,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            version_string: String::new(),
            summary: SummarySnapshot::default(),
            history: HistoryStore::new(),
            view: ViewState::default(),
            rows: Vec::new(),
            report_cursor: 0,
            builder_cursor: 0,
            search_backup: None,
            polling: false,
            poll_generation: 0,
            next_poll_due: None,
            last_updated: None,
            degraded: None,
            notifications: Vec::new(),
            error: None,
            spinner_frame: 0,
            loading_count: 0,
            should_quit: false,
            desktop_notify: true,
        }
    }

    /// Folds one poll result into the dashboard and reconciles the tab.
    pub fn apply_snapshot(&mut self, snapshot: PollSnapshot) -> PollTransition {
        let PollSnapshot { summary, history } = snapshot;
        if let Some(shards) = history {
            self.history.replace(shards);
        }

        let was_active = self.view.build_in_progress;
        let active = summary.any_builder_active();
        let forced_tab = self.view.observe_builders(active);
        if let Some(tab) = forced_tab {
            tracing::info!(tab = tab.title(), "switched tab on build state change");
        }

        self.summary = summary;
        self.degraded = None;
        self.next_poll_due = Some(Instant::now() + self.config.poll_interval);
        self.last_updated = Some(Local::now());
        self.clamp_builder_cursor();
        self.refresh_rows();

        PollTransition {
            active,
            started: active && !was_active,
            completed: was_active && !active,
            forced_tab,
        }
    }

    pub fn record_poll_failure(&mut self, message: String, retry_in: Duration) {
        self.degraded = Some(message);
        self.next_poll_due = Some(Instant::now() + retry_in);
    }

    /// Starts a new poller generation. Events tagged with any earlier
    /// generation are dropped from now on.
    pub fn next_poll_generation(&mut self) -> u64 {
        self.poll_generation = self.poll_generation.wrapping_add(1);
        self.poll_generation
    }

    fn is_current_poll(&self, generation: u64) -> bool {
        if generation == self.poll_generation {
            return true;
        }
        tracing::debug!(
            generation,
            current = self.poll_generation,
            "dropping event from a replaced poller"
        );
        false
    }

    /// Applies a poll result from the current poller. `None` when it came
    /// from a replaced one.
    pub fn accept_poll_result(
        &mut self,
        generation: u64,
        snapshot: PollSnapshot,
    ) -> Option<PollTransition> {
        if !self.is_current_poll(generation) {
            return None;
        }
        self.end_loading();
        self.clear_error();
        Some(self.apply_snapshot(snapshot))
    }

    /// Marks the view stale and raises a toast for a failure of the current
    /// poller. Returns false for a replaced one.
    pub fn accept_poll_failure(
        &mut self,
        generation: u64,
        message: String,
        retry_in: Duration,
    ) -> bool {
        if !self.is_current_poll(generation) {
            return false;
        }
        self.end_loading();
        self.set_error(format!(
            "Poll failed, retrying in {}s",
            retry_in.as_secs().max(1)
        ));
        self.record_poll_failure(message, retry_in);
        true
    }

    pub fn handle(&mut self, event: UiEvent) {
        self.view.apply(event);
        self.refresh_rows();
    }

    /// Re-derives the report rows, keeping the selection on the same record
    /// when it is still visible.
    pub fn refresh_rows(&mut self) {
        let selected = self.selected_row().map(|row| row.original_index);
        self.rows = view::project(self.history.all_records(), &self.view);
        self.report_cursor = selected
            .and_then(|idx| self.rows.iter().position(|row| row.original_index == idx))
            .unwrap_or_else(|| self.report_cursor.min(self.rows.len().saturating_sub(1)));
    }

    // --- Selection ---

    pub fn selected_row(&self) -> Option<&ReportRow> {
        self.rows.get(self.report_cursor)
    }

    pub fn selected_builder(&self) -> Option<&BuilderStatus> {
        self.summary.builders.get(self.builder_cursor)
    }

    fn clamp_builder_cursor(&mut self) {
        self.builder_cursor = self
            .builder_cursor
            .min(self.summary.builders.len().saturating_sub(1));
    }

    fn active_list_len(&self) -> usize {
        match self.view.active_tab {
            Tab::BuildersProgress => self.summary.builders.len(),
            Tab::BuildReport => self.rows.len(),
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.view.active_tab {
            Tab::BuildersProgress => &mut self.builder_cursor,
            Tab::BuildReport => &mut self.report_cursor,
        }
    }

    pub fn move_cursor_up(&mut self, amount: usize) {
        let cursor = self.cursor_mut();
        *cursor = cursor.saturating_sub(amount);
    }

    pub fn move_cursor_down(&mut self, amount: usize) {
        let last = self.active_list_len().saturating_sub(1);
        let cursor = self.cursor_mut();
        *cursor = (*cursor + amount).min(last);
    }

    pub fn cursor_to_top(&mut self) {
        *self.cursor_mut() = 0;
    }

    pub fn cursor_to_bottom(&mut self) {
        let last = self.active_list_len().saturating_sub(1);
        *self.cursor_mut() = last;
    }

    // --- Filters ---

    pub fn select_tab(&mut self, tab: Tab) {
        self.handle(UiEvent::TabSelected(tab));
    }

    pub fn next_tab(&mut self) {
        self.select_tab(self.view.active_tab.next());
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.handle(UiEvent::StatusFilterChanged(filter));
    }

    pub fn cycle_status_filter(&mut self) {
        let next = self.view.status_filter.cycle();
        self.set_status_filter(next);
    }

    pub fn toggle_sort(&mut self) {
        self.handle(UiEvent::SortToggled);
    }

    pub fn set_search(&mut self, text: String) {
        self.handle(UiEvent::SearchChanged(text));
    }

    /// Narrows the report to one builder's rows, like clicking its ID.
    pub fn filter_by_builder(&mut self, id: u64) {
        self.set_search(format!("[{id}]"));
        if self.view.active_tab != Tab::BuildReport {
            self.select_tab(Tab::BuildReport);
        }
    }

    pub fn filter_by_origin(&mut self, origin: &str) {
        self.set_search(origin.to_string());
    }

    /// Acts on the current selection of whichever tab is shown.
    pub fn filter_selection(&mut self) {
        match self.view.active_tab {
            Tab::BuildersProgress => {
                if let Some(id) = self.selected_builder().map(|b| b.id) {
                    self.filter_by_builder(id);
                }
            }
            Tab::BuildReport => {
                if let Some(origin) = self.selected_row().map(|r| r.record.origin.clone()) {
                    self.filter_by_origin(&origin);
                }
            }
        }
    }

    // --- Search editing ---

    pub fn is_editing_search(&self) -> bool {
        self.search_backup.is_some()
    }

    pub fn start_search(&mut self) {
        self.search_backup = Some(self.view.search.clone());
    }

    pub fn push_search_char(&mut self, c: char) {
        let mut text = self.view.search.clone();
        text.push(c);
        self.set_search(text);
    }

    pub fn pop_search_char(&mut self) {
        let mut text = self.view.search.clone();
        text.pop();
        self.set_search(text);
    }

    pub fn commit_search(&mut self) {
        self.search_backup = None;
    }

    pub fn cancel_search(&mut self) {
        if let Some(previous) = self.search_backup.take() {
            self.set_search(previous);
        }
    }

    // --- Links ---

    /// Origin of the selected row when that row links to a log file.
    pub fn selected_log_origin(&self) -> Option<&str> {
        match self.view.active_tab {
            Tab::BuildReport => self
                .selected_row()
                .filter(|row| row.information.log_path().is_some())
                .map(|row| row.record.origin.as_str()),
            Tab::BuildersProgress => self.selected_builder().and_then(|b| b.origin.as_deref()),
        }
    }

    pub fn selected_origin(&self) -> Option<&str> {
        match self.view.active_tab {
            Tab::BuildReport => self.selected_row().map(|row| row.record.origin.as_str()),
            Tab::BuildersProgress => self.selected_builder().and_then(|b| b.origin.as_deref()),
        }
    }

    // --- Polling ---

    /// Seconds until the poller's next regular poll, while it is running.
    pub fn next_poll_in(&self) -> Option<u64> {
        if !self.polling {
            return None;
        }
        let due = self.next_poll_due?;
        Some(due.saturating_duration_since(Instant::now()).as_secs())
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// One-line summary of the finished run for notifications.
    pub fn completion_message(&self) -> String {
        let stats = self.summary.stats.clone().unwrap_or_default();
        format!(
            "Build complete: {} built, {} failed, {} ignored, {} skipped",
            stats.count(&BuildResult::Built),
            stats.count(&BuildResult::Failed),
            stats.count(&BuildResult::Ignored),
            stats.count(&BuildResult::Skipped),
        )
    }

    // --- Transient UI ---

    pub fn is_loading(&self) -> bool {
        self.loading_count > 0
    }

    pub fn begin_loading(&mut self) {
        self.loading_count = self.loading_count.saturating_add(1);
    }

    pub fn end_loading(&mut self) {
        self.loading_count = self.loading_count.saturating_sub(1);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn add_notification(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }
}
