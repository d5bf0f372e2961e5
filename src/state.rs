//! Session view state: what the user chose to look at, kept across polls.
//!
//! Only [`ViewState::apply`] (user events) and [`ViewState::observe_builders`]
//! (poll reconciliation) mutate it. The view engine reads it as plain input.

use crate::model::BuildResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    BuildersProgress,
    #[default]
    BuildReport,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::BuildersProgress, Tab::BuildReport];

    pub fn title(self) -> &'static str {
        match self {
            Tab::BuildersProgress => "Builders progress",
            Tab::BuildReport => "Build report",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Tab::BuildersProgress => Tab::BuildReport,
            Tab::BuildReport => Tab::BuildersProgress,
        }
    }
}

/// Result filter on the build report. `All` is a dedicated sentinel, never a
/// result kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(BuildResult),
}

impl StatusFilter {
    /// Maps a stats badge label to a filter. The `queued` badge has no rows of
    /// its own and clears the filter, like `all`.
    pub fn from_badge(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("all") || label.eq_ignore_ascii_case("queued") {
            StatusFilter::All
        } else {
            StatusFilter::Only(BuildResult::parse(label))
        }
    }

    pub fn matches(&self, result: &BuildResult) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted.matches(result),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(result) => result.as_str(),
        }
    }

    /// Steps through `all` and then every known result kind in badge order.
    pub fn cycle(&self) -> Self {
        let known = &BuildResult::KNOWN;
        match self {
            StatusFilter::All => StatusFilter::Only(known[0].clone()),
            StatusFilter::Only(current) => known
                .iter()
                .position(|r| r.matches(current))
                .and_then(|i| known.get(i + 1))
                .map_or(StatusFilter::All, |next| StatusFilter::Only(next.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Unsorted → ascending → descending → unsorted.
pub fn next_sort(current: Option<SortDirection>) -> Option<SortDirection> {
    match current {
        None => Some(SortDirection::Ascending),
        Some(SortDirection::Ascending) => Some(SortDirection::Descending),
        Some(SortDirection::Descending) => None,
    }
}

/// Semantic UI events, independent of any key or widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    StatusFilterChanged(StatusFilter),
    SortToggled,
    SearchChanged(String),
    TabSelected(Tab),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub status_filter: StatusFilter,
    pub sort: Option<SortDirection>,
    pub search: String,
    /// Set by a manual tab change; suppresses the next automatic switch.
    pub user_navigated_away: bool,
    pub build_in_progress: bool,
    pub active_tab: Tab,
}

impl ViewState {
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::StatusFilterChanged(filter) => {
                self.status_filter = filter;
                if self.active_tab != Tab::BuildReport {
                    self.navigate(Tab::BuildReport);
                }
            }
            UiEvent::SortToggled => self.sort = next_sort(self.sort),
            UiEvent::SearchChanged(text) => self.search = text,
            UiEvent::TabSelected(tab) => self.navigate(tab),
        }
    }

    fn navigate(&mut self, tab: Tab) {
        self.active_tab = tab;
        self.user_navigated_away = true;
    }

    /// Reconciles the tab with the builders' activity from the latest poll.
    ///
    /// Returns the tab that was force-selected, if any. An active build pulls
    /// the view to the builders; a build that just finished pulls it to the
    /// report. After a manual tab change the next start/finish transition is
    /// swallowed instead and clears the suppression.
    pub fn observe_builders(&mut self, active: bool) -> Option<Tab> {
        let was_active = self.build_in_progress;
        self.build_in_progress = active;
        let transition = active != was_active;

        let target = if active {
            Tab::BuildersProgress
        } else if was_active {
            Tab::BuildReport
        } else {
            return None;
        };

        if self.user_navigated_away {
            if transition {
                self.user_navigated_away = false;
            }
            return None;
        }
        if self.active_tab == target {
            return None;
        }
        self.active_tab = target;
        Some(target)
    }
}
