
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use fixtures::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use synthw::dashboard::Dashboard;
use synthw::events::AppEvent;
use synthw::fetch::RetryingFetcher;
use synthw::history::HistoryStore;
use synthw::input::{map_key, Action, InputContext};
use synthw::model::{BuildResult, BuildResultRecord, SummarySnapshot};
use synthw::poller::{fetch_snapshot, PollExit, Poller};
use synthw::source::{Endpoint, SnapshotSource};
use synthw::state::{SortDirection, StatusFilter, Tab, UiEvent, ViewState};
use synthw::view::{self, project, Information};
use tokio::sync::{mpsc, watch};

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn context(state: &Dashboard) -> InputContext {
    InputContext {
        has_error: state.error.is_some(),
        is_loading: state.is_loading(),
        editing_search: state.is_editing_search(),
    }
}

/// Feeds keys through the keymap into the dashboard, like the UI loop does.
fn type_keys(state: &mut Dashboard, keys: &[KeyCode]) {
    for code in keys {
        match map_key(press(*code), &context(state)) {
            Action::MoveUp => state.move_cursor_up(1),
            Action::MoveDown => state.move_cursor_down(1),
            Action::ScrollToTop => state.cursor_to_top(),
            Action::ScrollToBottom => state.cursor_to_bottom(),
            Action::NextTab => state.next_tab(),
            Action::SelectTab(tab) => state.select_tab(tab),
            Action::CycleStatus => state.cycle_status_filter(),
            Action::ClearStatus => state.set_status_filter(StatusFilter::All),
            Action::ToggleSort => state.toggle_sort(),
            Action::StartSearch => state.start_search(),
            Action::SearchInput(c) => state.push_search_char(c),
            Action::SearchBackspace => state.pop_search_char(),
            Action::SearchCommit => state.commit_search(),
            Action::SearchCancel => state.cancel_search(),
            Action::ClearSearch => state.set_search(String::new()),
            Action::FilterSelection => state.filter_selection(),
            other => panic!("unexpected action in test: {other:?}"),
        }
    }
}

fn decoded_history() -> Vec<Vec<BuildResultRecord>> {
    vec![
        serde_json::from_str(&shard_one_json()).unwrap(),
        serde_json::from_str(&shard_two_json()).unwrap(),
    ]
}

fn origins(rows: &[view::ReportRow]) -> Vec<&str> {
    rows.iter().map(|r| r.record.origin.as_str()).collect()
}

// ========== Data flow tests ==========

#[test]
fn full_flow_json_to_report_rows() {
    // Step 1: decode the summary and both shards from wire JSON
    let summary: SummarySnapshot = serde_json::from_str(&summary_json(2, "build")).unwrap();
    assert_eq!(summary.kfiles, 2);
    assert!(summary.active);
    assert!(summary.any_builder_active());
    assert_eq!(summary.builders[1].origin, None);
    let stats = summary.stats.as_ref().unwrap();
    assert_eq!(stats.total(), 48);

    // Step 2: ingest shards out of order; discovery order is shard order
    let mut history = HistoryStore::new();
    let shards = decoded_history();
    history.ingest(2, shards[1].clone());
    history.ingest(1, shards[0].clone());
    assert_eq!(history.len(), 6);
    assert_eq!(history.observed_kfiles(), Some(2));
    assert!(!history.needs_refresh(2));
    assert!(history.needs_refresh(3));

    // Step 3: project with no filters keeps discovery order
    let view = ViewState::default();
    let rows = project(history.all_records(), &view);
    let indices: Vec<usize> = rows.iter().map(|r| r.original_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);

    // Step 4: annotations come from the info field
    assert_eq!(rows[1].information.to_string(), "Failed stage phase (logfile)");
    assert_eq!(rows[1].information.log_path(), Some("../www___nginx.log"));
    assert_eq!(rows[2].information, Information::Issue("www/nginx@php81".to_string()));
    assert_eq!(rows[3].information.to_string(), "BROKEN: no arch");
    assert_eq!(rows[3].skip_count, 12);
    assert_eq!(rows[4].information.to_string(), "meta-node complete.");
}

#[test]
fn filter_search_and_sort_keep_original_indices() {
    let mut history = HistoryStore::new();
    history.replace(decoded_history());
    let records_before = history.all_records().to_vec();

    let mut view = ViewState::default();
    view.apply(UiEvent::StatusFilterChanged(StatusFilter::Only(BuildResult::Built)));
    let rows = project(history.all_records(), &view);
    assert_eq!(origins(&rows), vec!["devel/gmake", "lang/rust"]);
    assert_eq!(rows[1].original_index, 6);

    view.apply(UiEvent::StatusFilterChanged(StatusFilter::All));
    view.apply(UiEvent::SearchChanged("NGINX".to_string()));
    let rows = project(history.all_records(), &view);
    // The skipped row mentions nginx in its information column
    assert_eq!(origins(&rows), vec!["www/nginx@php81", "www/php-fpm"]);

    view.apply(UiEvent::SearchChanged(String::new()));
    view.apply(UiEvent::SortToggled);
    view.apply(UiEvent::SortToggled);
    assert_eq!(view.sort, Some(SortDirection::Descending));
    let rows = project(history.all_records(), &view);
    let indices: Vec<usize> = rows.iter().map(|r| r.original_index).collect();
    assert_eq!(indices, vec![4, 2, 1, 3, 5, 6]);

    // Projection is pure
    assert_eq!(project(history.all_records(), &view), rows);
    assert_eq!(history.all_records(), records_before.as_slice());
}

#[test]
fn urls_parse_and_carry_cache_bust() {
    let source = SnapshotSource::from_parts("https://farm.test/mirror", Some(8443), "/dports/logs/Report/");

    let summary = reqwest::Url::parse(&source.build_url(Endpoint::Summary)).unwrap();
    assert_eq!(summary.host_str(), Some("farm.test"));
    assert_eq!(summary.port(), Some(8443));
    assert_eq!(summary.path(), "/mirror/dports/logs/Report/summary.json");
    let stamp = summary
        .query_pairs()
        .find(|(k, _)| k == "t")
        .map(|(_, v)| v.parse::<i64>().unwrap())
        .unwrap();
    assert!(stamp > 0);

    let shard = reqwest::Url::parse(&source.build_url(Endpoint::History(7))).unwrap();
    assert_eq!(shard.path(), "/mirror/dports/logs/Report/07_history.json");

    let log = reqwest::Url::parse(&source.log_url("www/nginx@php81")).unwrap();
    assert_eq!(log.path(), "/mirror/dports/logs/www___nginx.log");
    assert_eq!(log.query(), None);

    assert_eq!(
        view::freshports_url("www/nginx@php81"),
        "https://www.freshports.org/www/nginx"
    );
}

// ========== Tab reconciliation ==========

#[test]
fn tab_follows_build_lifecycle() {
    let mut state = Dashboard::new(test_config());

    // Step 1: first snapshot is idle, report stays
    let t = state.apply_snapshot(idle_snapshot(Some(decoded_history())));
    assert_eq!(t.forced_tab, None);
    assert!(!t.started);
    assert_eq!(state.view.active_tab, Tab::BuildReport);
    assert_eq!(state.rows.len(), 6);

    // Step 2: a build starts, builders tab is forced once
    let t = state.apply_snapshot(active_snapshot(None));
    assert!(t.started);
    assert_eq!(t.forced_tab, Some(Tab::BuildersProgress));
    let t = state.apply_snapshot(active_snapshot(None));
    assert!(!t.started);
    assert_eq!(t.forced_tab, None);
    // History is kept when a poll carries none
    assert_eq!(state.history.len(), 6);

    // Step 3: build finishes, report is forced
    let t = state.apply_snapshot(idle_snapshot(None));
    assert!(t.completed);
    assert_eq!(t.forced_tab, Some(Tab::BuildReport));
    assert_eq!(state.view.active_tab, Tab::BuildReport);
}

#[test]
fn manual_tab_change_swallows_next_transition() {
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(active_snapshot(Some(decoded_history())));
    assert_eq!(state.view.active_tab, Tab::BuildersProgress);

    // Step 1: user moves to the report mid-build and stays there
    state.select_tab(Tab::BuildReport);
    assert_eq!(state.apply_snapshot(active_snapshot(None)).forced_tab, None);
    assert_eq!(state.view.active_tab, Tab::BuildReport);

    // Step 2: the finish transition is swallowed and clears the suppression
    let t = state.apply_snapshot(idle_snapshot(None));
    assert!(t.completed);
    assert_eq!(t.forced_tab, None);
    assert!(!state.view.user_navigated_away);

    // Step 3: the next build start switches again
    state.select_tab(Tab::BuildersProgress);
    state.select_tab(Tab::BuildReport);
    let t = state.apply_snapshot(active_snapshot(None));
    assert_eq!(t.forced_tab, None);
    let t = state.apply_snapshot(idle_snapshot(None));
    assert_eq!(t.forced_tab, None);
    let t = state.apply_snapshot(active_snapshot(None));
    assert_eq!(t.forced_tab, Some(Tab::BuildersProgress));
}

// ========== Keyboard flow ==========

#[test]
fn search_by_keyboard_then_cancel_restores() {
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(decoded_history())));

    type_keys(&mut state, &[KeyCode::Char('/'), KeyCode::Char('r'), KeyCode::Char('u')]);
    assert!(state.is_editing_search());
    assert_eq!(state.view.search, "ru");
    assert_eq!(origins(&state.rows), vec!["lang/rust"]);

    type_keys(&mut state, &[KeyCode::Esc]);
    assert!(!state.is_editing_search());
    assert_eq!(state.view.search, "");
    assert_eq!(state.rows.len(), 6);
}

#[test]
fn enter_on_builder_filters_report_by_builder_id() {
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(active_snapshot(Some(decoded_history())));
    assert_eq!(state.view.active_tab, Tab::BuildersProgress);

    // Builder 2 is second in the list
    type_keys(&mut state, &[KeyCode::Char('j'), KeyCode::Enter]);
    assert_eq!(state.view.active_tab, Tab::BuildReport);
    assert_eq!(state.view.search, "[2]");
    assert_eq!(origins(&state.rows), vec!["www/nginx@php81", "lang/php81"]);
}

#[test]
fn status_cycle_and_sort_by_keyboard() {
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(decoded_history())));

    type_keys(&mut state, &[KeyCode::Char('s'), KeyCode::Char('s')]);
    assert_eq!(state.rows[0].original_index, 4);
    type_keys(&mut state, &[KeyCode::Char('s')]);
    assert_eq!(state.view.sort, None);
    assert_eq!(state.rows[0].original_index, 1);

    type_keys(&mut state, &[KeyCode::Char('f')]);
    assert_ne!(state.view.status_filter, StatusFilter::All);
    type_keys(&mut state, &[KeyCode::Char('a')]);
    assert_eq!(state.view.status_filter, StatusFilter::All);
    assert_eq!(state.rows.len(), 6);
}

#[test]
fn selection_survives_filter_change() {
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(decoded_history())));

    type_keys(&mut state, &[KeyCode::Char('G')]);
    assert_eq!(state.selected_row().map(|r| r.original_index), Some(6));
    state.set_status_filter(StatusFilter::Only(BuildResult::Built));
    assert_eq!(state.selected_row().map(|r| r.original_index), Some(6));
    assert_eq!(state.selected_log_origin(), Some("lang/rust"));
}

// ========== Polling ==========

#[tokio::test]
async fn initial_snapshot_fetches_every_shard() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.serve("summary.json", [Scripted::Body(summary_json(2, "Idle"))]);
    transport.serve("01_history.json", [Scripted::Body(shard_one_json())]);
    transport.serve("02_history.json", [Scripted::Body(shard_two_json())]);
    let fetcher = Arc::new(RetryingFetcher::new(transport.clone()));
    let source = SnapshotSource::new(&test_config());

    let snapshot = fetch_snapshot(&fetcher, &source, None).await.unwrap();
    assert_eq!(snapshot.history, Some(decoded_history()));
    assert!(!snapshot.summary.any_builder_active());

    // Nothing new advertised: summary only
    let again = fetch_snapshot(&fetcher, &source, Some(2)).await.unwrap();
    assert_eq!(again.history, None);
    assert_eq!(transport.calls_to("01_history.json"), 1);
}

/// Applies every queued poller event the way the UI loop does. Returns the
/// forced tabs and the number of accepted failures.
fn drain_into(
    state: &mut Dashboard,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> (Vec<Tab>, usize) {
    let mut forced = Vec::new();
    let mut failures = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            AppEvent::PollResult {
                generation,
                snapshot,
            } => {
                if let Some(tab) = state
                    .accept_poll_result(generation, *snapshot)
                    .and_then(|t| t.forced_tab)
                {
                    forced.push(tab);
                }
            }
            AppEvent::PollFailed {
                generation,
                message,
                retry_in,
            } => {
                if state.accept_poll_failure(generation, message, retry_in) {
                    failures += 1;
                    assert!(state.degraded.is_some());
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    (forced, failures)
}

fn poller_for(
    transport: &Arc<ScriptedTransport>,
    state: &Dashboard,
    tx: mpsc::UnboundedSender<AppEvent>,
) -> Poller {
    let fetcher = Arc::new(RetryingFetcher::new(transport.clone()).with_max_attempts(1));
    let source = Arc::new(SnapshotSource::new(&test_config()));
    Poller::new(
        fetcher,
        source,
        Duration::from_millis(5),
        state.history.observed_kfiles(),
        tx,
    )
}

#[tokio::test]
async fn poller_drives_dashboard_until_build_finishes() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.serve(
        "summary.json",
        [
            Scripted::Body(summary_json(1, "build")),
            Scripted::Status(502),
            Scripted::Body(summary_json(2, "stage")),
            Scripted::Body(summary_json(2, "Idle")),
        ],
    );
    transport.serve("01_history.json", [Scripted::Body(shard_one_json())]);
    transport.serve("02_history.json", [Scripted::Body(shard_two_json())]);

    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(vec![decoded_history()[0].clone()])));
    let generation = state.next_poll_generation();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_shutdown, shutdown_rx) = watch::channel(false);
    let poller = poller_for(&transport, &state, tx).generation(generation);
    let exit = tokio::time::timeout(Duration::from_secs(5), poller.run(shutdown_rx))
        .await
        .unwrap();
    assert_eq!(exit, PollExit::Inactive);

    let (forced, failures) = drain_into(&mut state, &mut rx);
    assert_eq!(failures, 1);
    assert_eq!(forced, vec![Tab::BuildersProgress, Tab::BuildReport]);
    assert_eq!(state.degraded, None);
    assert_eq!(state.history.len(), 6);
    assert_eq!(transport.calls_to("02_history.json"), 1);
}

#[tokio::test]
async fn new_run_replaces_rows_of_the_previous_run() {
    let new_port = serde_json::json!([
        { "entry": 1, "ID": "01", "result": "built", "origin": "net/new-port" }
    ])
    .to_string();
    let transport = Arc::new(ScriptedTransport::default());
    transport.serve(
        "summary.json",
        [
            Scripted::Body(summary_json(1, "build")),
            Scripted::Body(summary_json(2, "Idle")),
        ],
    );
    transport.serve("01_history.json", [Scripted::Body(new_port)]);
    transport.serve("02_history.json", [Scripted::Body(shard_two_json())]);

    // The previous run finished with two shards on screen.
    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(decoded_history())));
    assert_eq!(state.rows.len(), 6);
    let generation = state.next_poll_generation();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_shutdown, shutdown_rx) = watch::channel(false);
    let poller = poller_for(&transport, &state, tx).generation(generation).immediate();
    let exit = tokio::time::timeout(Duration::from_secs(5), poller.run(shutdown_rx))
        .await
        .unwrap();
    assert_eq!(exit, PollExit::Inactive);

    // Step 1: the new run's single shard replaces the old history
    let Ok(AppEvent::PollResult { generation, snapshot }) = rx.try_recv() else {
        panic!("expected a poll result");
    };
    state.accept_poll_result(generation, *snapshot);
    assert_eq!(origins(&state.rows), vec!["net/new-port"]);

    // Step 2: growing from one to two shards refetches both
    drain_into(&mut state, &mut rx);
    assert_eq!(
        origins(&state.rows),
        vec!["net/new-port", "lang/php81", "x11/xorg", "lang/rust"]
    );
    assert_eq!(transport.calls_to("01_history.json"), 2);
}

#[tokio::test]
async fn refresh_ignores_the_replaced_poller() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.serve("summary.json", [Scripted::Body(summary_json(1, "build"))]);
    transport.serve("01_history.json", [Scripted::Body(shard_one_json())]);

    let mut state = Dashboard::new(test_config());
    state.apply_snapshot(idle_snapshot(Some(decoded_history())));
    let replaced = state.next_poll_generation();
    state.begin_loading();
    state.next_poll_generation();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let poller = poller_for(&transport, &state, tx).generation(replaced).immediate();
    let run = tokio::spawn(poller.run(shutdown_rx));
    // Wait for the in-flight poll to land, then stop the loop.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let _ = shutdown.send(true);
    assert_eq!(run.await.unwrap(), PollExit::Shutdown);

    let (forced, failures) = drain_into(&mut state, &mut rx);
    assert!(forced.is_empty());
    assert_eq!(failures, 0);
    assert!(state.is_loading());
    assert!(!state.view.build_in_progress);
    assert_eq!(state.rows.len(), 6);
}
