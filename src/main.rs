use synthw::browser;
use synthw::cli::Cli;
use synthw::config::DashboardConfig;
use synthw::dashboard::{Dashboard, PAGE_SIZE};
use synthw::events::{self, AppEvent, EventHandler};
use synthw::fetch::{HttpTransport, RetryingFetcher};
use synthw::input::{self, Action, InputContext};
use synthw::poller::{PollHandle, Poller};
use synthw::source::SnapshotSource;
use synthw::state::StatusFilter;
use synthw::tui;
use synthw::view;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = dirs_next_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "synthw v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn dirs_next_or_fallback() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("synthw")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("synthw")
    } else {
        std::path::PathBuf::from("/tmp/synthw")
    }
}

fn spawn_monitored(
    tx: UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Error(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;
    Ok(())
}

/// Everything the UI loop needs to start pollers and resolve links.
struct Services {
    fetcher: Arc<RetryingFetcher>,
    source: Arc<SnapshotSource>,
    tx: UnboundedSender<AppEvent>,
}

impl Services {
    fn spawn_poller(&self, state: &mut Dashboard, immediate: bool) -> PollHandle {
        let generation = state.next_poll_generation();
        let poller = Poller::new(
            self.fetcher.clone(),
            self.source.clone(),
            state.poll_interval(),
            state.history.observed_kfiles(),
            self.tx.clone(),
        )
        .generation(generation);
        if immediate {
            poller.immediate().spawn()
        } else {
            poller.spawn()
        }
    }

    fn open(&self, state: &mut Dashboard, url: String) {
        let tx = self.tx.clone();
        spawn_monitored(self.tx.clone(), "open_browser", async move {
            if let Err(e) = browser::open_in_browser(&url) {
                if tx.send(AppEvent::Error(e.to_string())).is_err() {
                    tracing::warn!("open_browser: channel closed");
                }
            }
        });
        state.add_notification("Opened in browser".to_string());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let config = DashboardConfig::try_from(&args).map_err(|e| eyre!(e))?;

    if args.verbose {
        setup_verbose_logging()?;
    }

    let transport = HttpTransport::new()?;
    let fetcher = Arc::new(RetryingFetcher::new(Arc::new(transport)));
    let source = Arc::new(SnapshotSource::new(&config));
    tracing::info!(base = %config.base_url, path = %config.path, "watching report");

    // Setup terminal with panic hook early, before any data fetching
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let snapshot = match tui::startup::run_startup(&mut terminal, &fetcher, &source).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            // The banner stays up until the user acknowledges it.
            if let Err(join_err) = tokio::task::spawn_blocking(events::wait_for_key).await {
                tracing::warn!("key wait failed: {join_err}");
            }
            restore_terminal(&mut terminal)?;
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    execute!(io::stdout(), SetTitle(format!("synthw: {}", config.title)))?;

    let mut state = Dashboard::new(config);
    state.version_string = format!("{}+{}", env!("CARGO_PKG_VERSION"), env!("BUILD_NUMBER"));
    state.desktop_notify = !args.no_notify;
    state.apply_snapshot(snapshot);

    let events = EventHandler::new(Duration::from_millis(100));
    let services = Services {
        fetcher,
        source,
        tx: events.sender(),
    };

    // Only a running build needs polling; a manual refresh restarts it later.
    let poller = if state.view.build_in_progress {
        state.polling = true;
        Some(services.spawn_poller(&mut state, false))
    } else {
        None
    };

    let result = run_app(&mut terminal, &mut state, events, &services, poller).await;

    restore_terminal(&mut terminal)?;

    result
}

#[cfg(feature = "desktop-notify")]
fn notify_completion(state: &Dashboard) {
    synthw::notify::send_desktop(&state.config.title, &state.summary);
}

#[cfg(not(feature = "desktop-notify"))]
fn notify_completion(_state: &Dashboard) {}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut Dashboard,
    mut events: EventHandler,
    services: &Services,
    mut poller: Option<PollHandle>,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            AppEvent::Key(key) => {
                let ctx = InputContext {
                    has_error: state.error.is_some(),
                    is_loading: state.is_loading(),
                    editing_search: state.is_editing_search(),
                };
                match input::map_key(key, &ctx) {
                    Action::Quit => state.should_quit = true,
                    Action::DismissError => state.clear_error(),
                    Action::MoveUp => state.move_cursor_up(1),
                    Action::MoveDown => state.move_cursor_down(1),
                    Action::PageUp => state.move_cursor_up(PAGE_SIZE),
                    Action::PageDown => state.move_cursor_down(PAGE_SIZE),
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
                    Action::OpenLog => {
                        if let Some(origin) = state.selected_log_origin() {
                            let url = services.source.log_url(origin);
                            services.open(state, url);
                        } else {
                            state.set_error("No log file for this row".to_string());
                        }
                    }
                    Action::OpenFreshports => {
                        if let Some(origin) = state.selected_origin() {
                            let url = view::freshports_url(origin);
                            services.open(state, url);
                        }
                    }
                    Action::Refresh => {
                        if let Some(handle) = poller.take() {
                            handle.shutdown();
                        }
                        tracing::info!("manual refresh");
                        state.begin_loading();
                        state.polling = true;
                        poller = Some(services.spawn_poller(state, true));
                    }
                    Action::None => {}
                }
            }
            AppEvent::Tick => {
                if last_tick.elapsed() >= Duration::from_millis(100) {
                    state.advance_spinner();
                    last_tick = Instant::now();
                }
                if poller.as_ref().is_some_and(PollHandle::is_finished) {
                    poller = None;
                    state.polling = false;
                }
            }
            AppEvent::PollResult {
                generation,
                snapshot,
            } => {
                let Some(transition) = state.accept_poll_result(generation, *snapshot) else {
                    continue;
                };
                if transition.started {
                    state.add_notification("Build started".to_string());
                }
                if transition.completed {
                    let message = state.completion_message();
                    tracing::info!("{message}");
                    state.add_notification(message);
                    if state.desktop_notify {
                        notify_completion(state);
                    }
                }
            }
            AppEvent::PollFailed {
                generation,
                message,
                retry_in,
            } => {
                state.accept_poll_failure(generation, message, retry_in);
            }
            AppEvent::Error(e) => state.set_error(e),
        }

        if state.should_quit {
            break;
        }
    }

    if let Some(handle) = poller {
        handle.shutdown();
    }
    events.stop();
    Ok(())
}
