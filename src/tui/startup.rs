//! Animated startup screen for the initial load.
//!
//! Each phase (summary, then history shards) runs its future under
//! `tokio::select!` against an 80ms spinner tick. When a phase fails the
//! screen keeps its phases and adds the initialization banner; nothing is
//! retried.

use crate::error::{InitError, PollError, INIT_FAILURE_BANNER};
use crate::fetch::RetryingFetcher;
use crate::model::SummarySnapshot;
use crate::poller::{fetch_history, PollSnapshot};
use crate::source::{Endpoint, SnapshotSource};
use crate::tui::spinner;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const ASCII_ART: &[&str] = &[
    r" ____              _   _     ",
    r"/ ___| _   _ _ __ | |_| |__  ",
    r"\___ \| | | | '_ \| __| '_ \ ",
    r" ___) | |_| | | | | |_| | | |",
    r"|____/ \__, |_| |_|\__|_| |_|",
    r"       |___/                 ",
];

/// Interpolate a 2-stop gradient: Green -> Cyan across `total_lines`.
fn gradient_color(line_idx: usize, total_lines: usize) -> Color {
    if total_lines <= 1 {
        return Color::Rgb(0, 200, 80);
    }
    let t = line_idx as f64 / (total_lines - 1) as f64;
    let g = 200.0 + (220.0 - 200.0) * t;
    let b = 80.0 + (255.0 - 80.0) * t;
    Color::Rgb(0, g as u8, b as u8)
}

#[derive(Clone)]
enum PhaseStatus {
    InProgress,
    Done,
    Failed(String),
}

#[derive(Clone)]
struct StartupPhase {
    label: String,
    detail: Option<String>,
    status: PhaseStatus,
}

fn render_startup<B: Backend>(
    terminal: &mut Terminal<B>,
    phases: &[StartupPhase],
    banner: Option<&str>,
    frame: usize,
) {
    if let Err(e) = terminal.draw(|f| {
        let area = f.area();
        let art_height = ASCII_ART.len() as u16;
        let banner_height = if banner.is_some() { 2 } else { 0 };
        let total_lines = art_height + 1 + phases.len() as u16 + banner_height;
        let top_offset = (area.height.saturating_sub(total_lines) / 2).saturating_sub(4);
        let vertical = Layout::vertical([
            Constraint::Length(top_offset),
            Constraint::Length(total_lines),
            Constraint::Min(0),
        ])
        .split(area);

        let mut lines: Vec<Line> = ASCII_ART
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let color = gradient_color(i, ASCII_ART.len());
                Line::from(Span::styled(*line, Style::default().fg(color)))
            })
            .collect();

        lines.push(Line::from(""));

        lines.extend(phases.iter().map(|phase| {
            let (icon, icon_style) = match &phase.status {
                PhaseStatus::InProgress => (
                    spinner::frame(frame).to_string(),
                    Style::default().fg(Color::Yellow),
                ),
                PhaseStatus::Done => ("\u{2713}".to_string(), Style::default().fg(Color::Green)),
                PhaseStatus::Failed(_) => ("\u{2717}".to_string(), Style::default().fg(Color::Red)),
            };

            let mut spans = vec![
                Span::styled(format!("  {icon} "), icon_style),
                Span::styled(&phase.label, Style::default().fg(Color::White)),
            ];

            if let Some(detail) = &phase.detail {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(detail, Style::default().fg(Color::DarkGray)));
            }

            if let PhaseStatus::Failed(msg) = &phase.status {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(msg, Style::default().fg(Color::Red)));
            }

            Line::from(spans)
        }));

        if let Some(banner) = banner {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {banner}"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::styled("  (press any key)", Style::default().fg(Color::DarkGray)),
            ]));
        }

        let paragraph = Paragraph::new(lines);
        f.render_widget(paragraph, vertical[1]);
    }) {
        tracing::warn!("startup render failed: {e}");
    }
}

async fn run_phase<B, F, T, E>(
    terminal: &mut Terminal<B>,
    phases: &mut Vec<StartupPhase>,
    label: &str,
    fut: F,
) -> Result<T, E>
where
    B: Backend,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    phases.push(StartupPhase {
        label: label.to_string(),
        detail: None,
        status: PhaseStatus::InProgress,
    });
    render_startup(terminal, phases, None, 0);

    let mut ticker = tokio::time::interval(Duration::from_millis(80));
    let mut frame = 0usize;
    tokio::pin!(fut);

    loop {
        tokio::select! {
            result = &mut fut => {
                let idx = phases.len() - 1;
                match &result {
                    Ok(_) => phases[idx].status = PhaseStatus::Done,
                    Err(e) => phases[idx].status = PhaseStatus::Failed(e.to_string()),
                }
                render_startup(terminal, phases, None, frame);
                return result;
            }
            _ = ticker.tick() => {
                frame += 1;
                render_startup(terminal, phases, None, frame);
            }
        }
    }
}

/// Loads the summary and every history shard before the dashboard is shown.
pub async fn run_startup<B: Backend>(
    terminal: &mut Terminal<B>,
    fetcher: &Arc<RetryingFetcher>,
    source: &SnapshotSource,
) -> Result<PollSnapshot, InitError> {
    let mut phases: Vec<StartupPhase> = Vec::new();
    let result = load(terminal, &mut phases, fetcher, source).await;
    if let Err(e) = &result {
        tracing::warn!("initial load failed: {e}");
        render_startup(terminal, &phases, Some(INIT_FAILURE_BANNER), 0);
    }
    result
}

async fn load<B: Backend>(
    terminal: &mut Terminal<B>,
    phases: &mut Vec<StartupPhase>,
    fetcher: &Arc<RetryingFetcher>,
    source: &SnapshotSource,
) -> Result<PollSnapshot, InitError> {
    let summary_url = source.build_url(Endpoint::Summary);
    let summary: SummarySnapshot = run_phase(
        terminal,
        phases,
        "Fetching build summary",
        async {
            fetcher
                .fetch_json::<SummarySnapshot>(&summary_url)
                .await
                .map_err(PollError::from)
        },
    )
    .await?;
    let idx = phases.len() - 1;
    phases[idx].detail = Some(if summary.profile.is_empty() {
        format!("{} history files", summary.kfiles)
    } else {
        format!("{} · {} history files", summary.profile, summary.kfiles)
    });
    render_startup(terminal, phases, None, 0);

    let shards = run_phase(
        terminal,
        phases,
        "Fetching build history",
        fetch_history(fetcher, source, summary.kfiles),
    )
    .await?;
    let idx = phases.len() - 1;
    let records: usize = shards.iter().map(Vec::len).sum();
    phases[idx].detail = Some(format!("{records} entries"));
    render_startup(terminal, phases, None, 0);

    Ok(PollSnapshot {
        summary,
        history: Some(shards),
    })
}
