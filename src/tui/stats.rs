//! Stats panel: result badges, progress bar and the secondary metrics.

use crate::dashboard::Dashboard;
use crate::model::{BuildResult, Stats};
use crate::state::StatusFilter;
use crate::tui::result_color;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Width of each finished-result segment of a `width`-column bar, in badge
/// order. The queue fills whatever is left. Empty when nothing is counted.
pub fn progress_segments(stats: &Stats, width: u16) -> Vec<(BuildResult, u16)> {
    let total = stats.total();
    if total == 0 {
        return Vec::new();
    }
    BuildResult::KNOWN
        .iter()
        .filter_map(|result| {
            let cols = stats.count(result) * u64::from(width) / total;
            (cols > 0).then(|| (result.clone(), cols as u16))
        })
        .collect()
}

fn badges(state: &Dashboard, stats: &Stats) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!(" Queued {} ", stats.queued),
        Style::default().fg(Color::White),
    )];
    for result in &BuildResult::KNOWN {
        let label = result.as_str();
        let mut style = Style::default().fg(result_color(result));
        if state.view.status_filter == StatusFilter::Only(result.clone()) {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        let mut name = label.to_string();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {name} {} ", stats.count(result)), style));
    }
    Line::from(spans)
}

fn progress_bar(stats: &Stats, width: u16) -> Line<'static> {
    let segments = progress_segments(stats, width);
    if segments.is_empty() {
        return Line::from("");
    }
    let used: u16 = segments.iter().map(|(_, cols)| cols).sum();
    let mut spans: Vec<Span> = segments
        .into_iter()
        .map(|(result, cols)| {
            Span::styled(
                "█".repeat(usize::from(cols)),
                Style::default().fg(result_color(&result)),
            )
        })
        .collect();
    spans.push(Span::styled(
        "░".repeat(usize::from(width.saturating_sub(used))),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

fn secondary(stats: &Stats) -> Line<'_> {
    let mut spans = Vec::new();
    for (i, (label, value)) in stats.secondary().into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("{label} "),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(value, Style::default().fg(Color::White)));
    }
    Line::from(spans)
}

pub fn render(f: &mut Frame, area: Rect, state: &Dashboard) {
    let Some(stats) = state.summary.stats.as_ref() else {
        let empty = Paragraph::new(Line::from(Span::styled(
            " No statistics yet",
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(empty, area);
        return;
    };

    let lines = vec![
        badges(state, stats),
        progress_bar(stats, area.width),
        secondary(stats),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(panel, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn segments_are_proportional_to_total_with_queue() {
        let stats = Stats {
            queued: 25,
            built: 50,
            failed: 25,
            ..Stats::default()
        };
        assert_eq!(
            progress_segments(&stats, 100),
            vec![(BuildResult::Built, 50), (BuildResult::Failed, 25)]
        );
    }

    #[test]
    fn zero_total_renders_nothing() {
        assert!(progress_segments(&Stats::default(), 80).is_empty());
    }

    #[test]
    fn segments_never_exceed_width() {
        let stats = Stats {
            built: 1,
            meta: 1,
            failed: 1,
            ignored: 1,
            skipped: 1,
            ..Stats::default()
        };
        let used: u16 = progress_segments(&stats, 7).iter().map(|(_, c)| c).sum();
        assert!(used <= 7);
    }

    #[test]
    fn all_finished_fills_bar() {
        let stats = Stats {
            built: 3,
            ..Stats::default()
        };
        assert_eq!(progress_segments(&stats, 40), vec![(BuildResult::Built, 40)]);
    }
}
