use crate::dashboard::Dashboard;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &Dashboard) {
    let mut spans = vec![
        Span::styled(
            format!(" synthw v{} ", state.version_string),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            &state.config.title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if !state.summary.profile.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("[{}]", state.summary.profile),
            Style::default().fg(Color::Yellow),
        ));
    }
    if !state.summary.kickoff.is_empty() {
        spans.push(Span::styled(
            format!(" started {}", state.summary.kickoff),
            Style::default().fg(Color::DarkGray),
        ));
    }

    spans.push(Span::raw(" │ "));
    if state.view.build_in_progress {
        spans.push(Span::styled(
            "Active",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::styled("Complete", Style::default().fg(Color::Blue)));
    }

    // Loading spinner or poll countdown
    if state.is_loading() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner::frame(state.spinner_frame).to_string(),
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(secs) = state.next_poll_in() {
        spans.push(Span::styled(
            format!(" {secs}s"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(updated) = state.last_updated {
        spans.push(Span::styled(
            format!(" updated {}", updated.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if state.degraded.is_some() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "⚠ stale",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    // Error indicator
    if state.error_message().is_some() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}
