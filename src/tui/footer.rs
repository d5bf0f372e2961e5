use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::dashboard::{Dashboard, NARROW_WIDTH_THRESHOLD};
use crate::state::Tab;

pub fn render(f: &mut Frame, area: Rect, state: &Dashboard) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;

    let hints: &[(&str, &str)] = if state.is_editing_search() {
        &[("Enter", "apply"), ("Esc", "cancel"), ("Bksp", "delete")]
    } else if narrow {
        &[
            ("j/k", "nav"),
            ("Tab", "tab"),
            ("f", "status"),
            ("/", "search"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    } else if state.view.active_tab == Tab::BuildersProgress {
        &[
            ("↑↓/jk", "navigate"),
            ("Tab/1/2", "tabs"),
            ("Enter", "builder rows"),
            ("o", "log"),
            ("p", "freshports"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    } else {
        &[
            ("↑↓/jk", "navigate"),
            ("Tab/1/2", "tabs"),
            ("f/a", "status/all"),
            ("s", "sort"),
            ("/", "search"),
            ("c", "clear"),
            ("Enter", "origin"),
            ("o", "log"),
            ("p", "freshports"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    };

    // Notification display
    let line = if let Some(notif) = state.notifications.last() {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(&notif.message, Style::default().fg(Color::Yellow)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}
