use crate::dashboard::{Dashboard, NARROW_WIDTH_THRESHOLD};
use crate::model::BuilderStatus;
use crate::tui::{fit, scroll_offset, spinner};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const ID_W: usize = 5;
const ELAPSED_W: usize = 10;
const PHASE_W: usize = 14;
const LINES_W: usize = 9;

fn builder_line(
    builder: &BuilderStatus,
    selected: bool,
    width: usize,
    narrow: bool,
    frame: usize,
) -> Line<'static> {
    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let idle = builder.phase.is_idle();
    let (icon, phase_color) = if idle {
        ('·', Color::DarkGray)
    } else {
        (spinner::frame(frame), Color::Yellow)
    };
    let fixed = 2 + ID_W + PHASE_W + if narrow { 0 } else { ELAPSED_W + LINES_W };
    let origin_w = width.saturating_sub(fixed);

    let mut spans = vec![
        Span::styled(format!("{icon} "), Style::default().fg(phase_color)),
        Span::styled(fit(&format!("[{:02}]", builder.id), ID_W), base.fg(Color::Blue)),
    ];
    if !narrow {
        spans.push(Span::styled(fit(&builder.elapsed, ELAPSED_W), base.fg(Color::DarkGray)));
    }
    spans.push(Span::styled(fit(builder.phase.as_str(), PHASE_W), base.fg(phase_color)));
    spans.push(Span::styled(
        fit(builder.origin.as_deref().unwrap_or(""), origin_w),
        base.fg(Color::White),
    ));
    if !narrow {
        spans.push(Span::styled(fit(&builder.lines, LINES_W), base.fg(Color::DarkGray)));
    }
    Line::from(spans)
}

pub fn render(f: &mut Frame, area: Rect, state: &Dashboard) {
    let builders = &state.summary.builders;
    if builders.is_empty() {
        let para = Paragraph::new(" No builders reported")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::NONE));
        f.render_widget(para, area);
        return;
    }

    let narrow = area.width < NARROW_WIDTH_THRESHOLD;
    let width = area.width as usize;
    let active = builders.iter().filter(|b| !b.phase.is_idle()).count();
    let mut lines = vec![Line::from(Span::styled(
        format!(" {active} of {} builders active", builders.len()),
        Style::default().fg(Color::DarkGray),
    ))];

    let visible = (area.height as usize).saturating_sub(lines.len());
    let offset = scroll_offset(state.builder_cursor, visible);
    lines.extend(
        builders
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, b)| builder_line(b, i == state.builder_cursor, width, narrow, state.spinner_frame)),
    );

    let para = Paragraph::new(lines).block(Block::default().borders(Borders::NONE));
    f.render_widget(para, area);
}
