use crate::dashboard::{Dashboard, NARROW_WIDTH_THRESHOLD};
use crate::state::{SortDirection, StatusFilter};
use crate::tui::{fit, result_color, scroll_offset};
use crate::view::ReportRow;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const ENTRY_W: usize = 6;
const ELAPSED_W: usize = 9;
const BUILDER_W: usize = 5;
const RESULT_W: usize = 8;
const SKIP_W: usize = 7;
const DURATION_W: usize = 9;

/// Origin and information share whatever the fixed columns leave.
fn flex_widths(total: usize, narrow: bool) -> (usize, usize) {
    let fixed = if narrow {
        ENTRY_W + RESULT_W
    } else {
        ENTRY_W + ELAPSED_W + BUILDER_W + RESULT_W + SKIP_W + DURATION_W
    };
    let spare = total.saturating_sub(fixed);
    let origin = (spare * 2 / 5).max(8);
    (origin, spare.saturating_sub(origin))
}

fn sort_marker(sort: Option<SortDirection>) -> &'static str {
    match sort {
        None => "",
        Some(SortDirection::Ascending) => " ▲",
        Some(SortDirection::Descending) => " ▼",
    }
}

fn column_titles(state: &Dashboard, width: usize, narrow: bool) -> Line<'static> {
    let (origin_w, info_w) = flex_widths(width, narrow);
    let skip = format!("Skip{}", sort_marker(state.view.sort));
    let text = if narrow {
        format!(
            "{}{}{}{}",
            fit("Entry", ENTRY_W),
            fit("Result", RESULT_W),
            fit("Origin", origin_w),
            fit("Information", info_w),
        )
    } else {
        format!(
            "{}{}{}{}{}{}{}{}",
            fit("Entry", ENTRY_W),
            fit("Elapsed", ELAPSED_W),
            fit("[ID]", BUILDER_W),
            fit("Result", RESULT_W),
            fit("Origin", origin_w),
            fit("Information", info_w),
            fit(&skip, SKIP_W),
            fit("Duration", DURATION_W),
        )
    };
    Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    ))
}

fn row_line(row: &ReportRow, selected: bool, width: usize, narrow: bool) -> Line<'static> {
    let (origin_w, info_w) = flex_widths(width, narrow);
    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let result = &row.record.result;
    let info = if row.skip_info.is_empty() || !narrow {
        row.information.to_string()
    } else {
        format!("{}: {}", row.information, row.skip_info)
    };

    let mut spans = vec![Span::styled(
        fit(&row.entry_cell(), ENTRY_W),
        base.fg(Color::DarkGray),
    )];
    if !narrow {
        spans.push(Span::styled(fit(&row.record.elapsed, ELAPSED_W), base.fg(Color::DarkGray)));
        spans.push(Span::styled(fit(&row.builder_cell(), BUILDER_W), base.fg(Color::Blue)));
    }
    spans.push(Span::styled(fit(result.as_str(), RESULT_W), base.fg(result_color(result))));
    spans.push(Span::styled(fit(&row.record.origin, origin_w), base.fg(Color::White)));
    spans.push(Span::styled(fit(&info, info_w), base));
    if !narrow {
        spans.push(Span::styled(fit(&row.skip_info, SKIP_W), base.fg(Color::Yellow)));
        spans.push(Span::styled(fit(&row.record.duration, DURATION_W), base.fg(Color::DarkGray)));
    }
    Line::from(spans)
}

/// Filter and search line above the table.
fn filter_line(state: &Dashboard) -> Line<'_> {
    let mut spans = vec![
        Span::styled(" status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.view.status_filter.label(),
            match &state.view.status_filter {
                StatusFilter::All => Style::default().fg(Color::White),
                StatusFilter::Only(result) => Style::default().fg(result_color(result)),
            },
        ),
        Span::styled("  search: ", Style::default().fg(Color::DarkGray)),
        Span::styled(&state.view.search, Style::default().fg(Color::White)),
    ];
    if state.is_editing_search() {
        spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
    }
    spans.push(Span::styled(
        format!("  {} of {}", state.rows.len(), state.history.len()),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

pub fn render(f: &mut Frame, area: Rect, state: &Dashboard) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;
    let width = area.width as usize;

    let mut lines = vec![filter_line(state), column_titles(state, width, narrow)];

    if state.rows.is_empty() {
        let msg = if state.history.is_empty() {
            " No build history yet"
        } else {
            " No rows match the current filter"
        };
        lines.push(Line::from(Span::styled(msg, Style::default().fg(Color::DarkGray))));
    } else {
        let visible = (area.height as usize).saturating_sub(lines.len());
        let offset = scroll_offset(state.report_cursor, visible);
        lines.extend(
            state
                .rows
                .iter()
                .enumerate()
                .skip(offset)
                .take(visible)
                .map(|(i, row)| row_line(row, i == state.report_cursor, width, narrow)),
        );
    }

    let table = Paragraph::new(lines).block(Block::default().borders(Borders::NONE));
    f.render_widget(table, area);
}
