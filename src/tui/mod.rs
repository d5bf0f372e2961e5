pub mod builders;
pub mod footer;
pub mod header;
pub mod render;
pub mod report;
pub mod spinner;
pub mod startup;
pub mod stats;

use ratatui::style::Color;

/// Unicode-width-aware truncation with ellipsis.
/// Returns `""` when `max_width` is 0.
pub fn truncate(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('\u{2026}');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}

/// `s` truncated or right-padded to exactly `width` columns.
pub fn fit(s: &str, width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    let mut out = truncate(s, width);
    let used = UnicodeWidthStr::width(out.as_str());
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

/// First row of a `visible`-row window that keeps `cursor` on screen.
pub fn scroll_offset(cursor: usize, visible: usize) -> usize {
    if visible > 0 && cursor >= visible {
        cursor - visible + 1
    } else {
        0
    }
}

/// Badge and row color for a result kind.
pub fn result_color(result: &crate::model::BuildResult) -> Color {
    use crate::model::BuildResult;
    match result {
        BuildResult::Built => Color::Green,
        BuildResult::Meta => Color::Cyan,
        BuildResult::Failed => Color::Red,
        BuildResult::Ignored => Color::Yellow,
        BuildResult::Skipped => Color::Magenta,
        BuildResult::Other(_) => Color::Gray,
    }
}
