use crate::state::Tab;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    NextTab,
    SelectTab(Tab),
    CycleStatus,
    ClearStatus,
    ToggleSort,
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    SearchCommit,
    SearchCancel,
    ClearSearch,
    /// Narrow the report to the selected builder or origin.
    FilterSelection,
    OpenLog,
    OpenFreshports,
    Refresh,
    None,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    pub is_loading: bool,
    pub editing_search: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if ctx.editing_search {
        return match key.code {
            KeyCode::Esc => Action::SearchCancel,
            KeyCode::Enter => Action::SearchCommit,
            KeyCode::Backspace => Action::SearchBackspace,
            KeyCode::Char(c) => Action::SearchInput(c),
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Action::ScrollToTop,
        KeyCode::End | KeyCode::Char('G') => Action::ScrollToBottom,
        KeyCode::Tab => Action::NextTab,
        KeyCode::Char('1') => Action::SelectTab(Tab::BuildersProgress),
        KeyCode::Char('2') => Action::SelectTab(Tab::BuildReport),
        KeyCode::Char('f') => Action::CycleStatus,
        KeyCode::Char('a') => Action::ClearStatus,
        KeyCode::Char('s') => Action::ToggleSort,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('c') => Action::ClearSearch,
        KeyCode::Enter => Action::FilterSelection,
        KeyCode::Char('o') => Action::OpenLog,
        KeyCode::Char('p') => Action::OpenFreshports,
        KeyCode::Char('r') if !ctx.is_loading => Action::Refresh,
        _ => Action::None,
    }
}
