//! Event Handling - Keyboard input to screen actions
//!
//! One pure function, [`dispatch`], decides what a key means given the
//! current mode and the capability flags of the focused screen. Keys that
//! mean nothing in the current context map to `None` and are dropped.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::state::{ModeKind, TabKind};

/// Semantic actions a screen reducer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Esc in browse mode: leave the current screen
    Leave,
    MoveUp,
    MoveDown,
    PrevPage,
    NextPage,
    OpenCreate,
    OpenEdit,
    OpenSearch,
    OpenDelete,
    OpenAdd,
    OpenRemove,
    Confirm,
    Cancel,
    Submit,
    Refresh,
    /// Zero-based tab index
    SwitchTab(usize),
    /// Enter on a list row
    Select,
    /// Open the detail of a hierarchy row without drilling in
    Inspect,
    NavBack,
    NavHome,
    Input(char),
    Backspace,
    NextField,
}

/// What the focused screen allows right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchContext {
    pub mode: ModeKind,
    /// Active tab on detail screens, `None` on lists
    pub tab: Option<TabKind>,
    pub tab_count: usize,
    /// No create / delete / drill-in (the users list)
    pub read_only: bool,
    /// The record is protected; edit and sub-collection changes are inert
    pub locked: bool,
    /// The list walks a parent/child tree
    pub hierarchical: bool,
}

impl DispatchContext {
    pub fn list(mode: ModeKind) -> Self {
        Self {
            mode,
            tab: None,
            tab_count: 0,
            read_only: false,
            locked: false,
            hierarchical: false,
        }
    }

    pub fn detail(mode: ModeKind, tab: TabKind, tab_count: usize) -> Self {
        Self {
            tab: Some(tab),
            tab_count,
            ..Self::list(mode)
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn hierarchical(mut self, hierarchical: bool) -> Self {
        self.hierarchical = hierarchical;
        self
    }

    fn is_detail(&self) -> bool {
        self.tab.is_some()
    }
}

/// Map a key press to an action
pub fn dispatch(key: KeyEvent, ctx: &DispatchContext) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    // Ctrl+C quits from anywhere, even mid-form
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    if ctx.mode.is_text_entry() {
        return dispatch_text(key, ctx);
    }
    if ctx.mode.is_confirm() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::Confirm),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::Cancel),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }
    if ctx.mode.is_picker() {
        return match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Esc => Some(Action::Cancel),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }

    dispatch_browse(key, ctx)
}

fn dispatch_text(key: KeyEvent, ctx: &DispatchContext) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Tab if ctx.mode.has_fields() => Some(Action::NextField),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => Some(Action::Input(c)),
        _ => None,
    }
}

fn dispatch_browse(key: KeyEvent, ctx: &DispatchContext) -> Option<Action> {
    let detail = ctx.is_detail();
    let tab = ctx.tab;

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Leave),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Char('r') => Some(Action::Refresh),

        // List-only
        KeyCode::Left if !detail => Some(Action::PrevPage),
        KeyCode::Right if !detail => Some(Action::NextPage),
        KeyCode::Char('/') if !detail => Some(Action::OpenSearch),
        KeyCode::Char('n') if !detail && !ctx.read_only => Some(Action::OpenCreate),
        KeyCode::Enter if !detail && (!ctx.read_only || ctx.hierarchical) => Some(Action::Select),
        KeyCode::Char('i') if ctx.hierarchical => Some(Action::Inspect),
        KeyCode::Char('b') if ctx.hierarchical => Some(Action::NavBack),
        KeyCode::Char('h') if ctx.hierarchical => Some(Action::NavHome),

        // Delete is offered even on protected records; the reducer refuses it
        KeyCode::Char('d') if !ctx.read_only => Some(Action::OpenDelete),

        // Detail-only
        KeyCode::Char('e') if tab == Some(TabKind::Info) && !ctx.locked => {
            Some(Action::OpenEdit)
        }
        KeyCode::Char('a') if tab.is_some_and(|t| t.is_editable()) && !ctx.locked => {
            Some(Action::OpenAdd)
        }
        KeyCode::Char('x') if tab.is_some_and(|t| t.is_editable()) && !ctx.locked => {
            Some(Action::OpenRemove)
        }
        KeyCode::Char(c @ '1'..='9') if detail => {
            let index = c as usize - '1' as usize;
            (index < ctx.tab_count).then_some(Action::SwitchTab(index))
        }

        _ => None,
    }
}

/// Footer hints for a context
pub fn help_hints(ctx: &DispatchContext) -> Vec<(&'static str, &'static str)> {
    if ctx.mode.is_text_entry() {
        let mut hints = vec![("Enter", "submit"), ("Esc", "cancel")];
        if ctx.mode.has_fields() {
            hints.push(("Tab", "next field"));
        }
        return hints;
    }
    if ctx.mode.is_confirm() {
        return vec![("y", "confirm"), ("n", "cancel")];
    }
    if ctx.mode.is_picker() {
        return vec![("↑↓", "choose"), ("Enter", "add"), ("Esc", "cancel")];
    }

    let mut hints = vec![("↑↓", "move")];
    match ctx.tab {
        None => {
            hints.push(("←→", "page"));
            hints.push(("/", "search"));
            if !ctx.read_only {
                hints.push(("n", "new"));
                hints.push(("d", "delete"));
            }
            if ctx.hierarchical {
                hints.push(("Enter", "open"));
                hints.push(("i", "info"));
                hints.push(("b", "back"));
                hints.push(("h", "home"));
            } else if !ctx.read_only {
                hints.push(("Enter", "details"));
            }
        }
        Some(tab) => {
            if ctx.tab_count > 1 {
                hints.push(("1-9", "tab"));
            }
            if !ctx.locked {
                if tab == TabKind::Info {
                    hints.push(("e", "edit"));
                }
                if tab.is_editable() {
                    hints.push(("a", "add"));
                    hints.push(("x", "remove"));
                }
            }
            if !ctx.read_only {
                hints.push(("d", "delete"));
            }
        }
    }
    hints.push(("r", "refresh"));
    hints.push(("Esc", "back"));
    hints.push(("q", "quit"));
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    #[test]
    fn test_quit_action() {
        let ctx = DispatchContext::list(ModeKind::Browse);
        assert_eq!(dispatch(ch('q'), &ctx), Some(Action::Quit));
    }

    #[test]
    fn test_ctrl_c_quits_from_forms() {
        let ctx = DispatchContext::list(ModeKind::Create);
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(dispatch(key, &ctx), Some(Action::Quit));
    }

    #[test]
    fn test_text_modes_capture_letters() {
        let ctx = DispatchContext::list(ModeKind::Search);
        assert_eq!(dispatch(ch('q'), &ctx), Some(Action::Input('q')));
        assert_eq!(dispatch(ch('n'), &ctx), Some(Action::Input('n')));
        assert_eq!(dispatch(key(KeyCode::Tab), &ctx), None);

        let ctx = DispatchContext::list(ModeKind::Create);
        assert_eq!(dispatch(key(KeyCode::Tab), &ctx), Some(Action::NextField));
    }

    #[test]
    fn test_confirm_mode() {
        let ctx = DispatchContext::list(ModeKind::ConfirmDelete);
        assert_eq!(dispatch(ch('y'), &ctx), Some(Action::Confirm));
        assert_eq!(dispatch(ch('n'), &ctx), Some(Action::Cancel));
        assert_eq!(dispatch(key(KeyCode::Esc), &ctx), Some(Action::Cancel));
        assert_eq!(dispatch(ch('d'), &ctx), None);
    }

    #[test]
    fn test_read_only_list() {
        let ctx = DispatchContext::list(ModeKind::Browse).read_only(true);
        assert_eq!(dispatch(ch('n'), &ctx), None);
        assert_eq!(dispatch(ch('d'), &ctx), None);
        assert_eq!(dispatch(key(KeyCode::Enter), &ctx), None);
        assert_eq!(dispatch(ch('/'), &ctx), Some(Action::OpenSearch));
    }

    #[test]
    fn test_hierarchy_keys_only_on_tree_lists() {
        let flat = DispatchContext::list(ModeKind::Browse);
        assert_eq!(dispatch(ch('b'), &flat), None);
        assert_eq!(dispatch(ch('h'), &flat), None);

        let tree = flat.hierarchical(true);
        assert_eq!(dispatch(ch('b'), &tree), Some(Action::NavBack));
        assert_eq!(dispatch(ch('h'), &tree), Some(Action::NavHome));
        assert_eq!(dispatch(ch('i'), &tree), Some(Action::Inspect));
    }

    #[test]
    fn test_locked_detail_ignores_edit_but_offers_delete() {
        let ctx = DispatchContext::detail(ModeKind::Browse, TabKind::Info, 2).locked(true);
        assert_eq!(dispatch(ch('e'), &ctx), None);
        assert_eq!(dispatch(ch('d'), &ctx), Some(Action::OpenDelete));
    }

    #[test]
    fn test_tab_keys_bounded_by_tab_count() {
        let ctx = DispatchContext::detail(ModeKind::Browse, TabKind::Info, 2);
        assert_eq!(dispatch(ch('2'), &ctx), Some(Action::SwitchTab(1)));
        assert_eq!(dispatch(ch('3'), &ctx), None);
        assert_eq!(dispatch(key(KeyCode::Right), &ctx), None);
    }

    #[test]
    fn test_add_only_on_editable_tabs() {
        let info = DispatchContext::detail(ModeKind::Browse, TabKind::Info, 3);
        assert_eq!(dispatch(ch('a'), &info), None);

        let members = DispatchContext::detail(ModeKind::Browse, TabKind::Members, 3);
        assert_eq!(dispatch(ch('a'), &members), Some(Action::OpenAdd));
        assert_eq!(dispatch(ch('x'), &members), Some(Action::OpenRemove));
    }

    #[test]
    fn test_release_events_ignored() {
        let ctx = DispatchContext::list(ModeKind::Browse);
        let mut release = ch('q');
        release.kind = KeyEventKind::Release;
        assert_eq!(dispatch(release, &ctx), None);
    }
}
