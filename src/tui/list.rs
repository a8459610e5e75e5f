//! Paginated list screen
//!
//! One implementation serves roles, groups, users and workspaces. Users are
//! read-only. Workspaces walk the parent/child tree through a
//! [`NavigationPath`] instead of opening a detail screen on Enter.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use super::events::{Action, DispatchContext};
use super::nav::NavigationPath;
use super::screen::{
    completion_effects, Effect, MutationResult, Navigation, RenderContext, Screen, ScreenSpec,
};
use super::state::{clamp_index, Form, ModeKind, Pagination, TextInput};
use super::status::StatusMessage;
use super::theme::icons;
use super::widgets::{self, utils::truncate};
use crate::api::{ListParams, Mutation, Query};
use crate::cache::{QueryCache, QueryStatus};
use crate::model::{Entity, EntityKind, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMode {
    Browse,
    Create { form: Form, submitting: bool },
    Search { input: TextInput },
    ConfirmDelete { target: Entity },
}

impl ListMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Browse => ModeKind::Browse,
            Self::Create { .. } => ModeKind::Create,
            Self::Search { .. } => ModeKind::Search,
            Self::ConfirmDelete { .. } => ModeKind::ConfirmDelete,
        }
    }
}

pub struct ListScreen {
    kind: EntityKind,
    mode: ListMode,
    selected: usize,
    pagination: Pagination,
    /// Applied server-side name filter
    search: String,
    nav: Option<NavigationPath>,
}

impl ListScreen {
    pub fn new(kind: EntityKind, page_size: usize) -> Self {
        Self {
            kind,
            mode: ListMode::Browse,
            selected: 0,
            pagination: Pagination::new(page_size),
            search: String::new(),
            nav: (kind == EntityKind::Workspace).then(NavigationPath::new),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn list_mode(&self) -> &ListMode {
        &self.mode
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn nav(&self) -> Option<&NavigationPath> {
        self.nav.as_ref()
    }

    fn read_only(&self) -> bool {
        self.kind == EntityKind::User
    }

    /// The query for the page currently on screen
    pub fn query(&self) -> Query {
        let mut params = ListParams::page(self.pagination.page(), self.pagination.page_size())
            .with_name(self.search.clone());
        if let Some(nav) = &self.nav {
            params = params.with_parent(nav.filter());
        }
        Query::list(self.kind, params)
    }

    fn page_data(&self, cache: &QueryCache) -> Option<Page> {
        cache
            .data(&self.query().key())
            .and_then(|data| data.as_page().cloned())
    }

    fn rows(&self, cache: &QueryCache) -> Vec<Entity> {
        self.page_data(cache).map(|page| page.data).unwrap_or_default()
    }

    fn selected_entity(&self, cache: &QueryCache) -> Option<Entity> {
        self.rows(cache).into_iter().nth(self.selected)
    }

    fn reset_position(&mut self) {
        self.pagination.reset();
        self.selected = 0;
    }

    fn refresh(&self) -> Vec<Effect> {
        vec![
            Effect::Invalidate(vec![self.query().key()]),
            Effect::Status(StatusMessage::success("Refreshed")),
        ]
    }

    // ─── Reducers ───────────────────────────────────────────────────────────

    fn handle_browse(&mut self, action: Action, cache: &QueryCache) -> Vec<Effect> {
        match action {
            Action::MoveUp => self.selected = self.selected.saturating_sub(1),
            Action::MoveDown => {
                if self.selected + 1 < self.rows(cache).len() {
                    self.selected += 1;
                }
            }
            Action::NextPage => {
                if self.pagination.next() {
                    self.selected = 0;
                }
            }
            Action::PrevPage => {
                if self.pagination.prev() {
                    self.selected = 0;
                }
            }
            Action::OpenCreate => {
                self.mode = ListMode::Create {
                    form: Form::default(),
                    submitting: false,
                };
            }
            Action::OpenSearch => {
                self.mode = ListMode::Search {
                    input: TextInput::new(self.search.clone()),
                };
            }
            Action::OpenDelete => {
                let Some(target) = self.selected_entity(cache) else {
                    return Vec::new();
                };
                if target.is_protected() {
                    return vec![Effect::Status(StatusMessage::error(
                        self.kind.protected_delete_message(),
                    ))];
                }
                self.mode = ListMode::ConfirmDelete { target };
            }
            Action::Select => {
                let Some(entity) = self.selected_entity(cache) else {
                    return Vec::new();
                };
                match self.nav.as_mut() {
                    Some(nav) => {
                        nav.drill_in(&entity);
                        self.reset_position();
                    }
                    None => {
                        return vec![Effect::Navigate(Navigation::Push(ScreenSpec::detail(
                            self.kind, entity.id,
                        )))];
                    }
                }
            }
            Action::Inspect => {
                if let Some(entity) = self.selected_entity(cache) {
                    return vec![Effect::Navigate(Navigation::Push(ScreenSpec::detail(
                        self.kind, entity.id,
                    )))];
                }
            }
            Action::NavBack => {
                if self.nav.as_mut().is_some_and(NavigationPath::back) {
                    self.reset_position();
                }
            }
            Action::NavHome => {
                if self.nav.as_mut().is_some_and(NavigationPath::home) {
                    self.reset_position();
                }
            }
            Action::Refresh => return self.refresh(),
            Action::Leave => return vec![Effect::Navigate(Navigation::Back)],
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_create(&mut self, action: Action) -> Vec<Effect> {
        let kind = self.kind;
        let parent = self
            .nav
            .as_ref()
            .and_then(|nav| nav.current_parent().map(str::to_string));
        let ListMode::Create { form, submitting } = &mut self.mode else {
            return Vec::new();
        };

        match action {
            Action::Input(c) => form.input(c),
            Action::Backspace => form.backspace(),
            Action::NextField => form.next_field(),
            Action::Cancel => self.mode = ListMode::Browse,
            Action::Submit => {
                if *submitting {
                    return Vec::new();
                }
                let mut draft = form.draft();
                draft.parent_id = parent;
                return match draft.validated() {
                    Ok(draft) => {
                        *submitting = true;
                        vec![Effect::Mutate(Mutation::Create { kind, draft })]
                    }
                    Err(err) => vec![Effect::Status(StatusMessage::error(err.to_string()))],
                };
            }
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_search(&mut self, action: Action) -> Vec<Effect> {
        let ListMode::Search { input } = &mut self.mode else {
            return Vec::new();
        };

        match action {
            Action::Input(c) => input.push(c),
            Action::Backspace => input.backspace(),
            Action::Cancel => self.mode = ListMode::Browse,
            Action::Submit => {
                self.search = input.as_str().trim().to_string();
                self.mode = ListMode::Browse;
                self.reset_position();
            }
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_confirm(&mut self, action: Action) -> Vec<Effect> {
        let ListMode::ConfirmDelete { target } = &self.mode else {
            return Vec::new();
        };

        match action {
            Action::Confirm => {
                let mutation = Mutation::Delete {
                    kind: self.kind,
                    id: target.id.clone(),
                };
                self.mode = ListMode::Browse;
                vec![Effect::Mutate(mutation)]
            }
            Action::Cancel => {
                self.mode = ListMode::Browse;
                Vec::new()
            }
            Action::Refresh => self.refresh(),
            Action::Quit => vec![Effect::Navigate(Navigation::Quit)],
            _ => Vec::new(),
        }
    }

    // ─── Rendering ──────────────────────────────────────────────────────────

    fn row_line<'a>(&self, entity: &'a Entity, selected: bool, ctx: &RenderContext) -> ListItem<'a> {
        let theme = ctx.theme;
        let marker = if selected { icons::SELECTED } else { "  " };
        let folder = if self.nav.is_some() { icons::FOLDER } else { "" };
        let name_style = if selected {
            theme.highlight()
        } else {
            theme.entity(entity)
        };

        let mut spans = vec![
            Span::styled(marker, theme.accent()),
            Span::styled(format!("{}{:<32}", folder, truncate(&entity.name, 32)), name_style),
            Span::raw(" "),
            Span::styled(
                truncate(entity.description.as_deref().unwrap_or(""), 48),
                theme.dimmed(),
            ),
        ];
        if let Some(badge) = badge(entity) {
            spans.push(Span::styled(format!("  {} {}", icons::LOCKED, badge), theme.warning()));
        }
        ListItem::new(Line::from(spans))
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let theme = ctx.theme;
        let mut spans = Vec::new();
        if let Some(nav) = &self.nav {
            spans.push(Span::styled(nav.breadcrumb(), theme.accent()));
        }
        if !self.search.is_empty() {
            if !spans.is_empty() {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(format!("Filter: {}", self.search), theme.dimmed()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_body(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let theme = ctx.theme;
        let key = self.query().key();
        let block = Block::default()
            .title(format!(" {} ", self.kind.plural_title()))
            .borders(Borders::ALL)
            .border_style(theme.border());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(page) = self.page_data(ctx.cache) else {
            match ctx.cache.status(&key) {
                Some(QueryStatus::Error) => {
                    let error = ctx.cache.error(&key).unwrap_or_default();
                    widgets::render_failure(
                        frame,
                        inner,
                        &self.kind.list_failed_message(),
                        &error,
                        Some("r to retry"),
                        theme,
                    );
                }
                _ => widgets::render_message(frame, inner, "Loading...", theme.dimmed()),
            }
            return;
        };

        if page.data.is_empty() {
            let message = format!("No {} found", self.kind.plural());
            widgets::render_message(frame, inner, &message, theme.dimmed());
            return;
        }

        let items: Vec<ListItem> = page
            .data
            .iter()
            .enumerate()
            .map(|(i, entity)| self.row_line(entity, i == self.selected, ctx))
            .collect();
        frame.render_widget(List::new(items), inner);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let line = Line::from(vec![
            Span::styled(self.pagination.label(), ctx.theme.accent()),
            Span::styled(
                format!("  ({} total)", self.pagination.total_count()),
                ctx.theme.dimmed(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Short tag for records the service will not delete
fn badge(entity: &Entity) -> Option<&'static str> {
    if entity.system {
        Some("system")
    } else if entity.platform_default || entity.admin_default {
        Some("default")
    } else {
        match entity.workspace_type.as_deref() {
            Some("root") => Some("root"),
            Some("default") => Some("default"),
            _ => None,
        }
    }
}

impl Screen for ListScreen {
    fn title(&self, _cache: &QueryCache) -> String {
        self.kind.plural_title().to_string()
    }

    fn queries(&self) -> Vec<Query> {
        vec![self.query()]
    }

    fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    fn dispatch_context(&self, _cache: &QueryCache) -> DispatchContext {
        DispatchContext::list(self.mode.kind())
            .read_only(self.read_only())
            .hierarchical(self.nav.is_some())
    }

    fn handle_action(&mut self, action: Action, cache: &QueryCache) -> Vec<Effect> {
        match self.mode.kind() {
            ModeKind::Create => self.handle_create(action),
            ModeKind::Search => self.handle_search(action),
            ModeKind::ConfirmDelete => self.handle_confirm(action),
            _ => self.handle_browse(action, cache),
        }
    }

    fn on_mutation(
        &mut self,
        mutation: &Mutation,
        result: &MutationResult,
        cache: &QueryCache,
    ) -> Vec<Effect> {
        if matches!(mutation, Mutation::Create { .. }) {
            if let ListMode::Create { submitting, .. } = &mut self.mode {
                if result.is_ok() {
                    self.mode = ListMode::Browse;
                } else {
                    *submitting = false;
                }
            }
        }
        self.sync(cache);
        completion_effects(mutation, result)
    }

    fn sync(&mut self, cache: &QueryCache) {
        let Some(page) = self.page_data(cache) else {
            return;
        };
        if self.pagination.set_total(page.meta.count) {
            // the page shrank away; its data is refetched under the new key
            self.selected = 0;
            return;
        }
        self.selected = clamp_index(self.selected, page.data.len());
    }

    fn selected_index(&self) -> usize {
        self.selected
    }

    fn visible_rows(&self, cache: &QueryCache) -> Vec<String> {
        self.rows(cache).into_iter().map(|e| e.name).collect()
    }

    fn render(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_header(frame, chunks[0], ctx);
        self.render_body(frame, chunks[1], ctx);
        self.render_footer(frame, chunks[2], ctx);

        match &self.mode {
            ListMode::Browse => {}
            ListMode::Create { form, .. } => {
                let title = format!("New {}", self.kind.label());
                widgets::render_form(frame, area, &title, form, ctx.theme);
            }
            ListMode::Search { input } => {
                widgets::render_prompt(frame, area, "Search by name", input, ctx.theme);
            }
            ListMode::ConfirmDelete { target } => {
                let question = format!(
                    "Delete {} '{}'?",
                    self.kind.label().to_lowercase(),
                    target.name
                );
                widgets::render_confirm(frame, area, &question, ctx.theme);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::QueryData;
    use crate::model::PageMeta;
    use pretty_assertions::assert_eq;

    fn seed_page(cache: &QueryCache, screen: &ListScreen, names: &[&str], count: usize) {
        let data = names
            .iter()
            .enumerate()
            .map(|(i, n)| Entity::new(screen.kind(), format!("id-{}", i), *n))
            .collect();
        let page = Page {
            data,
            meta: PageMeta {
                count,
                limit: screen.pagination().page_size(),
                offset: 0,
            },
        };
        cache.set_data(&screen.query().key(), QueryData::Page(page));
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Role, 12);
        seed_page(&cache, &screen, &["a", "b"], 2);

        screen.handle_action(Action::MoveUp, &cache);
        assert_eq!(screen.selected_index(), 0);
        screen.handle_action(Action::MoveDown, &cache);
        screen.handle_action(Action::MoveDown, &cache);
        assert_eq!(screen.selected_index(), 1);
    }

    #[test]
    fn test_search_resets_page_and_selection() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Group, 12);
        seed_page(&cache, &screen, &["a", "b", "c"], 30);
        screen.sync(&cache);
        screen.handle_action(Action::NextPage, &cache);
        screen.handle_action(Action::OpenSearch, &cache);
        for c in " ops ".chars() {
            screen.handle_action(Action::Input(c), &cache);
        }
        screen.handle_action(Action::Submit, &cache);

        assert_eq!(screen.search(), "ops");
        assert_eq!(screen.pagination().page(), 1);
        assert_eq!(screen.selected_index(), 0);
        assert_eq!(screen.mode(), ModeKind::Browse);
    }

    #[test]
    fn test_search_cancel_keeps_filter() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Group, 12);
        screen.handle_action(Action::OpenSearch, &cache);
        screen.handle_action(Action::Input('x'), &cache);
        screen.handle_action(Action::Cancel, &cache);
        assert_eq!(screen.search(), "");
    }

    #[test]
    fn test_empty_name_is_rejected_locally() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Role, 12);
        screen.handle_action(Action::OpenCreate, &cache);
        let effects = screen.handle_action(Action::Submit, &cache);
        assert_eq!(
            effects,
            vec![Effect::Status(StatusMessage::error("Name is required"))]
        );
        assert_eq!(screen.mode(), ModeKind::Create);
    }

    #[test]
    fn test_double_submit_is_ignored() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Role, 12);
        screen.handle_action(Action::OpenCreate, &cache);
        screen.handle_action(Action::Input('x'), &cache);
        let first = screen.handle_action(Action::Submit, &cache);
        let second = screen.handle_action(Action::Submit, &cache);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_protected_delete_is_refused() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Role, 12);
        let page = Page {
            data: vec![Entity::new(EntityKind::Role, "r-1", "Admin").with_system()],
            meta: PageMeta {
                count: 1,
                limit: 12,
                offset: 0,
            },
        };
        cache.set_data(&screen.query().key(), QueryData::Page(page));

        let effects = screen.handle_action(Action::OpenDelete, &cache);
        assert_eq!(
            effects,
            vec![Effect::Status(StatusMessage::error("Cannot delete system roles"))]
        );
        assert_eq!(screen.mode(), ModeKind::Browse);
    }

    #[test]
    fn test_workspace_create_uses_current_parent() {
        let cache = QueryCache::new();
        let mut screen = ListScreen::new(EntityKind::Workspace, 12);
        seed_page(&cache, &screen, &["Engineering"], 1);
        screen.handle_action(Action::Select, &cache);
        assert_eq!(screen.nav().map(NavigationPath::depth), Some(1));

        screen.handle_action(Action::OpenCreate, &cache);
        screen.handle_action(Action::Input('W'), &cache);
        let effects = screen.handle_action(Action::Submit, &cache);
        match &effects[0] {
            Effect::Mutate(Mutation::Create { draft, .. }) => {
                assert_eq!(draft.parent_id.as_deref(), Some("id-0"));
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_badges() {
        let ws = Entity::new(EntityKind::Workspace, "w", "Root").with_workspace_type("root");
        assert_eq!(badge(&ws), Some("root"));
        let role = Entity::new(EntityKind::Role, "r", "Ops");
        assert_eq!(badge(&role), None);
    }
}
