//! Detail screen
//!
//! Shows one role, group, user or workspace with numbered tabs. Sub-collection
//! tabs (members, roles, permissions) support add and remove; the info tab
//! supports edit. Protected records are read-only here except for delete,
//! which is refused with a status message.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs};
use ratatui::Frame;

use super::events::{Action, DispatchContext};
use super::screen::{completion_effects, Effect, MutationResult, Navigation, RenderContext, Screen};
use super::state::{clamp_index, Form, ModeKind, TabKind, TextInput};
use super::status::StatusMessage;
use super::theme::{icons, ConsoleTheme};
use super::widgets::{self, utils};
use crate::api::{Mutation, Query, QueryData};
use crate::cache::{QueryCache, QueryStatus};
use crate::model::{validate_permission, Entity, EntityKind};

/// One line of a sub-collection tab or picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub label: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    Member(String),
    Role { id: String, name: String },
    Permission(String),
}

impl RemoveTarget {
    fn question(&self) -> String {
        match self {
            Self::Member(username) => format!("Remove member '{}'?", username),
            Self::Role { name, .. } => format!("Remove role '{}'?", name),
            Self::Permission(permission) => format!("Remove permission '{}'?", permission),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailMode {
    Browse,
    Edit { form: Form, submitting: bool },
    AddMember { cursor: usize, submitting: bool },
    AddRole { cursor: usize, submitting: bool },
    AddPermission { input: TextInput, submitting: bool },
    ConfirmRemove { target: RemoveTarget },
    ConfirmDelete,
}

impl DetailMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Browse => ModeKind::Browse,
            Self::Edit { .. } => ModeKind::Edit,
            Self::AddMember { .. } => ModeKind::AddMember,
            Self::AddRole { .. } => ModeKind::AddRole,
            Self::AddPermission { .. } => ModeKind::AddPermission,
            Self::ConfirmRemove { .. } => ModeKind::ConfirmRemove,
            Self::ConfirmDelete => ModeKind::ConfirmDelete,
        }
    }

    /// The mode is holding a form open until `mutation` settles
    fn awaits(&self, mutation: &Mutation) -> bool {
        matches!(
            (self, mutation),
            (Self::Edit { .. }, Mutation::Update { .. })
                | (Self::AddMember { .. }, Mutation::AddMembers { .. })
                | (Self::AddRole { .. }, Mutation::AddGroupRoles { .. })
                | (Self::AddPermission { .. }, Mutation::AddPermission { .. })
        )
    }

    fn submitting(&mut self) -> Option<&mut bool> {
        match self {
            Self::Edit { submitting, .. }
            | Self::AddMember { submitting, .. }
            | Self::AddRole { submitting, .. }
            | Self::AddPermission { submitting, .. } => Some(submitting),
            _ => None,
        }
    }
}

enum Load {
    Loading,
    Failed(String),
    Ready(Entity),
}

pub struct DetailScreen {
    kind: EntityKind,
    id: String,
    tabs: &'static [TabKind],
    active: usize,
    mode: DetailMode,
    selected: usize,
}

impl DetailScreen {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            tabs: TabKind::for_kind(kind),
            active: 0,
            mode: DetailMode::Browse,
            selected: 0,
        }
    }

    pub fn active_tab(&self) -> TabKind {
        self.tabs.get(self.active).copied().unwrap_or(TabKind::Info)
    }

    pub fn detail_mode(&self) -> &DetailMode {
        &self.mode
    }

    fn primary(&self) -> Query {
        Query::get(self.kind, self.id.clone())
    }

    fn tab_query(&self, tab: TabKind, available: bool) -> Option<Query> {
        match tab {
            TabKind::Members => Some(Query::GroupMembers {
                group_id: self.id.clone(),
                excluded: available,
            }),
            TabKind::Roles => Some(Query::GroupRoles {
                group_id: self.id.clone(),
                excluded: available,
            }),
            TabKind::Bindings if !available => Some(Query::WorkspaceBindings {
                workspace_id: self.id.clone(),
            }),
            _ => None,
        }
    }

    fn load(&self, cache: &QueryCache) -> Load {
        let key = self.primary().key();
        if let Some(entity) = cache.data(&key).and_then(|d| d.as_entity().cloned()) {
            return Load::Ready(entity);
        }
        match cache.status(&key) {
            Some(QueryStatus::Error) => Load::Failed(cache.error(&key).unwrap_or_default()),
            _ => Load::Loading,
        }
    }

    fn entity(&self, cache: &QueryCache) -> Option<Entity> {
        match self.load(cache) {
            Load::Ready(entity) => Some(entity),
            _ => None,
        }
    }

    fn page_rows(&self, query: Option<Query>, cache: &QueryCache) -> Vec<Row> {
        let Some(query) = query else {
            return Vec::new();
        };
        match cache.data(&query.key()) {
            Some(QueryData::Page(page)) => page
                .data
                .into_iter()
                .map(|e| Row {
                    label: e.name.clone(),
                    detail: e.description.unwrap_or_default(),
                    id: e.id,
                })
                .collect(),
            Some(QueryData::Bindings(bindings)) => bindings
                .into_iter()
                .map(|b| Row {
                    id: format!("{}:{}", b.role_name, b.subject),
                    label: b.role_name,
                    detail: format!("{} {}", b.subject_type, b.subject),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Rows of a tab as currently cached
    fn tab_rows(&self, tab: TabKind, cache: &QueryCache) -> Vec<Row> {
        match tab {
            TabKind::Info => Vec::new(),
            TabKind::Permissions => self
                .entity(cache)
                .map(|role| {
                    role.permissions
                        .into_iter()
                        .map(|p| Row {
                            id: p.clone(),
                            label: p,
                            detail: String::new(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            _ => self.page_rows(self.tab_query(tab, false), cache),
        }
    }

    /// Candidates for the open picker
    fn available_rows(&self, cache: &QueryCache) -> Vec<Row> {
        self.page_rows(self.tab_query(self.active_tab(), true), cache)
    }

    /// Why a sub-collection query has no rows to show, if its fetch failed
    fn query_failure(&self, query: Option<Query>, cache: &QueryCache) -> Option<String> {
        let key = query?.key();
        match cache.status(&key) {
            Some(QueryStatus::Error) => Some(cache.error(&key).unwrap_or_default()),
            _ => None,
        }
    }

    fn tab_failure(&self, tab: TabKind, cache: &QueryCache) -> Option<String> {
        self.query_failure(self.tab_query(tab, false), cache)
            .map(|error| format!("Failed to load {}: {}", tab.title().to_lowercase(), error))
    }

    fn picker_failure(&self, cache: &QueryCache) -> Option<String> {
        let noun = match self.mode {
            DetailMode::AddMember { .. } => "available users",
            _ => "available roles",
        };
        self.query_failure(self.tab_query(self.active_tab(), true), cache)
            .map(|error| format!("Failed to load {}: {}", noun, error))
    }

    fn refresh(&self) -> Vec<Effect> {
        vec![
            Effect::Invalidate(self.queries().iter().map(Query::key).collect()),
            Effect::Status(StatusMessage::success("Refreshed")),
        ]
    }

    // ─── Reducers ───────────────────────────────────────────────────────────

    fn handle_browse(&mut self, action: Action, entity: Entity, cache: &QueryCache) -> Vec<Effect> {
        let tab = self.active_tab();
        match action {
            Action::MoveUp => self.selected = self.selected.saturating_sub(1),
            Action::MoveDown => {
                if self.selected + 1 < self.tab_rows(tab, cache).len() {
                    self.selected += 1;
                }
            }
            Action::SwitchTab(index) if index < self.tabs.len() => {
                self.active = index;
                self.selected = 0;
            }
            Action::OpenEdit => {
                self.mode = DetailMode::Edit {
                    form: Form::from_entity(&entity),
                    submitting: false,
                };
            }
            Action::OpenAdd => {
                self.mode = match tab {
                    TabKind::Members => DetailMode::AddMember {
                        cursor: 0,
                        submitting: false,
                    },
                    TabKind::Roles => DetailMode::AddRole {
                        cursor: 0,
                        submitting: false,
                    },
                    TabKind::Permissions => DetailMode::AddPermission {
                        input: TextInput::default(),
                        submitting: false,
                    },
                    _ => return Vec::new(),
                };
            }
            Action::OpenRemove => {
                let Some(row) = self.tab_rows(tab, cache).into_iter().nth(self.selected) else {
                    return Vec::new();
                };
                let target = match tab {
                    TabKind::Members => RemoveTarget::Member(row.id),
                    TabKind::Roles => RemoveTarget::Role {
                        id: row.id,
                        name: row.label,
                    },
                    TabKind::Permissions => RemoveTarget::Permission(row.id),
                    _ => return Vec::new(),
                };
                self.mode = DetailMode::ConfirmRemove { target };
            }
            Action::OpenDelete => {
                if entity.is_protected() {
                    return vec![Effect::Status(StatusMessage::error(
                        self.kind.protected_delete_message(),
                    ))];
                }
                self.mode = DetailMode::ConfirmDelete;
            }
            Action::Refresh => return self.refresh(),
            Action::Leave => return vec![Effect::Navigate(Navigation::Back)],
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_edit(&mut self, action: Action) -> Vec<Effect> {
        let (kind, id) = (self.kind, self.id.clone());
        let DetailMode::Edit { form, submitting } = &mut self.mode else {
            return Vec::new();
        };

        match action {
            Action::Input(c) => form.input(c),
            Action::Backspace => form.backspace(),
            Action::NextField => form.next_field(),
            Action::Cancel => self.mode = DetailMode::Browse,
            Action::Submit => {
                if *submitting {
                    return Vec::new();
                }
                return match form.draft().validated() {
                    Ok(draft) => {
                        *submitting = true;
                        vec![Effect::Mutate(Mutation::Update { kind, id, draft })]
                    }
                    Err(err) => vec![Effect::Status(StatusMessage::error(err.to_string()))],
                };
            }
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_picker(&mut self, action: Action, cache: &QueryCache) -> Vec<Effect> {
        let available = self.available_rows(cache);
        let failure = self.picker_failure(cache);
        let group_id = self.id.clone();
        let (cursor, submitting, is_member) = match &mut self.mode {
            DetailMode::AddMember { cursor, submitting } => (cursor, submitting, true),
            DetailMode::AddRole { cursor, submitting } => (cursor, submitting, false),
            _ => return Vec::new(),
        };

        match action {
            Action::MoveUp => *cursor = cursor.saturating_sub(1),
            Action::MoveDown => {
                if *cursor + 1 < available.len() {
                    *cursor += 1;
                }
            }
            Action::Cancel => self.mode = DetailMode::Browse,
            Action::Submit => {
                if *submitting {
                    return Vec::new();
                }
                let Some(row) = available.into_iter().nth(*cursor) else {
                    let message = match failure {
                        Some(failure) => failure,
                        None if is_member => "No users available to add".to_string(),
                        None => "No roles available to add".to_string(),
                    };
                    return vec![Effect::Status(StatusMessage::error(message))];
                };
                *submitting = true;
                let mutation = if is_member {
                    Mutation::AddMembers {
                        group_id,
                        usernames: vec![row.id],
                    }
                } else {
                    Mutation::AddGroupRoles {
                        group_id,
                        role_ids: vec![row.id],
                    }
                };
                return vec![Effect::Mutate(mutation)];
            }
            Action::Refresh => return self.refresh(),
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_add_permission(&mut self, action: Action, entity: Entity) -> Vec<Effect> {
        let DetailMode::AddPermission { input, submitting } = &mut self.mode else {
            return Vec::new();
        };

        match action {
            Action::Input(c) => input.push(c),
            Action::Backspace => input.backspace(),
            Action::Cancel => self.mode = DetailMode::Browse,
            Action::Submit => {
                if *submitting {
                    return Vec::new();
                }
                let permission = match validate_permission(input.as_str()) {
                    Ok(permission) => permission,
                    Err(err) => return vec![Effect::Status(StatusMessage::error(err.to_string()))],
                };
                if entity.permissions.contains(&permission) {
                    return vec![Effect::Status(StatusMessage::error(
                        "Permission already assigned",
                    ))];
                }
                *submitting = true;
                return vec![Effect::Mutate(Mutation::AddPermission {
                    role: Box::new(entity),
                    permission,
                })];
            }
            Action::Quit => return vec![Effect::Navigate(Navigation::Quit)],
            _ => {}
        }
        Vec::new()
    }

    fn handle_confirm(&mut self, action: Action, entity: Entity) -> Vec<Effect> {
        match action {
            Action::Confirm => {
                let mode = std::mem::replace(&mut self.mode, DetailMode::Browse);
                let mutation = match mode {
                    DetailMode::ConfirmDelete => Mutation::Delete {
                        kind: self.kind,
                        id: self.id.clone(),
                    },
                    DetailMode::ConfirmRemove { target } => match target {
                        RemoveTarget::Member(username) => Mutation::RemoveMembers {
                            group_id: self.id.clone(),
                            usernames: vec![username],
                        },
                        RemoveTarget::Role { id, .. } => Mutation::RemoveGroupRoles {
                            group_id: self.id.clone(),
                            role_ids: vec![id],
                        },
                        RemoveTarget::Permission(permission) => Mutation::RemovePermission {
                            role: Box::new(entity),
                            permission,
                        },
                    },
                    _ => return Vec::new(),
                };
                vec![Effect::Mutate(mutation)]
            }
            Action::Cancel => {
                self.mode = DetailMode::Browse;
                Vec::new()
            }
            Action::Refresh => self.refresh(),
            Action::Quit => vec![Effect::Navigate(Navigation::Quit)],
            _ => Vec::new(),
        }
    }

    // ─── Rendering ──────────────────────────────────────────────────────────

    fn render_info(&self, frame: &mut Frame, area: Rect, entity: &Entity, theme: &ConsoleTheme) {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let mut fields: Vec<(&str, String)> = vec![
            ("Name", entity.name.clone()),
            ("Description", entity.description.clone().unwrap_or_default()),
            ("ID", entity.id.clone()),
        ];
        match self.kind {
            EntityKind::Role => {
                fields.push(("System", yes_no(entity.system).to_string()));
                fields.push(("Admin default", yes_no(entity.admin_default).to_string()));
                fields.push(("Permissions", entity.permissions.len().to_string()));
            }
            EntityKind::Group => {
                fields.push(("System", yes_no(entity.system).to_string()));
                fields.push(("Default", yes_no(entity.platform_default).to_string()));
            }
            EntityKind::Workspace => {
                fields.push(("Type", entity.workspace_type.clone().unwrap_or_default()));
                fields.push(("Parent", entity.parent_id.clone().unwrap_or_default()));
            }
            EntityKind::User => {}
        }
        if let Some(created) = &entity.created {
            fields.push(("Created", created.clone()));
        }
        if let Some(modified) = &entity.modified {
            fields.push(("Modified", modified.clone()));
        }

        let mut lines: Vec<Line> = fields
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{:<14}", label), theme.dimmed()),
                    Span::styled(value, theme.text()),
                ])
            })
            .collect();
        if entity.is_protected() {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                format!("{} Protected record", icons::LOCKED),
                theme.warning(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_rows(&self, frame: &mut Frame, area: Rect, rows: &[Row], cursor: Option<usize>, theme: &ConsoleTheme) {
        if rows.is_empty() {
            let message = format!("No {}", self.active_tab().title().to_lowercase());
            widgets::render_message(frame, area, &message, theme.dimmed());
            return;
        }
        let items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let selected = cursor == Some(i);
                let marker = if selected { icons::SELECTED } else { "  " };
                let style = if selected { theme.highlight() } else { theme.text() };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, theme.accent()),
                    Span::styled(format!("{:<36}", utils::truncate(&row.label, 36)), style),
                    Span::styled(utils::truncate(&row.detail, 40), theme.dimmed()),
                ]))
            })
            .collect();
        frame.render_widget(List::new(items), area);
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect, cursor: usize, ctx: &RenderContext) {
        let rect = utils::centered_rect(60, 12, area);
        frame.render_widget(Clear, rect);
        let title = match self.mode {
            DetailMode::AddMember { .. } => " Add member ",
            _ => " Add role ",
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(ctx.theme.modal_border());
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        if let Some(failure) = self.picker_failure(ctx.cache) {
            widgets::render_message(frame, inner, &failure, ctx.theme.error());
            return;
        }
        let rows = self.available_rows(ctx.cache);
        self.render_rows(frame, inner, &rows, Some(cursor), ctx.theme);
    }
}

impl Screen for DetailScreen {
    fn title(&self, cache: &QueryCache) -> String {
        match self.entity(cache) {
            Some(entity) => format!("{}: {}", self.kind.label(), entity.name),
            None => format!("{} {}", self.kind.label(), self.id),
        }
    }

    fn queries(&self) -> Vec<Query> {
        let mut queries = vec![self.primary()];
        queries.extend(self.tabs.iter().filter_map(|tab| self.tab_query(*tab, false)));
        if self.mode.kind().is_picker() {
            queries.extend(self.tab_query(self.active_tab(), true));
        }
        queries
    }

    fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    fn dispatch_context(&self, cache: &QueryCache) -> DispatchContext {
        let locked = self
            .entity(cache)
            .map(|entity| entity.is_protected())
            .unwrap_or(true);
        DispatchContext::detail(self.mode.kind(), self.active_tab(), self.tabs.len())
            .read_only(self.kind == EntityKind::User)
            .locked(locked)
    }

    fn handle_action(&mut self, action: Action, cache: &QueryCache) -> Vec<Effect> {
        // until the record loads only leaving works
        let Some(entity) = self.entity(cache) else {
            return match action {
                Action::Leave | Action::Cancel => vec![Effect::Navigate(Navigation::Back)],
                Action::Quit => vec![Effect::Navigate(Navigation::Quit)],
                _ => Vec::new(),
            };
        };

        match self.mode.kind() {
            ModeKind::Edit => self.handle_edit(action),
            ModeKind::AddMember | ModeKind::AddRole => self.handle_picker(action, cache),
            ModeKind::AddPermission => self.handle_add_permission(action, entity),
            ModeKind::ConfirmDelete | ModeKind::ConfirmRemove => self.handle_confirm(action, entity),
            _ => self.handle_browse(action, entity, cache),
        }
    }

    fn on_mutation(
        &mut self,
        mutation: &Mutation,
        result: &MutationResult,
        cache: &QueryCache,
    ) -> Vec<Effect> {
        if self.mode.awaits(mutation) {
            if result.is_ok() {
                self.mode = DetailMode::Browse;
            } else if let Some(submitting) = self.mode.submitting() {
                *submitting = false;
            }
        }

        let mut effects = completion_effects(mutation, result);
        if result.is_ok() && matches!(mutation, Mutation::Delete { .. }) {
            effects.push(Effect::Navigate(Navigation::Back));
        }
        self.sync(cache);
        effects
    }

    fn sync(&mut self, cache: &QueryCache) {
        let len = self.tab_rows(self.active_tab(), cache).len();
        self.selected = clamp_index(self.selected, len);
        let available = self.available_rows(cache).len();
        if let DetailMode::AddMember { cursor, .. } | DetailMode::AddRole { cursor, .. } = &mut self.mode {
            *cursor = clamp_index(*cursor, available);
        }
    }

    fn selected_index(&self) -> usize {
        self.selected
    }

    fn visible_rows(&self, cache: &QueryCache) -> Vec<String> {
        self.tab_rows(self.active_tab(), cache)
            .into_iter()
            .map(|row| row.label)
            .collect()
    }

    fn render(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let theme = ctx.theme;
        let entity = match self.load(ctx.cache) {
            Load::Ready(entity) => entity,
            Load::Loading => {
                widgets::render_message(frame, area, "Loading...", theme.dimmed());
                return;
            }
            Load::Failed(error) => {
                widgets::render_failure(
                    frame,
                    area,
                    &self.kind.load_failed_message(),
                    &error,
                    Some("Esc to go back"),
                    theme,
                );
                return;
            }
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3)])
            .split(area);

        let titles: Vec<String> = self
            .tabs
            .iter()
            .enumerate()
            .map(|(i, tab)| format!("{} {}", i + 1, tab.title()))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active)
            .style(theme.dimmed())
            .highlight_style(theme.highlight());
        frame.render_widget(tabs, chunks[0]);

        let block = Block::default()
            .title(format!(" {} ", self.active_tab().title()))
            .borders(Borders::ALL)
            .border_style(theme.border());
        let inner = block.inner(chunks[1]);
        frame.render_widget(block, chunks[1]);

        match self.active_tab() {
            TabKind::Info => self.render_info(frame, inner, &entity, theme),
            tab => match self.tab_failure(tab, ctx.cache) {
                Some(failure) => widgets::render_message(frame, inner, &failure, theme.error()),
                None => {
                    let rows = self.tab_rows(tab, ctx.cache);
                    let cursor = tab.is_editable().then_some(self.selected);
                    self.render_rows(frame, inner, &rows, cursor, theme);
                }
            },
        }

        match &self.mode {
            DetailMode::Browse => {}
            DetailMode::Edit { form, .. } => {
                let title = format!("Edit {}", self.kind.label().to_lowercase());
                widgets::render_form(frame, area, &title, form, theme);
            }
            DetailMode::AddMember { cursor, .. } | DetailMode::AddRole { cursor, .. } => {
                self.render_picker(frame, area, *cursor, ctx);
            }
            DetailMode::AddPermission { input, .. } => {
                widgets::render_prompt(frame, area, "Add permission (app:resource:verb)", input, theme);
            }
            DetailMode::ConfirmRemove { target } => {
                widgets::render_confirm(frame, area, &target.question(), theme);
            }
            DetailMode::ConfirmDelete => {
                let question = format!(
                    "Delete {} '{}'?",
                    self.kind.label().to_lowercase(),
                    entity.name
                );
                widgets::render_confirm(frame, area, &question, theme);
            }
        }
    }
}
