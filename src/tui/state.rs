//! Screen state shared by the list and detail state machines
//!
//! Modes are closed enums per screen; [`ModeKind`] is the flat view of them
//! the dispatcher matches on.

use crate::model::{Draft, Entity, EntityKind};

// ─────────────────────────────────────────────────────────────────────────────
// Mode
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Browse,
    Create,
    Edit,
    ConfirmDelete,
    Search,
    AddMember,
    AddRole,
    AddPermission,
    ConfirmRemove,
}

impl ModeKind {
    /// Modes where printable keys are typed into a field
    pub fn is_text_entry(&self) -> bool {
        matches!(self, Self::Create | Self::Edit | Self::Search | Self::AddPermission)
    }

    pub fn is_confirm(&self) -> bool {
        matches!(self, Self::ConfirmDelete | Self::ConfirmRemove)
    }

    /// Modes with a cursor over the collection of things that can be added
    pub fn is_picker(&self) -> bool {
        matches!(self, Self::AddMember | Self::AddRole)
    }

    /// Create and edit forms have a second field
    pub fn has_fields(&self) -> bool {
        matches!(self, Self::Create | Self::Edit)
    }
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Browse => "BROWSE",
            Self::Create => "CREATE",
            Self::Edit => "EDIT",
            Self::ConfirmDelete => "CONFIRM DELETE",
            Self::Search => "SEARCH",
            Self::AddMember => "ADD MEMBER",
            Self::AddRole => "ADD ROLE",
            Self::AddPermission => "ADD PERMISSION",
            Self::ConfirmRemove => "CONFIRM REMOVE",
        };
        write!(f, "{}", label)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Detail tabs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabKind {
    Info,
    Members,
    Roles,
    Permissions,
    Bindings,
}

impl TabKind {
    /// Tabs shown on a detail screen, in key order (1, 2, 3)
    pub fn for_kind(kind: EntityKind) -> &'static [TabKind] {
        match kind {
            EntityKind::Role => &[Self::Info, Self::Permissions],
            EntityKind::Group => &[Self::Info, Self::Members, Self::Roles],
            EntityKind::Workspace => &[Self::Info, Self::Bindings],
            EntityKind::User => &[Self::Info],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Members => "Members",
            Self::Roles => "Roles",
            Self::Permissions => "Permissions",
            Self::Bindings => "Bindings",
        }
    }

    /// Tabs whose rows can be added and removed with `a` / `x`
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Members | Self::Roles | Self::Permissions)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text input
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn push(&mut self, c: char) {
        self.value.push(c);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create / edit form
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    Description,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub name: TextInput,
    pub description: TextInput,
    pub focus: FormField,
}

impl Form {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            name: TextInput::new(entity.name.clone()),
            description: TextInput::new(entity.description.clone().unwrap_or_default()),
            focus: FormField::Name,
        }
    }

    fn focused(&mut self) -> &mut TextInput {
        match self.focus {
            FormField::Name => &mut self.name,
            FormField::Description => &mut self.description,
        }
    }

    pub fn input(&mut self, c: char) {
        self.focused().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused().backspace();
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            FormField::Name => FormField::Description,
            FormField::Description => FormField::Name,
        };
    }

    /// Unvalidated draft
    pub fn draft(&self) -> Draft {
        Draft {
            name: self.name.as_str().to_string(),
            description: Some(self.description.as_str().to_string()),
            ..Draft::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────────────────────────

/// `1 <= page <= total_pages()` at all times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    total_count: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// At least one page, even when empty
    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size).max(1)
    }

    /// Advance one page; `false` (and no change) on the last page
    pub fn next(&mut self) -> bool {
        if self.page < self.total_pages() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; `false` (and no change) on page 1
    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Record a new total; returns `true` when the page had to be clamped
    pub fn set_total(&mut self, total_count: usize) -> bool {
        self.total_count = total_count;
        let last = self.total_pages();
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }

    /// "Page 3 of 3"
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages())
    }
}

/// Keep a cursor inside `0..len` (0 when empty)
pub fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let mut p = Pagination::new(12);
        p.set_total(25);
        assert_eq!(p.total_pages(), 3);
        assert!(!p.prev(), "page 1 is the floor");
        assert!(p.next());
        assert!(p.next());
        assert_eq!(p.label(), "Page 3 of 3");
        assert!(!p.next(), "last page is the ceiling");
        assert_eq!(p.page(), 3);
    }

    #[test]
    fn test_pagination_empty_has_one_page() {
        let mut p = Pagination::new(12);
        p.set_total(0);
        assert_eq!(p.total_pages(), 1);
        assert!(!p.next());
    }

    #[test]
    fn test_shrinking_total_clamps_page() {
        let mut p = Pagination::new(12);
        p.set_total(25);
        p.next();
        p.next();
        assert!(p.set_total(24));
        assert_eq!(p.page(), 2);
    }

    #[test]
    fn test_form_fields() {
        let mut form = Form::default();
        form.input('o');
        form.input('p');
        form.next_field();
        form.input('x');
        form.backspace();
        form.input('d');
        let draft = form.draft();
        assert_eq!(draft.name, "op");
        assert_eq!(draft.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_mode_groups() {
        assert!(ModeKind::Search.is_text_entry());
        assert!(!ModeKind::Search.has_fields());
        assert!(ModeKind::ConfirmRemove.is_confirm());
        assert!(ModeKind::AddRole.is_picker());
        assert!(!ModeKind::Browse.is_text_entry());
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(5, 0), 0);
        assert_eq!(clamp_index(5, 3), 2);
        assert_eq!(clamp_index(1, 3), 1);
    }
}
