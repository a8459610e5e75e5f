//! RBAC domain records
//!
//! A single [`Entity`] shape covers roles, groups, users and workspaces. The
//! fields each backend resource actually carries differ, so parsing is done
//! from raw JSON per [`EntityKind`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{RbacError, Result};

/// `application:resource:verb`, `*` allowed in any segment
static PERMISSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:\s]+:[^:\s]+:[^:\s]+$").expect("valid regex"));

pub const NAME_REQUIRED: &str = "Name is required";
pub const PERMISSION_REQUIRED: &str = "Permission is required";
pub const PERMISSION_FORMAT: &str = "Permission must be in the form application:resource:verb";

// ─────────────────────────────────────────────────────────────────────────────
// Entity kind
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Role,
    Group,
    User,
    Workspace,
}

impl EntityKind {
    /// Singular display label ("Role")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Role => "Role",
            Self::Group => "Group",
            Self::User => "User",
            Self::Workspace => "Workspace",
        }
    }

    /// Plural, lowercase; also the cache namespace for this kind
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Role => "roles",
            Self::Group => "groups",
            Self::User => "users",
            Self::Workspace => "workspaces",
        }
    }

    /// Plural heading ("Roles")
    pub fn plural_title(&self) -> &'static str {
        match self {
            Self::Role => "Roles",
            Self::Group => "Groups",
            Self::User => "Users",
            Self::Workspace => "Workspaces",
        }
    }

    /// Status text when deleting a protected entity is refused
    pub fn protected_delete_message(&self) -> &'static str {
        match self {
            Self::Role => "Cannot delete system roles",
            Self::Group => "Cannot delete system or default groups",
            Self::User => "Cannot delete users",
            Self::Workspace => "Cannot delete root/default workspaces",
        }
    }

    pub fn created_message(&self) -> String {
        format!("{} created successfully", self.label())
    }

    pub fn updated_message(&self) -> String {
        format!("{} updated successfully", self.label())
    }

    pub fn deleted_message(&self) -> String {
        format!("{} deleted successfully", self.label())
    }

    pub fn load_failed_message(&self) -> String {
        format!("Failed to load {}", self.label().to_lowercase())
    }

    pub fn list_failed_message(&self) -> String {
        format!("Failed to load {}", self.plural())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity
// ─────────────────────────────────────────────────────────────────────────────

/// A role, group, user or workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// `uuid` for roles/groups, `id` for workspaces, `username` for users
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub system: bool,
    pub platform_default: bool,
    pub admin_default: bool,
    /// Workspace type (`root`, `default`, `standard`)
    pub workspace_type: Option<String>,
    pub parent_id: Option<String>,
    /// Role access list, `application:resource:verb`
    pub permissions: Vec<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            description: None,
            system: false,
            platform_default: false,
            admin_default: false,
            workspace_type: None,
            parent_id: None,
            permissions: Vec::new(),
            created: None,
            modified: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn with_platform_default(mut self) -> Self {
        self.platform_default = true;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_workspace_type(mut self, ty: impl Into<String>) -> Self {
        self.workspace_type = Some(ty.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Platform-managed entities cannot be edited or deleted
    pub fn is_protected(&self) -> bool {
        self.system
            || self.platform_default
            || self.admin_default
            || matches!(self.workspace_type.as_deref(), Some("root") | Some("default"))
    }

    /// Parse a backend record
    pub fn from_json(kind: EntityKind, value: &Value) -> Result<Self> {
        let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let bool_field = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);

        let id = match kind {
            EntityKind::User => str_field("username"),
            EntityKind::Workspace => str_field("id"),
            EntityKind::Role | EntityKind::Group => str_field("uuid").or_else(|| str_field("id")),
        }
        .ok_or_else(|| {
            RbacError::Validation(format!("{} record without an id: {}", kind.label(), value))
        })?;

        let name = match kind {
            EntityKind::User => str_field("username"),
            _ => str_field("display_name")
                .filter(|s| !s.is_empty())
                .or_else(|| str_field("name")),
        }
        .unwrap_or_else(|| id.clone());

        let description = match kind {
            EntityKind::User => {
                let full: Vec<String> = [str_field("first_name"), str_field("last_name")]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect();
                if full.is_empty() {
                    str_field("email")
                } else {
                    Some(full.join(" "))
                }
            }
            _ => str_field("description"),
        };

        let permissions = value
            .get("access")
            .and_then(Value::as_array)
            .map(|access| {
                access
                    .iter()
                    .filter_map(|a| a.get("permission").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            kind,
            id,
            name,
            description,
            system: bool_field("system"),
            platform_default: bool_field("platform_default"),
            admin_default: bool_field("admin_default"),
            workspace_type: str_field("type"),
            parent_id: str_field("parent_id"),
            permissions,
            created: str_field("created"),
            modified: str_field("modified"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMeta {
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}

/// One page of a list response (`{data, meta}`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub data: Vec<Entity>,
    pub meta: PageMeta,
}

impl Page {
    pub fn from_json(kind: EntityKind, value: &Value) -> Result<Self> {
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| Entity::from_json(kind, item))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let meta = match value.get("meta") {
            Some(meta) => serde_json::from_value(meta.clone())?,
            None => PageMeta {
                count: data.len(),
                limit: data.len(),
                offset: 0,
            },
        };

        Ok(Self { data, meta })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role bindings (workspace detail, read-only)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub role_name: String,
    pub subject: String,
    pub subject_type: String,
}

impl RoleBinding {
    /// Flatten a by-subject binding record into one row per role
    pub fn from_json(value: &Value) -> Vec<Self> {
        let subject = value.get("subject");
        let subject_type = subject
            .and_then(|s| s.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("group")
            .to_string();
        let subject_name = subject
            .and_then(|s| {
                s.get("group")
                    .and_then(|g| g.get("name"))
                    .or_else(|| s.get("user").and_then(|u| u.get("username")))
                    .or_else(|| s.get("id"))
            })
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        value
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|r| r.get("name").and_then(Value::as_str))
                    .map(|role_name| Self {
                        role_name: role_name.to_string(),
                        subject: subject_name.clone(),
                        subject_type: subject_type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drafts
// ─────────────────────────────────────────────────────────────────────────────

/// Create/update payload collected by a form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub name: String,
    pub description: Option<String>,
    /// Workspace parent (create only)
    pub parent_id: Option<String>,
    /// Initial role access list (create only)
    pub permissions: Vec<String>,
}

impl Draft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trimmed copy, or a validation error when the name is blank
    pub fn validated(&self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RbacError::Validation(NAME_REQUIRED.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            parent_id: self.parent_id.clone(),
            permissions: self
                .permissions
                .iter()
                .map(|p| validate_permission(p))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Request body for the given resource
    pub fn to_json(&self, kind: EntityKind) -> Value {
        let mut body = json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
        });
        if kind == EntityKind::Role {
            body["display_name"] = json!(self.name);
            body["access"] = json!(self
                .permissions
                .iter()
                .map(|p| json!({ "permission": p, "resourceDefinitions": [] }))
                .collect::<Vec<_>>());
        }
        if let Some(parent) = &self.parent_id {
            body["parent_id"] = json!(parent);
        }
        body
    }
}

/// Check a permission string before it is sent anywhere
pub fn validate_permission(permission: &str) -> Result<String> {
    let permission = permission.trim();
    if permission.is_empty() {
        return Err(RbacError::Validation(PERMISSION_REQUIRED.to_string()));
    }
    if !PERMISSION_RE.is_match(permission) {
        return Err(RbacError::Validation(PERMISSION_FORMAT.to_string()));
    }
    Ok(permission.to_string())
}

/// Role body for a `PUT` that replaces the access list
pub fn role_update_body(role: &Entity, permissions: &[String]) -> Value {
    json!({
        "name": role.name,
        "display_name": role.name,
        "description": role.description.clone().unwrap_or_default(),
        "access": permissions
            .iter()
            .map(|p| json!({ "permission": p, "resourceDefinitions": [] }))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_json() {
        let value = json!({
            "uuid": "r-1",
            "name": "viewer",
            "display_name": "Viewer",
            "description": "Read things",
            "system": true,
            "access": [{"permission": "inventory:hosts:read"}],
        });
        let role = Entity::from_json(EntityKind::Role, &value).unwrap();
        assert_eq!(role.id, "r-1");
        assert_eq!(role.name, "Viewer");
        assert!(role.is_protected());
        assert_eq!(role.permissions, vec!["inventory:hosts:read"]);
    }

    #[test]
    fn test_user_uses_username_as_id() {
        let value = json!({"username": "jdoe", "first_name": "Jane", "last_name": "Doe"});
        let user = Entity::from_json(EntityKind::User, &value).unwrap();
        assert_eq!(user.id, "jdoe");
        assert_eq!(user.description.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_root_workspace_is_protected() {
        let value = json!({"id": "ws-root", "name": "Root", "type": "root"});
        let ws = Entity::from_json(EntityKind::Workspace, &value).unwrap();
        assert!(ws.is_protected());

        let value = json!({"id": "ws-1", "name": "Team", "type": "standard", "parent_id": "ws-root"});
        let ws = Entity::from_json(EntityKind::Workspace, &value).unwrap();
        assert!(!ws.is_protected());
        assert_eq!(ws.parent_id.as_deref(), Some("ws-root"));
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let value = json!({"name": "nameless"});
        assert!(Entity::from_json(EntityKind::Group, &value).is_err());
    }

    #[test]
    fn test_page_from_json() {
        let value = json!({
            "data": [{"uuid": "g-1", "name": "Admins"}],
            "meta": {"count": 25, "limit": 12, "offset": 12},
        });
        let page = Page::from_json(EntityKind::Group, &value).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.count, 25);
        assert_eq!(page.meta.offset, 12);
    }

    #[test]
    fn test_draft_requires_name() {
        let err = Draft::new("   ").validated().unwrap_err();
        assert_eq!(err.to_string(), NAME_REQUIRED);

        let draft = Draft {
            name: " ops ".into(),
            description: Some("  ".into()),
            ..Draft::default()
        }
        .validated()
        .unwrap();
        assert_eq!(draft.name, "ops");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_validate_permission() {
        assert_eq!(validate_permission(" rbac:*:read ").unwrap(), "rbac:*:read");
        assert_eq!(
            validate_permission("").unwrap_err().to_string(),
            PERMISSION_REQUIRED
        );
        assert_eq!(
            validate_permission("rbac:read").unwrap_err().to_string(),
            PERMISSION_FORMAT
        );
    }

    #[test]
    fn test_role_binding_rows() {
        let value = json!({
            "subject": {"type": "group", "group": {"name": "Admins"}},
            "roles": [{"name": "Viewer"}, {"name": "Editor"}],
        });
        let rows = RoleBinding::from_json(&value);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].role_name, "Editor");
        assert_eq!(rows[0].subject, "Admins");
    }
}
