//! # RBAC API Abstraction Layer
//!
//! Trait and implementations for talking to the RBAC backend.
//!
//! ## Overview
//!
//! - [`RbacApi`] - Core trait: run a [`Query`] or apply a [`Mutation`]
//! - [`HttpApi`] - Production client over the REST endpoints
//! - [`MockApi`] - In-memory backend that records every call
//!
//! Screens never call the API directly. They describe queries and mutations,
//! and the runtime (or the test harness) executes them and writes the results
//! into the shared [`QueryCache`](crate::cache::QueryCache).
//!
//! ## Creating clients
//!
//! ```rust
//! use rbac_console::api::{create_api, RbacApi};
//! use rbac_console::config::ConsoleConfig;
//!
//! let config = ConsoleConfig::default();
//! let api = create_api(&config, true).unwrap();
//! assert_eq!(api.name(), "mock");
//! ```

mod http;
mod mock;

pub use http::HttpApi;
pub use mock::{MockApi, RecordedCall};

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::QueryKey;
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::model::{Draft, Entity, EntityKind, Page, RoleBinding};

/// Sub-collections (members, group roles) are fetched in one page of this size
pub const SUBCOLLECTION_LIMIT: usize = 100;

// ============================================================================
// API TRAIT
// ============================================================================

#[async_trait]
pub trait RbacApi: Send + Sync {
    /// Backend name ("http", "mock")
    fn name(&self) -> &str;

    /// Fetch data for a query
    async fn query(&self, query: &Query) -> Result<QueryData>;

    /// Apply a mutation; returns the created/updated record when there is one
    async fn mutate(&self, mutation: &Mutation) -> Result<Option<Entity>>;
}

// ============================================================================
// QUERIES
// ============================================================================

/// Which level of the workspace tree a list covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentFilter {
    /// Top level (no parent)
    Root,
    Children(String),
}

impl ParentFilter {
    fn key_segment(&self) -> String {
        match self {
            Self::Root => "root".to_string(),
            Self::Children(id) => format!("parent={}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ListParams {
    pub offset: usize,
    pub limit: usize,
    /// Server-side name filter
    pub name: Option<String>,
    pub parent: Option<ParentFilter>,
}

impl ListParams {
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            offset: page.saturating_sub(1) * page_size,
            limit: page_size,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn with_parent(mut self, parent: ParentFilter) -> Self {
        self.parent = Some(parent);
        self
    }

    fn key_segments(&self) -> Vec<String> {
        vec![
            self.parent
                .as_ref()
                .map(ParentFilter::key_segment)
                .unwrap_or_else(|| "all".to_string()),
            format!("name={}", self.name.as_deref().unwrap_or("")),
            format!("offset={}", self.offset),
            format!("limit={}", self.limit),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    List { kind: EntityKind, params: ListParams },
    Get { kind: EntityKind, id: String },
    /// Users in a group, or with `excluded` the users not in it
    GroupMembers { group_id: String, excluded: bool },
    /// Roles of a group, or with `excluded` the roles not assigned to it
    GroupRoles { group_id: String, excluded: bool },
    WorkspaceBindings { workspace_id: String },
}

impl Query {
    pub fn list(kind: EntityKind, params: ListParams) -> Self {
        Self::List { kind, params }
    }

    pub fn get(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Get {
            kind,
            id: id.into(),
        }
    }

    /// Cache key; the first segment is always the owning namespace
    pub fn key(&self) -> QueryKey {
        match self {
            Self::List { kind, params } => {
                let mut segments = vec![kind.plural().to_string(), "list".to_string()];
                segments.extend(params.key_segments());
                QueryKey::new(segments)
            }
            Self::Get { kind, id } => QueryKey::new([kind.plural(), "detail", id.as_str()]),
            Self::GroupMembers { group_id, excluded } => QueryKey::new([
                "groups",
                group_id.as_str(),
                if *excluded { "available-members" } else { "members" },
            ]),
            Self::GroupRoles { group_id, excluded } => QueryKey::new([
                "groups",
                group_id.as_str(),
                if *excluded { "available-roles" } else { "roles" },
            ]),
            Self::WorkspaceBindings { workspace_id } => {
                QueryKey::new(["workspaces", workspace_id.as_str(), "bindings"])
            }
        }
    }

    /// Short label used in logs and in recorded mock calls
    pub fn label(&self) -> String {
        match self {
            Self::List { kind, .. } => format!("list {}", kind.plural()),
            Self::Get { kind, .. } => format!("get {}", kind.label().to_lowercase()),
            Self::GroupMembers { excluded: false, .. } => "list group members".to_string(),
            Self::GroupMembers { excluded: true, .. } => "list available members".to_string(),
            Self::GroupRoles { excluded: false, .. } => "list group roles".to_string(),
            Self::GroupRoles { excluded: true, .. } => "list available roles".to_string(),
            Self::WorkspaceBindings { .. } => "list workspace bindings".to_string(),
        }
    }
}

/// Resolved query payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Page(Page),
    Entity(Entity),
    Bindings(Vec<RoleBinding>),
}

impl QueryData {
    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { kind: EntityKind, draft: Draft },
    Update { kind: EntityKind, id: String, draft: Draft },
    Delete { kind: EntityKind, id: String },
    AddMembers { group_id: String, usernames: Vec<String> },
    RemoveMembers { group_id: String, usernames: Vec<String> },
    AddGroupRoles { group_id: String, role_ids: Vec<String> },
    RemoveGroupRoles { group_id: String, role_ids: Vec<String> },
    /// Role access lists are replaced wholesale, so the current role rides along
    AddPermission { role: Box<Entity>, permission: String },
    RemovePermission { role: Box<Entity>, permission: String },
}

impl Mutation {
    pub fn label(&self) -> String {
        let kind = |k: &EntityKind| k.label().to_lowercase();
        match self {
            Self::Create { kind: k, .. } => format!("create {}", kind(k)),
            Self::Update { kind: k, .. } => format!("update {}", kind(k)),
            Self::Delete { kind: k, .. } => format!("delete {}", kind(k)),
            Self::AddMembers { .. } => "add group members".to_string(),
            Self::RemoveMembers { .. } => "remove group members".to_string(),
            Self::AddGroupRoles { .. } => "add group roles".to_string(),
            Self::RemoveGroupRoles { .. } => "remove group roles".to_string(),
            Self::AddPermission { .. } => "add role permission".to_string(),
            Self::RemovePermission { .. } => "remove role permission".to_string(),
        }
    }

    /// Status text shown when the mutation succeeds
    pub fn success_message(&self) -> String {
        match self {
            Self::Create { kind, .. } => kind.created_message(),
            Self::Update { kind, .. } => kind.updated_message(),
            Self::Delete { kind, .. } => kind.deleted_message(),
            Self::AddMembers { .. } => "Member added successfully".to_string(),
            Self::RemoveMembers { .. } => "Member removed successfully".to_string(),
            Self::AddGroupRoles { .. } => "Role added successfully".to_string(),
            Self::RemoveGroupRoles { .. } => "Role removed successfully".to_string(),
            Self::AddPermission { .. } => "Permission added successfully".to_string(),
            Self::RemovePermission { .. } => "Permission removed successfully".to_string(),
        }
    }

    /// Cache namespaces whose entries go stale once this succeeds
    pub fn invalidates(&self) -> Vec<QueryKey> {
        let ns = |names: &[&str]| names.iter().map(|n| QueryKey::new([*n])).collect();
        match self {
            Self::Create { kind, .. } | Self::Update { kind, .. } | Self::Delete { kind, .. } => {
                ns(&[kind.plural()])
            }
            Self::AddMembers { .. } | Self::RemoveMembers { .. } => ns(&["groups", "users"]),
            Self::AddGroupRoles { .. } | Self::RemoveGroupRoles { .. } => ns(&["groups", "roles"]),
            Self::AddPermission { .. } | Self::RemovePermission { .. } => ns(&["roles"]),
        }
    }

    /// Access list after applying a permission change
    pub fn next_permissions(&self) -> Option<Vec<String>> {
        match self {
            Self::AddPermission { role, permission } => {
                let mut next = role.permissions.clone();
                if !next.contains(permission) {
                    next.push(permission.clone());
                }
                Some(next)
            }
            Self::RemovePermission { role, permission } => Some(
                role.permissions
                    .iter()
                    .filter(|p| *p != permission)
                    .cloned()
                    .collect(),
            ),
            _ => None,
        }
    }
}

// ============================================================================
// FACTORY
// ============================================================================

/// Build the API client for this session
///
/// `mock` selects an in-memory backend seeded with demo data.
pub fn create_api(config: &ConsoleConfig, mock: bool) -> Result<Arc<dyn RbacApi>> {
    if mock {
        return Ok(Arc::new(MockApi::demo()));
    }
    Ok(Arc::new(HttpApi::new(config)?))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_page_offset() {
        let params = ListParams::page(3, 12);
        assert_eq!(params.offset, 24);
        assert_eq!(params.limit, 12);
        assert_eq!(ListParams::page(1, 12).offset, 0);
    }

    #[test]
    fn test_empty_name_filter_is_none() {
        let params = ListParams::page(1, 12).with_name("");
        assert_eq!(params.name, None);
    }

    #[test]
    fn test_query_keys_are_namespaced() {
        let list = Query::list(EntityKind::Role, ListParams::page(2, 12));
        assert_eq!(list.key().namespace(), "roles");
        assert_ne!(
            list.key(),
            Query::list(EntityKind::Role, ListParams::page(1, 12)).key()
        );

        let members = Query::GroupMembers {
            group_id: "g-1".into(),
            excluded: true,
        };
        assert_eq!(members.key().namespace(), "groups");
        assert!(members.key().to_string().contains("available-members"));
    }

    #[test]
    fn test_membership_invalidates_both_sides() {
        let m = Mutation::AddMembers {
            group_id: "g-1".into(),
            usernames: vec!["jdoe".into()],
        };
        let keys: Vec<String> = m.invalidates().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["groups", "users"]);
    }

    #[test]
    fn test_next_permissions() {
        let role = Entity::new(EntityKind::Role, "r-1", "Viewer")
            .with_permissions(["a:b:read", "a:b:write"]);
        let add = Mutation::AddPermission {
            role: Box::new(role.clone()),
            permission: "a:c:read".into(),
        };
        assert_eq!(add.next_permissions().unwrap().len(), 3);

        let remove = Mutation::RemovePermission {
            role: Box::new(role),
            permission: "a:b:read".into(),
        };
        assert_eq!(remove.next_permissions().unwrap(), vec!["a:b:write"]);
    }

    #[test]
    fn test_success_messages() {
        let m = Mutation::Delete {
            kind: EntityKind::Workspace,
            id: "ws-1".into(),
        };
        assert_eq!(m.success_message(), "Workspace deleted successfully");
        assert_eq!(m.label(), "delete workspace");
    }
}
