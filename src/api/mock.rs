//! Mock backend for tests and the `--mock` demo
//!
//! Keeps roles, groups, users and workspaces in memory, applies the same
//! rules the service does (unique names, protected records) and records
//! every call so tests can assert on exactly which requests were made.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ListParams, Mutation, ParentFilter, Query, QueryData, RbacApi};
use crate::error::{RbacError, Result};
use crate::model::{Entity, EntityKind, Page, PageMeta, RoleBinding};

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub label: String,
    pub mutation: bool,
}

#[derive(Debug, Default)]
struct MockState {
    entities: Vec<Entity>,
    /// group id -> usernames
    members: HashMap<String, Vec<String>>,
    /// group id -> role ids
    group_roles: HashMap<String, Vec<String>>,
    /// workspace id -> bindings
    bindings: HashMap<String, Vec<RoleBinding>>,
    next_id: u64,
}

impl MockState {
    fn find(&self, kind: EntityKind, id: &str) -> Result<&Entity> {
        self.entities
            .iter()
            .find(|e| e.kind == kind && e.id == id)
            .ok_or_else(|| RbacError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    fn find_mut(&mut self, kind: EntityKind, id: &str) -> Result<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|e| e.kind == kind && e.id == id)
            .ok_or_else(|| RbacError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    fn page(items: Vec<Entity>, offset: usize, limit: usize) -> QueryData {
        let count = items.len();
        let data = items.into_iter().skip(offset).take(limit).collect();
        QueryData::Page(Page {
            data,
            meta: PageMeta {
                count,
                limit,
                offset,
            },
        })
    }

    fn list(&self, kind: EntityKind, params: &ListParams) -> QueryData {
        let needle = params.name.as_deref().map(str::to_lowercase);
        let items: Vec<Entity> = self
            .of_kind(kind)
            .filter(|e| match &needle {
                Some(n) => e.name.to_lowercase().contains(n),
                None => true,
            })
            .filter(|e| match &params.parent {
                Some(ParentFilter::Root) => e.parent_id.is_none(),
                Some(ParentFilter::Children(id)) => e.parent_id.as_deref() == Some(id.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        Self::page(items, params.offset, params.limit)
    }

    fn name_taken(&self, kind: EntityKind, name: &str, parent: Option<&str>, except: Option<&str>) -> bool {
        self.of_kind(kind).any(|e| {
            e.name.eq_ignore_ascii_case(name)
                && Some(e.id.as_str()) != except
                && (kind != EntityKind::Workspace || e.parent_id.as_deref() == parent)
        })
    }

    fn duplicate(kind: EntityKind) -> RbacError {
        RbacError::api(400, format!("{} with this name already exists.", kind.label()))
    }
}

pub struct MockApi {
    state: Mutex<MockState>,
    calls: Mutex<Vec<RecordedCall>>,
    /// (label prefix, message) consumed by the next matching call
    failures: Mutex<VecDeque<(String, String)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Add a record; existing records with the same kind and id are replaced
    pub fn insert(&self, entity: Entity) {
        let mut state = self.state.lock();
        state.entities.retain(|e| !(e.kind == entity.kind && e.id == entity.id));
        state.entities.push(entity);
    }

    pub fn with(self, entity: Entity) -> Self {
        self.insert(entity);
        self
    }

    pub fn with_member(self, group_id: &str, username: &str) -> Self {
        self.state
            .lock()
            .members
            .entry(group_id.to_string())
            .or_default()
            .push(username.to_string());
        self
    }

    pub fn with_group_role(self, group_id: &str, role_id: &str) -> Self {
        self.state
            .lock()
            .group_roles
            .entry(group_id.to_string())
            .or_default()
            .push(role_id.to_string());
        self
    }

    pub fn with_binding(self, workspace_id: &str, binding: RoleBinding) -> Self {
        self.state
            .lock()
            .bindings
            .entry(workspace_id.to_string())
            .or_default()
            .push(binding);
        self
    }

    /// `count` records of `kind` named `<prefix> 1..=count`
    pub fn with_many(self, kind: EntityKind, prefix: &str, count: usize) -> Self {
        for i in 1..=count {
            let id = format!("{}-{}", kind.plural(), i);
            self.insert(Entity::new(kind, id, format!("{} {}", prefix, i)));
        }
        self
    }

    /// Make the next call whose label starts with `label` fail with `message`
    pub fn fail_next(&self, label: &str, message: &str) {
        self.failures
            .lock()
            .push_back((label.to_string(), message.to_string()));
    }

    /// Every call seen so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls whose label starts with `label`
    pub fn count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.label.starts_with(label))
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.mutation).count()
    }

    pub fn entity(&self, kind: EntityKind, id: &str) -> Option<Entity> {
        self.state.lock().find(kind, id).ok().cloned()
    }

    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<Entity> {
        self.state
            .lock()
            .of_kind(kind)
            .find(|e| e.name == name)
            .cloned()
    }

    pub fn total(&self, kind: EntityKind) -> usize {
        self.state.lock().of_kind(kind).count()
    }

    pub fn members(&self, group_id: &str) -> Vec<String> {
        self.state
            .lock()
            .members
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn group_roles(&self, group_id: &str) -> Vec<String> {
        self.state
            .lock()
            .group_roles
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, label: String, mutation: bool) -> Result<()> {
        self.calls.lock().push(RecordedCall {
            label: label.clone(),
            mutation,
        });

        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|(prefix, _)| label.starts_with(prefix)) {
            if let Some((_, message)) = failures.remove(pos) {
                return Err(RbacError::api(400, message));
            }
        }
        Ok(())
    }

    /// Demo data for `--mock`
    pub fn demo() -> Self {
        let api = Self::new()
            .with(
                Entity::new(EntityKind::Role, "role-admin", "RBAC Administrator")
                    .with_description("Full access to RBAC")
                    .with_system()
                    .with_permissions(["rbac:*:*"]),
            )
            .with(
                Entity::new(EntityKind::Role, "role-viewer", "Inventory Viewer")
                    .with_description("Read inventory hosts")
                    .with_system()
                    .with_permissions(["inventory:hosts:read"]),
            )
            .with(
                Entity::new(EntityKind::Role, "role-ops", "Ops Engineer")
                    .with_description("Custom ops role")
                    .with_permissions(["inventory:hosts:read", "inventory:hosts:write"]),
            )
            .with(
                Entity::new(EntityKind::Group, "group-default", "Default access")
                    .with_description("Every user in the organization")
                    .with_platform_default(),
            )
            .with(Entity::new(EntityKind::Group, "group-ops", "Operations").with_description("On-call team"))
            .with(Entity::new(EntityKind::User, "jdoe", "jdoe").with_description("Jane Doe"))
            .with(Entity::new(EntityKind::User, "asmith", "asmith").with_description("Alex Smith"))
            .with(Entity::new(EntityKind::User, "kwong", "kwong").with_description("Kim Wong"))
            .with(
                Entity::new(EntityKind::Workspace, "ws-root", "Root Workspace")
                    .with_workspace_type("root"),
            )
            .with(
                Entity::new(EntityKind::Workspace, "ws-default", "Default Workspace")
                    .with_workspace_type("default")
                    .with_parent("ws-root"),
            )
            .with(
                Entity::new(EntityKind::Workspace, "ws-eng", "Engineering")
                    .with_workspace_type("standard")
                    .with_parent("ws-default"),
            )
            .with(
                Entity::new(EntityKind::Workspace, "ws-eng-web", "Web")
                    .with_workspace_type("standard")
                    .with_parent("ws-eng"),
            )
            .with_member("group-ops", "jdoe")
            .with_group_role("group-ops", "role-ops")
            .with_binding(
                "ws-eng",
                RoleBinding {
                    role_name: "Ops Engineer".into(),
                    subject: "Operations".into(),
                    subject_type: "group".into(),
                },
            );
        api.state.lock().next_id = 100;
        api
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RbacApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query(&self, query: &Query) -> Result<QueryData> {
        self.record(query.label(), false)?;
        let state = self.state.lock();

        match query {
            Query::List { kind, params } => Ok(state.list(*kind, params)),
            Query::Get { kind, id } => state.find(*kind, id).cloned().map(QueryData::Entity),
            Query::GroupMembers { group_id, excluded } => {
                state.find(EntityKind::Group, group_id)?;
                let current = state.members.get(group_id).cloned().unwrap_or_default();
                let users = state
                    .of_kind(EntityKind::User)
                    .filter(|u| current.contains(&u.id) != *excluded)
                    .cloned()
                    .collect();
                Ok(MockState::page(users, 0, super::SUBCOLLECTION_LIMIT))
            }
            Query::GroupRoles { group_id, excluded } => {
                state.find(EntityKind::Group, group_id)?;
                let current = state.group_roles.get(group_id).cloned().unwrap_or_default();
                let roles = state
                    .of_kind(EntityKind::Role)
                    .filter(|r| current.contains(&r.id) != *excluded)
                    .cloned()
                    .collect();
                Ok(MockState::page(roles, 0, super::SUBCOLLECTION_LIMIT))
            }
            Query::WorkspaceBindings { workspace_id } => {
                state.find(EntityKind::Workspace, workspace_id)?;
                Ok(QueryData::Bindings(
                    state.bindings.get(workspace_id).cloned().unwrap_or_default(),
                ))
            }
        }
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<Option<Entity>> {
        self.record(mutation.label(), true)?;
        let mut state = self.state.lock();

        match mutation {
            Mutation::Create { kind, draft } => {
                let draft = draft.validated()?;
                if state.name_taken(*kind, &draft.name, draft.parent_id.as_deref(), None) {
                    return Err(MockState::duplicate(*kind));
                }
                if let Some(parent) = &draft.parent_id {
                    state.find(EntityKind::Workspace, parent)?;
                }
                state.next_id += 1;
                let mut entity = Entity::new(
                    *kind,
                    format!("{}-{}", kind.plural(), state.next_id),
                    draft.name.clone(),
                );
                entity.description = draft.description.clone();
                entity.parent_id = draft.parent_id.clone();
                entity.permissions = draft.permissions.clone();
                if *kind == EntityKind::Workspace {
                    entity.workspace_type = Some("standard".to_string());
                }
                state.entities.push(entity.clone());
                Ok(Some(entity))
            }
            Mutation::Update { kind, id, draft } => {
                let draft = draft.validated()?;
                let parent = state.find(*kind, id)?.parent_id.clone();
                if state.name_taken(*kind, &draft.name, parent.as_deref(), Some(id)) {
                    return Err(MockState::duplicate(*kind));
                }
                let entity = state.find_mut(*kind, id)?;
                if entity.system {
                    return Err(RbacError::api(400, "System records cannot be modified."));
                }
                entity.name = draft.name.clone();
                entity.description = draft.description.clone();
                Ok(Some(entity.clone()))
            }
            Mutation::Delete { kind, id } => {
                if state.find(*kind, id)?.is_protected() {
                    return Err(RbacError::api(400, kind.protected_delete_message()));
                }
                state.entities.retain(|e| !(e.kind == *kind && e.id == *id));
                state.members.remove(id);
                state.group_roles.remove(id);
                for roles in state.group_roles.values_mut() {
                    roles.retain(|r| r != id);
                }
                Ok(None)
            }
            Mutation::AddMembers { group_id, usernames } => {
                state.find(EntityKind::Group, group_id)?;
                for username in usernames {
                    state.find(EntityKind::User, username)?;
                }
                let members = state.members.entry(group_id.clone()).or_default();
                for username in usernames {
                    if !members.contains(username) {
                        members.push(username.clone());
                    }
                }
                Ok(None)
            }
            Mutation::RemoveMembers { group_id, usernames } => {
                state.find(EntityKind::Group, group_id)?;
                if let Some(members) = state.members.get_mut(group_id) {
                    members.retain(|m| !usernames.contains(m));
                }
                Ok(None)
            }
            Mutation::AddGroupRoles { group_id, role_ids } => {
                state.find(EntityKind::Group, group_id)?;
                for role_id in role_ids {
                    state.find(EntityKind::Role, role_id)?;
                }
                let roles = state.group_roles.entry(group_id.clone()).or_default();
                for role_id in role_ids {
                    if !roles.contains(role_id) {
                        roles.push(role_id.clone());
                    }
                }
                Ok(None)
            }
            Mutation::RemoveGroupRoles { group_id, role_ids } => {
                state.find(EntityKind::Group, group_id)?;
                if let Some(roles) = state.group_roles.get_mut(group_id) {
                    roles.retain(|r| !role_ids.contains(r));
                }
                Ok(None)
            }
            Mutation::AddPermission { role, .. } | Mutation::RemovePermission { role, .. } => {
                let permissions = mutation.next_permissions().unwrap_or_default();
                let stored = state.find_mut(EntityKind::Role, &role.id)?;
                stored.permissions = permissions;
                Ok(Some(stored.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Draft;

    #[tokio::test]
    async fn test_list_paginates_in_insertion_order() {
        let api = MockApi::new().with_many(EntityKind::Workspace, "Workspace", 25);
        let data = api
            .query(&Query::list(EntityKind::Workspace, ListParams::page(2, 12)))
            .await
            .unwrap();
        let page = data.as_page().unwrap();
        assert_eq!(page.meta.count, 25);
        assert_eq!(page.data.len(), 12);
        assert_eq!(page.data[0].name, "Workspace 13");
    }

    #[tokio::test]
    async fn test_duplicate_name_fails() {
        let api = MockApi::new();
        let create = Mutation::Create {
            kind: EntityKind::Role,
            draft: Draft::new("Auditor"),
        };
        assert!(api.mutate(&create).await.is_ok());
        let err = api.mutate(&create).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(api.total(EntityKind::Role), 1);
    }

    #[tokio::test]
    async fn test_protected_delete_is_refused() {
        let api = MockApi::demo();
        let err = api
            .mutate(&Mutation::Delete {
                kind: EntityKind::Role,
                id: "role-admin".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete system roles");
    }

    #[tokio::test]
    async fn test_excluded_members_are_the_complement() {
        let api = MockApi::demo();
        let available = api
            .query(&Query::GroupMembers {
                group_id: "group-ops".into(),
                excluded: true,
            })
            .await
            .unwrap();
        let names: Vec<String> = available.as_page().unwrap().data.iter().map(|u| u.id.clone()).collect();
        assert_eq!(names, vec!["asmith", "kwong"]);
    }

    #[tokio::test]
    async fn test_records_calls_and_injects_failures() {
        let api = MockApi::demo();
        api.fail_next("delete", "boom");
        let err = api
            .mutate(&Mutation::Delete {
                kind: EntityKind::Role,
                id: "role-ops".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(api.entity(EntityKind::Role, "role-ops").is_some());
        assert_eq!(api.count("delete role"), 1);
        assert_eq!(api.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_workspace_root_filter() {
        let api = MockApi::demo();
        let data = api
            .query(&Query::list(
                EntityKind::Workspace,
                ListParams::page(1, 12).with_parent(ParentFilter::Root),
            ))
            .await
            .unwrap();
        let page = data.as_page().unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "ws-root");
    }
}
