//! Seeding - bulk creation from a declarative payload
//!
//! Collections are processed roles → groups → workspaces so groups can
//! reference roles created earlier in the same run. A failed entry never
//! aborts the batch; it is counted and the next entry is attempted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::{ListParams, Mutation, Query, RbacApi, SUBCOLLECTION_LIMIT};
use crate::error::{RbacError, Result};
use crate::model::{Draft, EntityKind};

/// Notice shown instead of a summary when a payload has nothing to do
pub const NO_OPERATIONS: &str = "No operations";

// ─────────────────────────────────────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedPayload {
    #[serde(default)]
    pub roles: Option<Vec<RoleSeed>>,
    #[serde(default)]
    pub groups: Option<Vec<GroupSeed>>,
    #[serde(default)]
    pub workspaces: Option<Vec<WorkspaceSeed>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Role names to assign after creation
    #[serde(default)]
    pub roles: Vec<String>,
    /// Usernames to add after creation
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl SeedPayload {
    /// Read a payload file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(serde_json::from_str(&content)?),
        }
    }

    /// Total entries across all collections
    pub fn operation_count(&self) -> usize {
        self.roles.as_ref().map_or(0, Vec::len)
            + self.groups.as_ref().map_or(0, Vec::len)
            + self.workspaces.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub created: usize,
    pub failed: usize,
    /// One line per failure, and per attachment problem on created groups
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub roles: Option<CollectionSummary>,
    pub groups: Option<CollectionSummary>,
    pub workspaces: Option<CollectionSummary>,
    /// Every attempted collection finished without failures
    pub success: bool,
}

impl SeedSummary {
    pub fn collections(&self) -> Vec<(&'static str, &CollectionSummary)> {
        [
            ("roles", self.roles.as_ref()),
            ("groups", self.groups.as_ref()),
            ("workspaces", self.workspaces.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, summary)| summary.map(|s| (name, s)))
        .collect()
    }

    fn finish(mut self) -> Self {
        self.success = self.collections().iter().all(|(_, s)| s.failed == 0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Payload was empty; nothing attempted and no completion callback
    NoOperations,
    Completed(SeedSummary),
}

// ─────────────────────────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────────────────────────

/// Create everything in `payload`, calling `on_complete` once when at least
/// one entry was attempted
pub async fn run_seed<F>(api: &dyn RbacApi, payload: &SeedPayload, on_complete: F) -> SeedOutcome
where
    F: FnOnce(&SeedSummary),
{
    if payload.is_empty() {
        tracing::info!("seed payload has no operations");
        return SeedOutcome::NoOperations;
    }

    let mut summary = SeedSummary::default();

    if let Some(roles) = payload.roles.as_ref().filter(|r| !r.is_empty()) {
        let mut collection = CollectionSummary::default();
        for seed in roles {
            let draft = Draft {
                name: seed.name.clone(),
                description: seed.description.clone(),
                permissions: seed.permissions.clone(),
                ..Draft::default()
            };
            record(&mut collection, "role", &seed.name, create(api, EntityKind::Role, draft).await);
        }
        summary.roles = Some(collection);
    }

    if let Some(groups) = payload.groups.as_ref().filter(|g| !g.is_empty()) {
        let mut collection = CollectionSummary::default();
        for seed in groups {
            let draft = Draft {
                name: seed.name.clone(),
                description: seed.description.clone(),
                ..Draft::default()
            };
            match create(api, EntityKind::Group, draft).await {
                Ok(group_id) => {
                    collection.created += 1;
                    if let Err(e) = attach(api, &group_id, seed).await {
                        tracing::warn!(group = %seed.name, error = %e, "seeded group attachments failed");
                        collection.errors.push(format!("group '{}': {}", seed.name, e));
                    }
                }
                Err(e) => record(&mut collection, "group", &seed.name, Err(e)),
            }
        }
        summary.groups = Some(collection);
    }

    if let Some(workspaces) = payload.workspaces.as_ref().filter(|w| !w.is_empty()) {
        let mut collection = CollectionSummary::default();
        for seed in workspaces {
            let draft = Draft {
                name: seed.name.clone(),
                description: seed.description.clone(),
                parent_id: seed.parent_id.clone(),
                ..Draft::default()
            };
            record(
                &mut collection,
                "workspace",
                &seed.name,
                create(api, EntityKind::Workspace, draft).await,
            );
        }
        summary.workspaces = Some(collection);
    }

    let summary = summary.finish();
    tracing::info!(success = summary.success, "seed finished");
    on_complete(&summary);
    SeedOutcome::Completed(summary)
}

fn record(collection: &mut CollectionSummary, what: &str, name: &str, result: Result<String>) {
    match result {
        Ok(_) => collection.created += 1,
        Err(e) => {
            tracing::warn!(kind = what, name, error = %e, "seed entry failed");
            collection.failed += 1;
            collection.errors.push(format!("{} '{}': {}", what, name, e));
        }
    }
}

/// Create one record, returning its id
async fn create(api: &dyn RbacApi, kind: EntityKind, draft: Draft) -> Result<String> {
    let draft = draft.validated()?;
    let name = draft.name.clone();
    let created = api.mutate(&Mutation::Create { kind, draft }).await?;
    match created {
        Some(entity) => Ok(entity.id),
        None => find_id(api, kind, &name).await,
    }
}

async fn find_id(api: &dyn RbacApi, kind: EntityKind, name: &str) -> Result<String> {
    let params = ListParams::page(1, SUBCOLLECTION_LIMIT).with_name(name);
    let data = api.query(&Query::list(kind, params)).await?;
    data.as_page()
        .and_then(|page| page.data.iter().find(|e| e.name.eq_ignore_ascii_case(name)))
        .map(|e| e.id.clone())
        .ok_or_else(|| RbacError::Validation(format!("{} '{}' not found", kind.label().to_lowercase(), name)))
}

async fn attach(api: &dyn RbacApi, group_id: &str, seed: &GroupSeed) -> Result<()> {
    if !seed.roles.is_empty() {
        let mut role_ids = Vec::with_capacity(seed.roles.len());
        for role in &seed.roles {
            role_ids.push(find_id(api, EntityKind::Role, role).await?);
        }
        api.mutate(&Mutation::AddGroupRoles {
            group_id: group_id.to_string(),
            role_ids,
        })
        .await?;
    }
    if !seed.members.is_empty() {
        api.mutate(&Mutation::AddMembers {
            group_id: group_id.to_string(),
            usernames: seed.members.clone(),
        })
        .await?;
    }
    Ok(())
}
