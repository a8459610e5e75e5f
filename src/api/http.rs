//! REST client for the RBAC service
//!
//! v1 endpoints for roles, groups and principals; v2 for workspaces and
//! role bindings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use super::{ListParams, Mutation, ParentFilter, Query, QueryData, RbacApi, SUBCOLLECTION_LIMIT};
use crate::config::ConsoleConfig;
use crate::error::{RbacError, Result};
use crate::model::{role_update_body, Entity, EntityKind, Page, RoleBinding};

const V1: &str = "api/rbac/v1/";
const V2: &str = "api/rbac/v2/";

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
    identity: Option<String>,
}

impl HttpApi {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let mut base = Url::parse(&config.api.url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            token: config.api.token.clone(),
            identity: config.api.identity.clone(),
        })
    }

    fn collection_path(kind: EntityKind) -> String {
        match kind {
            EntityKind::Role => format!("{}roles/", V1),
            EntityKind::Group => format!("{}groups/", V1),
            EntityKind::User => format!("{}principals/", V1),
            EntityKind::Workspace => format!("{}workspaces/", V2),
        }
    }

    fn item_path(kind: EntityKind, id: &str) -> String {
        format!("{}{}/", Self::collection_path(kind), id)
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn list_pairs(kind: EntityKind, params: &ListParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", params.limit.to_string()),
            ("offset", params.offset.to_string()),
        ];
        if let Some(name) = &params.name {
            let field = if kind == EntityKind::User { "usernames" } else { "name" };
            pairs.push((field, name.clone()));
        }
        match &params.parent {
            Some(ParentFilter::Root) => pairs.push(("type", "root".to_string())),
            Some(ParentFilter::Children(id)) => pairs.push(("parent_id", id.clone())),
            None => {}
        }
        pairs
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
        tracing::debug!(method = %method, path = %url.path(), query = url.query().unwrap_or(""), "rbac request");

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(identity) = &self.identity {
            request = request.header("x-rh-identity", identity);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RbacError::from_body(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path, params)?;
        self.send(Method::GET, url, None).await
    }

    async fn subcollection(
        &self,
        group_id: &str,
        sub: &str,
        kind: EntityKind,
        flag: Option<&str>,
    ) -> Result<QueryData> {
        let mut params = vec![
            ("limit", SUBCOLLECTION_LIMIT.to_string()),
            ("offset", "0".to_string()),
        ];
        if let Some(flag) = flag {
            params.push((flag, "true".to_string()));
        }
        let path = format!("{}{}/", Self::item_path(EntityKind::Group, group_id), sub);
        let value = self.get_json(&path, &params).await?;
        Ok(QueryData::Page(Page::from_json(kind, &value)?))
    }

    fn entity_from(kind: EntityKind, value: &Value) -> Result<Option<Entity>> {
        if value.is_null() {
            return Ok(None);
        }
        Entity::from_json(kind, value).map(Some)
    }
}

#[async_trait]
impl RbacApi for HttpApi {
    fn name(&self) -> &str {
        "http"
    }

    async fn query(&self, query: &Query) -> Result<QueryData> {
        match query {
            Query::List { kind, params } => {
                let value = self
                    .get_json(&Self::collection_path(*kind), &Self::list_pairs(*kind, params))
                    .await?;
                Ok(QueryData::Page(Page::from_json(*kind, &value)?))
            }
            Query::Get { kind, id } => {
                let value = self.get_json(&Self::item_path(*kind, id), &[]).await?;
                Ok(QueryData::Entity(Entity::from_json(*kind, &value)?))
            }
            Query::GroupMembers { group_id, excluded } => {
                self.subcollection(
                    group_id,
                    "principals",
                    EntityKind::User,
                    excluded.then_some("excluded"),
                )
                .await
            }
            Query::GroupRoles { group_id, excluded } => {
                self.subcollection(group_id, "roles", EntityKind::Role, excluded.then_some("exclude"))
                    .await
            }
            Query::WorkspaceBindings { workspace_id } => {
                let params = [
                    ("resource_id", workspace_id.clone()),
                    ("resource_type", "workspace".to_string()),
                ];
                let value = self
                    .get_json(&format!("{}role-bindings/by-subject/", V2), &params)
                    .await?;
                let bindings = value
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().flat_map(RoleBinding::from_json).collect())
                    .unwrap_or_default();
                Ok(QueryData::Bindings(bindings))
            }
        }
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<Option<Entity>> {
        match mutation {
            Mutation::Create { kind, draft } => {
                let url = self.url(&Self::collection_path(*kind), &[])?;
                let value = self.send(Method::POST, url, Some(draft.to_json(*kind))).await?;
                Self::entity_from(*kind, &value)
            }
            Mutation::Update { kind, id, draft } => {
                // roles are patched so their access list is left alone
                let method = match kind {
                    EntityKind::Group => Method::PUT,
                    _ => Method::PATCH,
                };
                let mut body = draft.to_json(*kind);
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("access");
                }
                let url = self.url(&Self::item_path(*kind, id), &[])?;
                let value = self.send(method, url, Some(body)).await?;
                Self::entity_from(*kind, &value)
            }
            Mutation::Delete { kind, id } => {
                let url = self.url(&Self::item_path(*kind, id), &[])?;
                self.send(Method::DELETE, url, None).await?;
                Ok(None)
            }
            Mutation::AddMembers { group_id, usernames } => {
                let path = format!("{}principals/", Self::item_path(EntityKind::Group, group_id));
                let body = json!({
                    "principals": usernames.iter().map(|u| json!({ "username": u })).collect::<Vec<_>>(),
                });
                let value = self.send(Method::POST, self.url(&path, &[])?, Some(body)).await?;
                Self::entity_from(EntityKind::Group, &value)
            }
            Mutation::RemoveMembers { group_id, usernames } => {
                let path = format!("{}principals/", Self::item_path(EntityKind::Group, group_id));
                let url = self.url(&path, &[("usernames", usernames.join(","))])?;
                self.send(Method::DELETE, url, None).await?;
                Ok(None)
            }
            Mutation::AddGroupRoles { group_id, role_ids } => {
                let path = format!("{}roles/", Self::item_path(EntityKind::Group, group_id));
                let body = json!({ "roles": role_ids });
                self.send(Method::POST, self.url(&path, &[])?, Some(body)).await?;
                Ok(None)
            }
            Mutation::RemoveGroupRoles { group_id, role_ids } => {
                let path = format!("{}roles/", Self::item_path(EntityKind::Group, group_id));
                let url = self.url(&path, &[("roles", role_ids.join(","))])?;
                self.send(Method::DELETE, url, None).await?;
                Ok(None)
            }
            Mutation::AddPermission { role, .. } | Mutation::RemovePermission { role, .. } => {
                let permissions = mutation.next_permissions().unwrap_or_default();
                let url = self.url(&Self::item_path(EntityKind::Role, &role.id), &[])?;
                let value = self
                    .send(Method::PUT, url, Some(role_update_body(role, &permissions)))
                    .await?;
                Self::entity_from(EntityKind::Role, &value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(url: &str) -> HttpApi {
        let mut config = ConsoleConfig::default();
        config.api.url = url.to_string();
        HttpApi::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = api("https://console.example.com/proxy");
        let url = api.url("api/rbac/v1/roles/", &[]).unwrap();
        assert_eq!(url.as_str(), "https://console.example.com/proxy/api/rbac/v1/roles/");
    }

    #[test]
    fn test_list_pairs() {
        let params = ListParams::page(2, 12)
            .with_name("ops")
            .with_parent(ParentFilter::Children("ws-1".into()));
        let pairs = HttpApi::list_pairs(EntityKind::Workspace, &params);
        assert!(pairs.contains(&("offset", "12".to_string())));
        assert!(pairs.contains(&("name", "ops".to_string())));
        assert!(pairs.contains(&("parent_id", "ws-1".to_string())));

        let pairs = HttpApi::list_pairs(EntityKind::User, &ListParams::page(1, 12).with_name("jd"));
        assert!(pairs.contains(&("usernames", "jd".to_string())));
    }

    #[test]
    fn test_paths() {
        assert_eq!(HttpApi::item_path(EntityKind::Workspace, "ws-1"), "api/rbac/v2/workspaces/ws-1/");
        assert_eq!(HttpApi::collection_path(EntityKind::User), "api/rbac/v1/principals/");
    }
}
