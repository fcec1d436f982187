//! Organization API implementation

use super::client::{Client, TenantContext, SYSTEM_ORG};
use super::common::{deserialize_null_default, single_match, ApiQueryParams, OpenApiReference};
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use tfplug::Context;

const ORGS_PATH: &str = "/cloudapi/1.0.0/orgs";

/// Organization as managed by a provider administrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmOrg {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub description: String,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub can_manage_orgs: bool,
    #[serde(default)]
    pub is_classic_tenant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<OpenApiReference>,

    // Read-only counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_vdc_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapp_count: Option<i64>,
    #[serde(
        default,
        rename = "runningVMCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub running_vm_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directly_managed_org_count: Option<i64>,
}

impl TmOrg {
    /// The provider org every installation has
    pub fn is_system(&self) -> bool {
        self.name.eq_ignore_ascii_case(SYSTEM_ORG)
    }
}

/// Orgs API for organization operations
pub struct OrgsApi<'a> {
    client: &'a Client,
}

impl<'a> OrgsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /cloudapi/1.0.0/orgs
    pub async fn list(&self) -> Result<Vec<TmOrg>, ApiError> {
        self.client
            .get_all(ORGS_PATH, &ApiQueryParams::new(), None)
            .await
    }

    /// GET /cloudapi/1.0.0/orgs/{id}
    pub async fn get_by_id(&self, id: &str) -> Result<TmOrg, ApiError> {
        self.client.get(&org_path(id), None).await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<TmOrg, ApiError> {
        let params = ApiQueryParams::new().filter_eq("name", name);
        let orgs: Vec<TmOrg> = self.client.get_all(ORGS_PATH, &params, None).await?;

        single_match(orgs, &format!("org '{}'", name))
    }

    /// POST /cloudapi/1.0.0/orgs
    pub async fn create(&self, ctx: &Context, org: &TmOrg) -> Result<TmOrg, ApiError> {
        self.client.post(ctx, ORGS_PATH, org, None).await
    }

    /// PUT /cloudapi/1.0.0/orgs/{id}
    pub async fn update(&self, ctx: &Context, org: &TmOrg) -> Result<TmOrg, ApiError> {
        self.client.put(ctx, &org_path(&org.id), org, None).await
    }

    /// DELETE /cloudapi/1.0.0/orgs/{id}
    ///
    /// Enabled orgs cannot be deleted, so they are disabled first.
    pub async fn delete(&self, ctx: &Context, org: &TmOrg) -> Result<(), ApiError> {
        if org.is_enabled {
            tracing::debug!("disabling org {} before deletion", org.name);
            let disabled = TmOrg {
                is_enabled: false,
                ..org.clone()
            };
            self.update(ctx, &disabled).await?;
        }

        self.client.delete(ctx, &org_path(&org.id), None).await
    }

    /// Tenant scope for entities owned by `org_id`. The System org and an
    /// empty id mean provider scope.
    pub async fn tenant_context(&self, org_id: &str) -> Result<Option<TenantContext>, ApiError> {
        if org_id.is_empty() {
            return Ok(None);
        }

        let org = self.get_by_id(org_id).await?;
        if org.is_system() {
            return Ok(None);
        }

        Ok(Some(TenantContext {
            org_id: org.id,
            org_name: org.name,
        }))
    }
}

fn org_path(id: &str) -> String {
    format!("{}/{}", ORGS_PATH, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::test_client;
    use mockito::{Matcher, Server};

    const ORG_JSON: &str = r#"{
        "id": "urn:vcloud:org:7d2b",
        "name": "tenant1",
        "displayName": "Tenant One",
        "description": "",
        "isEnabled": true,
        "canManageOrgs": false,
        "isClassicTenant": false,
        "managedBy": {"name": "System", "id": "urn:vcloud:org:a93c"},
        "orgVdcCount": 0,
        "catalogCount": 2,
        "vappCount": 0,
        "runningVMCount": 1,
        "userCount": 3,
        "diskCount": 0,
        "directlyManagedOrgCount": 0
    }"#;

    #[test]
    fn org_deserializes_counts() {
        let org: TmOrg = serde_json::from_str(ORG_JSON).unwrap();
        assert_eq!(org.display_name, "Tenant One");
        assert_eq!(org.running_vm_count, Some(1));
        assert_eq!(org.managed_by.as_ref().map(|m| m.name.as_str()), Some("System"));
        assert!(!org.is_system());
    }

    #[test]
    fn create_body_omits_computed_fields() {
        let org = TmOrg {
            name: "tenant1".to_string(),
            display_name: "Tenant One".to_string(),
            is_enabled: true,
            ..Default::default()
        };
        let body = serde_json::to_value(&org).unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("runningVMCount").is_none());
        assert_eq!(body["displayName"], "Tenant One");
    }

    #[tokio::test]
    async fn get_by_name_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cloudapi/1.0.0/orgs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter".to_string(), "name==tenant1".to_string()),
                Matcher::UrlEncoded("page".to_string(), "1".to_string()),
            ]))
            .with_body(format!(
                r#"{{"resultTotal":1,"pageCount":1,"page":1,"pageSize":128,"values":[{}]}}"#,
                ORG_JSON
            ))
            .create_async()
            .await;

        let client = test_client(&server.url());
        let org = client.orgs().get_by_name("tenant1").await.unwrap();

        assert_eq!(org.id, "urn:vcloud:org:7d2b");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_by_name_without_match_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/cloudapi/1.0.0/orgs")
            .match_query(Matcher::Any)
            .with_body(r#"{"resultTotal":0,"pageCount":0,"page":1,"pageSize":128,"values":[]}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client.orgs().get_by_name("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_by_name_with_several_matches_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/cloudapi/1.0.0/orgs")
            .match_query(Matcher::Any)
            .with_body(format!(
                r#"{{"resultTotal":2,"pageCount":1,"page":1,"pageSize":128,"values":[{},{}]}}"#,
                ORG_JSON,
                ORG_JSON.replace("urn:vcloud:org:7d2b", "urn:vcloud:org:8e3c")
            ))
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client.orgs().get_by_name("tenant1").await.unwrap_err();
        assert!(matches!(err, ApiError::Ambiguous(_)));
    }

    #[tokio::test]
    async fn delete_disables_enabled_org_first() {
        let mut server = Server::new_async().await;
        let disable = server
            .mock("PUT", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
            .match_body(Matcher::PartialJson(serde_json::json!({"isEnabled": false})))
            .with_body(ORG_JSON.replace(r#""isEnabled": true"#, r#""isEnabled": false"#))
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let org: TmOrg = serde_json::from_str(ORG_JSON).unwrap();
        client.orgs().delete(&Context::new(), &org).await.unwrap();

        disable.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn tenant_context_for_system_is_none() {
        let mut server = Server::new_async().await;
        let _system = server
            .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:a93c")
            .with_body(r#"{"id":"urn:vcloud:org:a93c","name":"System","isEnabled":true}"#)
            .create_async()
            .await;
        let _tenant = server
            .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
            .with_body(ORG_JSON)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let orgs = client.orgs();

        assert_eq!(orgs.tenant_context("").await.unwrap(), None);
        assert_eq!(
            orgs.tenant_context("urn:vcloud:org:a93c").await.unwrap(),
            None
        );
        assert_eq!(
            orgs.tenant_context("urn:vcloud:org:7d2b").await.unwrap(),
            Some(TenantContext {
                org_id: "urn:vcloud:org:7d2b".to_string(),
                org_name: "tenant1".to_string(),
            })
        );
    }
}
