//! Content library API implementation

use super::client::{Client, TenantContext};
use super::common::{deserialize_null_default, single_match, ApiQueryParams, OpenApiReference};
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use tfplug::Context;

const CONTENT_LIBRARIES_PATH: &str = "/cloudapi/vcf/contentLibraries";

/// `PROVIDER` libraries belong to the System org, `TENANT` ones to an org
pub const PROVIDER_LIBRARY: &str = "PROVIDER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLibrary {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub description: String,
    #[serde(default)]
    pub auto_attach: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub creation_date: String,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub library_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OpenApiReference>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub storage_classes: Vec<OpenApiReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_config: Option<SubscriptionConfig>,
    #[serde(default, skip_serializing)]
    pub version_number: i64,
}

/// Makes a library a subscriber of a published one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConfig {
    pub subscription_url: String,
    /// Write-only, never returned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl ContentLibrary {
    pub fn is_provider(&self) -> bool {
        self.library_type == PROVIDER_LIBRARY
    }
}

/// Content libraries API, scoped by an optional tenant
pub struct ContentLibrariesApi<'a> {
    client: &'a Client,
}

impl<'a> ContentLibrariesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /cloudapi/vcf/contentLibraries/{id}
    pub async fn get_by_id(
        &self,
        id: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<ContentLibrary, ApiError> {
        self.client.get(&library_path(id), tenant).await
    }

    pub async fn get_by_name(
        &self,
        name: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<ContentLibrary, ApiError> {
        let params = ApiQueryParams::new().filter_eq("name", name);
        let libraries: Vec<ContentLibrary> = self
            .client
            .get_all(CONTENT_LIBRARIES_PATH, &params, tenant)
            .await?;

        single_match(libraries, &format!("content library '{}'", name))
    }

    /// POST /cloudapi/vcf/contentLibraries
    pub async fn create(
        &self,
        ctx: &Context,
        library: &ContentLibrary,
        tenant: Option<&TenantContext>,
    ) -> Result<ContentLibrary, ApiError> {
        self.client
            .post(ctx, CONTENT_LIBRARIES_PATH, library, tenant)
            .await
    }

    /// PUT /cloudapi/vcf/contentLibraries/{id}
    pub async fn update(
        &self,
        ctx: &Context,
        id: &str,
        library: &ContentLibrary,
        tenant: Option<&TenantContext>,
    ) -> Result<ContentLibrary, ApiError> {
        self.client
            .put(ctx, &library_path(id), library, tenant)
            .await
    }

    /// DELETE /cloudapi/vcf/contentLibraries/{id}
    pub async fn delete(
        &self,
        ctx: &Context,
        id: &str,
        force: bool,
        recursive: bool,
        tenant: Option<&TenantContext>,
    ) -> Result<(), ApiError> {
        let query = ApiQueryParams::new()
            .add("forceDelete", force)
            .add("recursiveDelete", recursive)
            .to_query_string();

        self.client
            .delete(ctx, &format!("{}{}", library_path(id), query), tenant)
            .await
    }
}

fn library_path(id: &str) -> String {
    format!("{}/{}", CONTENT_LIBRARIES_PATH, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::test_client;
    use mockito::{Matcher, Server};

    const LIBRARY_JSON: &str = r#"{
        "id": "urn:vcloud:contentLibrary:41c2",
        "name": "templates",
        "description": "golden images",
        "autoAttach": true,
        "creationDate": "2025-01-30T10:15:00.000Z",
        "isShared": true,
        "isSubscribed": false,
        "libraryType": "PROVIDER",
        "org": {"name": "System", "id": "urn:vcloud:org:a93c"},
        "storageClasses": [{"name": "vSAN Default", "id": "urn:vcloud:storageClass:1"}],
        "versionNumber": 3
    }"#;

    #[test]
    fn library_deserializes() {
        let library: ContentLibrary = serde_json::from_str(LIBRARY_JSON).unwrap();
        assert!(library.is_provider());
        assert_eq!(library.storage_classes[0].id, "urn:vcloud:storageClass:1");
        assert_eq!(library.version_number, 3);
        assert!(library.subscription_config.is_none());
    }

    #[test]
    fn request_body_skips_read_only_fields() {
        let library = ContentLibrary {
            name: "templates".to_string(),
            auto_attach: true,
            storage_classes: vec![OpenApiReference::from_id("urn:vcloud:storageClass:1")],
            subscription_config: Some(SubscriptionConfig {
                subscription_url: "https://publisher/lib.json".to_string(),
                password: String::new(),
            }),
            version_number: 9,
            ..Default::default()
        };

        let body = serde_json::to_value(&library).unwrap();
        assert!(body.get("versionNumber").is_none());
        assert!(body.get("libraryType").is_none());
        assert_eq!(body["storageClasses"][0]["id"], "urn:vcloud:storageClass:1");
        assert!(body["subscriptionConfig"].get("password").is_none());
    }

    #[tokio::test]
    async fn create_follows_task_to_the_new_library() {
        let mut server = Server::new_async().await;
        let task_url = format!("{}/api/task/t9", server.url());
        let create = server
            .mock("POST", "/cloudapi/vcf/contentLibraries")
            .match_header("x-vmware-vcloud-auth-context", "tenant1")
            .with_status(202)
            .with_header("location", &task_url)
            .create_async()
            .await;
        let task = server
            .mock("GET", "/api/task/t9")
            .with_body(r#"{"id":"t9","status":"success","owner":{"id":"urn:vcloud:contentLibrary:41c2"}}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/cloudapi/vcf/contentLibraries/urn:vcloud:contentLibrary:41c2")
            .match_header("x-vmware-vcloud-tenant-context", "7d2b")
            .with_body(LIBRARY_JSON)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let tenant = TenantContext {
            org_id: "urn:vcloud:org:7d2b".to_string(),
            org_name: "tenant1".to_string(),
        };
        let request = ContentLibrary {
            name: "templates".to_string(),
            ..Default::default()
        };
        let created = client
            .content_libraries()
            .create(&Context::new(), &request, Some(&tenant))
            .await
            .unwrap();

        assert_eq!(created.id, "urn:vcloud:contentLibrary:41c2");
        create.assert_async().await;
        task.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn get_by_name_rejects_duplicate_names() {
        let mut server = Server::new_async().await;
        let tenant_library = LIBRARY_JSON
            .replace("urn:vcloud:contentLibrary:41c2", "urn:vcloud:contentLibrary:tenantA")
            .replace(r#""PROVIDER""#, r#""TENANT""#);
        let _list = server
            .mock("GET", "/cloudapi/vcf/contentLibraries")
            .match_query(Matcher::Any)
            .with_body(format!(
                r#"{{"pageCount":1,"page":1,"values":[{},{}]}}"#,
                tenant_library, LIBRARY_JSON
            ))
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client
            .content_libraries()
            .get_by_name("templates", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Ambiguous(_)));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn delete_passes_flags() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/cloudapi/vcf/contentLibraries/urn:vcloud:contentLibrary:41c2")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("forceDelete".to_string(), "true".to_string()),
                Matcher::UrlEncoded("recursiveDelete".to_string(), "false".to_string()),
            ]))
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        client
            .content_libraries()
            .delete(
                &Context::new(),
                "urn:vcloud:contentLibrary:41c2",
                true,
                false,
                None,
            )
            .await
            .unwrap();

        delete.assert_async().await;
    }
}
