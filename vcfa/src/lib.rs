//! Terraform provider for VMware Cloud Foundation Automation

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::VcfaProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, ServerCapabilities};
use tfplug::validator::StringOneOfValidator;

use crate::config::{AuthType, ProviderConfig};

#[derive(Default)]
pub struct VcfaProvider;

impl VcfaProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for VcfaProvider {
    fn type_name(&self) -> &str {
        "vcfa"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: true,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Provider for VMware Cloud Foundation Automation")
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("The VCFA endpoint, e.g. https://vcfa.example.com. Can also be set with VCFA_URL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user", AttributeType::String)
                    .description("The user name for integrated authentication. Can also be set with VCFA_USER")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("The user password for integrated authentication. Can also be set with VCFA_PASSWORD")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("auth_type", AttributeType::String)
                    .description("Authentication mode: integrated, token or api_token. Defaults to integrated")
                    .optional()
                    .validator(StringOneOfValidator::create(&AuthType::VALUES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("Bearer token, used with auth_type = \"token\". Can also be set with VCFA_TOKEN")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_token", AttributeType::String)
                    .description("API refresh token, used with auth_type = \"api_token\". Can also be set with VCFA_API_TOKEN")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("org", AttributeType::String)
                    .description("The organization to log in to. Defaults to System")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("allow_unverified_ssl", AttributeType::Bool)
                    .description("Skip TLS certificate verification")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retry_timeout", AttributeType::Number)
                    .description("Seconds to wait for asynchronous tasks. Defaults to 60")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("import_separator", AttributeType::String)
                    .description("Separator between names in import identifiers. Defaults to '.'")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::info!(
            "configuring vcfa provider for terraform {}",
            request.terraform_version
        );

        let config = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client = match api::Client::new(config.client_config()) {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to create API client",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        if let Err(e) = client.authenticate().await {
            return ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Authentication failed",
                    format!("could not log in to {} as org '{}': {}", config.url, config.org, e),
                )],
                provider_data: None,
            };
        }

        tracing::debug!("authenticated to {} (org {})", config.url, config.org);

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(VcfaProviderData::new(
                client,
                config.import_separator,
            ))),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "vcfa_org".to_string(),
            Box::new(|| {
                Box::new(resources::OrgResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        resources.insert(
            "vcfa_content_library".to_string(),
            Box::new(|| {
                Box::new(resources::ContentLibraryResource::new())
                    as Box<dyn ResourceWithConfigure>
            }),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "vcfa_org".to_string(),
            Box::new(|| {
                Box::new(data_sources::OrgDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources.insert(
            "vcfa_content_library".to_string(),
            Box::new(|| {
                Box::new(data_sources::ContentLibraryDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources.insert(
            "vcfa_right".to_string(),
            Box::new(|| {
                Box::new(data_sources::RightDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serial_test::serial;
    use tfplug::types::{AttributePath, ClientCapabilities, DynamicValue};

    fn configure_request(values: &[(&str, &str)]) -> ConfigureProviderRequest {
        let mut config = DynamicValue::object();
        for (name, value) in values {
            config
                .set_string(&AttributePath::new(name), value.to_string())
                .unwrap();
        }
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn clear_env() {
        for var in [
            "VCFA_URL",
            "VCFA_USER",
            "VCFA_PASSWORD",
            "VCFA_AUTH_TYPE",
            "VCFA_TOKEN",
            "VCFA_API_TOKEN",
            "VCFA_ORG",
            "VCFA_ALLOW_UNVERIFIED_SSL",
            "VCFA_MAX_RETRY_TIMEOUT",
            "VCFA_IMPORT_SEPARATOR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn factories_cover_every_type() {
        let provider = VcfaProvider::new();

        let resources = provider.resources();
        for (name, factory) in &resources {
            assert_eq!(factory().type_name(), name);
        }
        assert_eq!(resources.len(), 2);

        let data_sources = provider.data_sources();
        for (name, factory) in &data_sources {
            assert_eq!(factory().type_name(), name);
        }
        assert!(data_sources.contains_key("vcfa_right"));
        assert_eq!(data_sources.len(), 3);
    }

    #[tokio::test]
    #[serial]
    async fn configure_with_token_yields_provider_data() {
        clear_env();
        let server = Server::new_async().await;

        let mut provider = VcfaProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(&[
                    ("url", &server.url()),
                    ("auth_type", "token"),
                    ("token", "abc"),
                    ("import_separator", "/"),
                ]),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let data = tokio_test::assert_ok!(VcfaProviderData::from_any(response.provider_data));
        assert_eq!(data.import_separator, "/");
        assert!(data.client.is_system());
    }

    #[tokio::test]
    #[serial]
    async fn configure_reports_missing_url() {
        clear_env();

        let mut provider = VcfaProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(&[("auth_type", "token")]))
            .await;

        assert!(response.provider_data.is_none());
        assert!(response
            .diagnostics
            .iter()
            .any(|d| d.summary == "url is required"));
    }

    #[tokio::test]
    #[serial]
    async fn configure_reports_failed_login() {
        clear_env();
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/cloudapi/1.0.0/sessions/provider")
            .with_status(401)
            .create_async()
            .await;

        let mut provider = VcfaProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(&[
                    ("url", &server.url()),
                    ("user", "admin"),
                    ("password", "wrong"),
                ]),
            )
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics[0].summary, "Authentication failed");
    }
}
