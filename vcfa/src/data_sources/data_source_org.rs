//! Organization data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::resources::resource_org::{set_org_state, ORG_COUNTERS};
use crate::VcfaProviderData;

#[derive(Default)]
pub struct OrgDataSource {
    provider_data: Option<VcfaProviderData>,
}

impl OrgDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for OrgDataSource {
    fn type_name(&self) -> &str {
        "vcfa_org"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Reads an existing Organization in VCF Automation")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the Organization")
                    .required()
                    .build(),
            );

        let computed = [
            ("id", AttributeType::String),
            ("display_name", AttributeType::String),
            ("description", AttributeType::String),
            ("is_enabled", AttributeType::Bool),
            ("is_subprovider", AttributeType::Bool),
            ("is_classic_tenant", AttributeType::Bool),
            ("managed_by_id", AttributeType::String),
            ("managed_by_name", AttributeType::String),
        ];
        for (name, attr_type) in computed {
            builder = builder.attribute(AttributeBuilder::new(name, attr_type).computed().build());
        }
        for counter in ORG_COUNTERS {
            builder = builder.attribute(
                AttributeBuilder::new(counter, AttributeType::Number)
                    .computed()
                    .build(),
            );
        }

        DataSourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        let name = match request.config.get_string(&AttributePath::new("name")) {
            Ok(name) => name,
            Err(_) => {
                diagnostics.push(
                    Diagnostic::error("Missing name", "The 'name' attribute is required")
                        .with_attribute(AttributePath::new("name")),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data.client.orgs().get_by_name(&name).await {
            Ok(org) => {
                let mut state = DynamicValue::object();
                set_org_state(&mut state, &org);

                ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read org",
                    format!("API error: {}", e),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for OrgDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match VcfaProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => {
                tracing::warn!("org data source not configured: {}", diag.detail);
                diagnostics.push(diag);
            }
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
