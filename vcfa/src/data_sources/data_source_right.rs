//! Right data source implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::Right;
use crate::VcfaProviderData;

#[derive(Default)]
pub struct RightDataSource {
    provider_data: Option<VcfaProviderData>,
}

impl RightDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn right_state(right: &Right) -> DynamicValue {
    let mut state = DynamicValue::object();
    let _ = state.set_string(&AttributePath::new("id"), right.id.clone());
    let _ = state.set_string(&AttributePath::new("name"), right.name.clone());
    let _ = state.set_string(&AttributePath::new("description"), right.description.clone());
    let _ = state.set_string(&AttributePath::new("category_id"), right.category.clone());
    let _ = state.set_string(&AttributePath::new("bundle_key"), right.bundle_key.clone());
    let _ = state.set_string(&AttributePath::new("right_type"), right.right_type.clone());

    let implied = right
        .implied_rights
        .iter()
        .map(|implied| {
            let mut entry = HashMap::new();
            entry.insert("name".to_string(), Dynamic::String(implied.name.clone()));
            entry.insert("id".to_string(), Dynamic::String(implied.id.clone()));
            Dynamic::Map(entry)
        })
        .collect();
    let _ = state.set_list(&AttributePath::new("implied_rights"), implied);

    state
}

#[async_trait]
impl DataSource for RightDataSource {
    fn type_name(&self) -> &str {
        "vcfa_right"
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
        let mut reference = HashMap::new();
        reference.insert("name".to_string(), AttributeType::String);
        reference.insert("id".to_string(), AttributeType::String);

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads a Right available in VCF Automation")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the Right")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the Right")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category_id", AttributeType::String)
                    .description("ID of the category for this Right")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bundle_key", AttributeType::String)
                    .description("Key used for internationalization")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("right_type", AttributeType::String)
                    .description("Type of Right, VIEW or MODIFY")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "implied_rights",
                    AttributeType::Set(Box::new(AttributeType::Object(reference))),
                )
                .description("Rights that are implied by this one")
                .computed()
                .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
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

        match provider_data.client.rights().get_by_name(&name).await {
            Ok(right) => ReadDataSourceResponse {
                state: right_state(&right),
                diagnostics,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read right",
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
impl DataSourceWithConfigure for RightDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match VcfaProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
