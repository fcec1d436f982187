//! Content library data source implementation

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

use crate::api::ContentLibrary;
use crate::VcfaProviderData;

#[derive(Default)]
pub struct ContentLibraryDataSource {
    provider_data: Option<VcfaProviderData>,
}

impl ContentLibraryDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn library_state(library: &ContentLibrary, org_id: &str) -> DynamicValue {
    let mut state = DynamicValue::object();
    let _ = state.set_string(&AttributePath::new("id"), library.id.clone());
    let _ = state.set_string(&AttributePath::new("name"), library.name.clone());
    let _ = state.set_string(
        &AttributePath::new("description"),
        library.description.clone(),
    );
    let _ = state.set_bool(&AttributePath::new("auto_attach"), library.auto_attach);
    let _ = state.set_string(
        &AttributePath::new("creation_date"),
        library.creation_date.clone(),
    );
    let _ = state.set_bool(&AttributePath::new("is_shared"), library.is_shared);
    let _ = state.set_bool(&AttributePath::new("is_subscribed"), library.is_subscribed);
    let _ = state.set_string(
        &AttributePath::new("library_type"),
        library.library_type.clone(),
    );
    let _ = state.set_number(
        &AttributePath::new("version_number"),
        library.version_number as f64,
    );

    let org_id = library
        .org
        .as_ref()
        .map(|org| org.id.clone())
        .unwrap_or_else(|| org_id.to_string());
    let _ = state.set_string(&AttributePath::new("org_id"), org_id);

    let storage_class_ids = library
        .storage_classes
        .iter()
        .map(|sc| Dynamic::String(sc.id.clone()))
        .collect();
    let _ = state.set_list(&AttributePath::new("storage_class_ids"), storage_class_ids);

    let subscription = library
        .subscription_config
        .iter()
        .map(|config| {
            let mut entry = HashMap::new();
            entry.insert(
                "subscription_url".to_string(),
                Dynamic::String(config.subscription_url.clone()),
            );
            Dynamic::Map(entry)
        })
        .collect();
    let _ = state.set_list(&AttributePath::new("subscription_config"), subscription);

    state
}

#[async_trait]
impl DataSource for ContentLibraryDataSource {
    fn type_name(&self) -> &str {
        "vcfa_content_library"
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
        let mut subscription_fields = HashMap::new();
        subscription_fields.insert("subscription_url".to_string(), AttributeType::String);

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads an existing Content Library in VCF Automation")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the Content Library")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("org_id", AttributeType::String)
                    .description("The Organization that owns the Content Library. Omit for Provider Content Libraries")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "storage_class_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("A set of Storage Class IDs used by this Content Library")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("auto_attach", AttributeType::Bool)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("creation_date", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_shared", AttributeType::Bool)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_subscribed", AttributeType::Bool)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("library_type", AttributeType::String)
                    .description("PROVIDER or TENANT")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "subscription_config",
                    AttributeType::List(Box::new(AttributeType::Object(subscription_fields))),
                )
                .description("Subscription settings of the Content Library")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("version_number", AttributeType::Number)
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
        let org_id = request
            .config
            .get_string(&AttributePath::new("org_id"))
            .unwrap_or_default();

        let client = &provider_data.client;
        let tenant = match client.orgs().tenant_context(&org_id).await {
            Ok(tenant) => tenant,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Failed to resolve org", format!("API error: {}", e))
                        .with_attribute(AttributePath::new("org_id")),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match client
            .content_libraries()
            .get_by_name(&name, tenant.as_ref())
            .await
        {
            Ok(library) => ReadDataSourceResponse {
                state: library_state(&library, &org_id),
                diagnostics,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read content library",
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
impl DataSourceWithConfigure for ContentLibraryDataSource {
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
