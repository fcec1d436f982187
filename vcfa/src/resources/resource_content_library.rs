//! Content library resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::{
    ApiError, ContentLibrary, OpenApiReference, SubscriptionConfig, TenantContext, SYSTEM_ORG,
};
use crate::VcfaProviderData;

#[derive(Default)]
pub struct ContentLibraryResource {
    provider_data: Option<VcfaProviderData>,
}

impl ContentLibraryResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_data(&self) -> Result<&VcfaProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
    }

    async fn tenant_for(
        &self,
        provider_data: &VcfaProviderData,
        state: &DynamicValue,
    ) -> Result<Option<TenantContext>, ApiError> {
        let org_id = state
            .get_string(&AttributePath::new("org_id"))
            .unwrap_or_default();
        provider_data.client.orgs().tenant_context(&org_id).await
    }

    fn library_from_plan(&self, plan: &DynamicValue) -> Result<ContentLibrary, Diagnostic> {
        let name = plan
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;
        let storage_classes = plan
            .get_string_list(&AttributePath::new("storage_class_ids"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing storage_class_ids",
                    "The 'storage_class_ids' attribute is required",
                )
                .with_attribute(AttributePath::new("storage_class_ids"))
            })?
            .into_iter()
            .map(OpenApiReference::from_id)
            .collect();

        let subscription_config =
            subscription_url(plan).map(|subscription_url| SubscriptionConfig {
                subscription_url,
                password: subscription_password(plan).unwrap_or_default(),
            });

        Ok(ContentLibrary {
            name,
            description: plan
                .get_string(&AttributePath::new("description"))
                .unwrap_or_default(),
            auto_attach: plan
                .get_bool(&AttributePath::new("auto_attach"))
                .unwrap_or(true),
            storage_classes,
            subscription_config,
            ..Default::default()
        })
    }
}

fn subscription_path() -> AttributePath {
    AttributePath::new("subscription_config").index(0)
}

fn subscription_url(state: &DynamicValue) -> Option<String> {
    state
        .get_string(&subscription_path().attribute("subscription_url"))
        .ok()
}

fn subscription_password(state: &DynamicValue) -> Option<String> {
    state
        .get_string(&subscription_path().attribute("password"))
        .ok()
        .filter(|p| !p.is_empty())
}

/// Builds resource state from an API library. `source` supplies the values
/// the API never returns: the subscription password and the delete flags.
fn library_state(library: &ContentLibrary, source: &DynamicValue) -> DynamicValue {
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

    let org_id = match &library.org {
        Some(org) => org.id.clone(),
        None => source
            .get_string(&AttributePath::new("org_id"))
            .unwrap_or_default(),
    };
    let _ = state.set_string(&AttributePath::new("org_id"), org_id);

    let storage_class_ids = library
        .storage_classes
        .iter()
        .map(|sc| Dynamic::String(sc.id.clone()))
        .collect();
    let _ = state.set_list(&AttributePath::new("storage_class_ids"), storage_class_ids);

    let subscription = match &library.subscription_config {
        Some(config) => {
            let mut block = HashMap::new();
            block.insert(
                "subscription_url".to_string(),
                Dynamic::String(config.subscription_url.clone()),
            );
            let password = subscription_password(source)
                .map(Dynamic::String)
                .unwrap_or(Dynamic::Null);
            block.insert("password".to_string(), password);
            vec![Dynamic::Map(block)]
        }
        None => vec![],
    };
    let _ = state.set_list(&AttributePath::new("subscription_config"), subscription);

    for flag in ["delete_force", "delete_recursive"] {
        let path = AttributePath::new(flag);
        let value = match source.get(&path) {
            Some(Dynamic::Bool(b)) => Dynamic::Bool(*b),
            _ => Dynamic::Null,
        };
        let _ = state.set(&path, value);
    }

    state
}

#[async_trait]
impl Resource for ContentLibraryResource {
    fn type_name(&self) -> &str {
        "vcfa_content_library"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Provides a resource to manage Content Libraries in VCF Automation")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Content Library URN")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
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
                    .description("The reference to the Organization that the Content Library belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("delete_force", AttributeType::Bool)
                    .description("On deletion, forcefully deletes the Content Library and its items. Only for PROVIDER Content Libraries")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("delete_recursive", AttributeType::Bool)
                    .description("On deletion, deletes the Content Library, including its items, in a single operation")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "storage_class_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("A set of Storage Class IDs used by this Content Library")
                .required()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("auto_attach", AttributeType::Bool)
                    .description("For Tenant Content Libraries, whether the library is attached to all current and future namespaces of the Organization. Cannot be updated")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("creation_date", AttributeType::String)
                    .description("The ISO-8601 timestamp representing when this Content Library was created")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the Content Library")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_shared", AttributeType::Bool)
                    .description("Whether this Content Library is shared with other Organizations")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_subscribed", AttributeType::Bool)
                    .description("Whether this Content Library is subscribed from an external published library")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("library_type", AttributeType::String)
                    .description("PROVIDER or TENANT")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version_number", AttributeType::Number)
                    .description("Version number of this Content Library")
                    .computed()
                    .build(),
            )
            .block(NestedBlock {
                type_name: "subscription_config".to_string(),
                block: SchemaBuilder::new()
                    .description("Subscription settings of a Content Library")
                    .attribute(
                        AttributeBuilder::new("subscription_url", AttributeType::String)
                            .description("Subscription url of this Content Library")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("password", AttributeType::String)
                            .description("Password to use to authenticate with the publisher")
                            .optional()
                            .sensitive()
                            .build(),
                    )
                    .build_block(),
                nesting: NestingMode::List,
                min_items: 0,
                max_items: 1,
            })
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let library = match self.library_from_plan(&request.planned_state) {
            Ok(library) => library,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let tenant = match self.tenant_for(provider_data, &request.planned_state).await {
            Ok(tenant) => tenant,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Failed to resolve org", format!("API error: {}", e))
                        .with_attribute(AttributePath::new("org_id")),
                );
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let libraries = provider_data.client.content_libraries();
        let created = match libraries.create(&ctx, &library, tenant.as_ref()).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create content library",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        tracing::debug!("created content library {} ({})", created.name, created.id);

        CreateResourceResponse {
            new_state: library_state(&created, &request.planned_state),
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        let state = &request.current_state;
        let id = state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();

        let result = match self.tenant_for(provider_data, state).await {
            Ok(tenant) => {
                let libraries = provider_data.client.content_libraries();
                if !id.is_empty() {
                    libraries.get_by_id(&id, tenant.as_ref()).await
                } else {
                    let name = state
                        .get_string(&AttributePath::new("name"))
                        .unwrap_or_default();
                    libraries.get_by_name(&name, tenant.as_ref()).await
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(library) => ReadResourceResponse {
                new_state: Some(library_state(&library, state)),
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "content library {} no longer exists, removing from state",
                    id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read content library",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let library = match self.library_from_plan(&request.planned_state) {
            Ok(library) => library,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();

        let result = match self.tenant_for(provider_data, &request.prior_state).await {
            Ok(tenant) => {
                provider_data
                    .client
                    .content_libraries()
                    .update(&ctx, &id, &library, tenant.as_ref())
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(updated) => UpdateResourceResponse {
                new_state: library_state(&updated, &request.planned_state),
                private: vec![],
                diagnostics,
                new_identity: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update content library",
                    format!("API error: {}", e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let state = &request.prior_state;
        let id = match state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => return DeleteResourceResponse { diagnostics },
        };

        let tenant = match self.tenant_for(provider_data, state).await {
            Ok(tenant) => tenant,
            Err(e) if e.is_not_found() => {
                tracing::debug!("org of content library {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to resolve org",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        };

        let libraries = provider_data.client.content_libraries();
        let library = match libraries.get_by_id(&id, tenant.as_ref()).await {
            Ok(library) => library,
            Err(e) if e.is_not_found() => {
                tracing::debug!("content library {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read content library before deletion",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        };

        // Forced deletion only exists for provider libraries
        let force = library.is_provider()
            && state
                .get_bool(&AttributePath::new("delete_force"))
                .unwrap_or(false);
        let recursive = state
            .get_bool(&AttributePath::new("delete_recursive"))
            .unwrap_or(false);

        if let Err(e) = libraries
            .delete(&ctx, &id, force, recursive, tenant.as_ref())
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to delete content library",
                format!("API error: {}", e),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }

    fn as_modify_plan(&self) -> Option<&dyn ResourceWithModifyPlan> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ContentLibraryResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match VcfaProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for ContentLibraryResource {
    /// A library cannot move to another publisher, so any change of
    /// `subscription_url` replaces it
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = vec![];

        let url_path = subscription_path().attribute("subscription_url");
        let planned_unknown = matches!(
            request.proposed_new_state.get(&url_path),
            Some(Dynamic::Unknown)
        );

        if !request.prior_state.is_null()
            && !planned_unknown
            && subscription_url(&request.prior_state)
                != subscription_url(&request.proposed_new_state)
        {
            requires_replace.push(AttributePath::new("subscription_config"));
        }

        ModifyPlanResponse {
            planned_state: request.proposed_new_state,
            requires_replace,
            planned_private: request.prior_private,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for ContentLibraryResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut diagnostics = vec![];

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                    deferred: None,
                };
            }
        };

        let separator = provider_data.import_separator.as_str();
        let parts: Vec<&str> = request.id.split(separator).collect();
        let [org_name, library_name] = parts.as_slice() else {
            diagnostics.push(Diagnostic::error(
                "Invalid import identifier",
                format!(
                    "invalid import identifier '{}', should be <Org name>{sep}<Content Library name> for Tenant Content Libraries or {system}{sep}<Content Library name> for Provider Content Libraries",
                    request.id,
                    sep = separator,
                    system = SYSTEM_ORG,
                ),
            ));
            return ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics,
                deferred: None,
            };
        };

        let client = &provider_data.client;
        let result = if org_name.eq_ignore_ascii_case(SYSTEM_ORG) {
            // without a tenant context the lookup also sees tenant libraries
            client
                .content_libraries()
                .get_by_name(library_name, None)
                .await
                .and_then(|library| {
                    if library.is_provider() {
                        Ok((library, None))
                    } else {
                        Err(ApiError::NotFound(format!(
                            "provider content library '{}'",
                            library_name
                        )))
                    }
                })
        } else {
            match client.orgs().get_by_name(org_name).await {
                Ok(org) => {
                    let tenant = TenantContext {
                        org_id: org.id,
                        org_name: org.name,
                    };
                    client
                        .content_libraries()
                        .get_by_name(library_name, Some(&tenant))
                        .await
                        .map(|library| (library, Some(tenant)))
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok((library, tenant)) => {
                let mut source = DynamicValue::object();
                if let Some(tenant) = tenant {
                    let _ = source.set_string(&AttributePath::new("org_id"), tenant.org_id);
                }

                ImportResourceStateResponse {
                    imported_resources: vec![ImportedResource {
                        type_name: request.type_name,
                        state: library_state(&library, &source),
                        private: vec![],
                        identity: None,
                    }],
                    diagnostics,
                    deferred: None,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to import content library",
                    format!(
                        "error retrieving Content Library with identifier '{}': {}",
                        request.id, e
                    ),
                ));
                ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned() -> DynamicValue {
        let mut plan = DynamicValue::object();
        plan.set_string(&AttributePath::new("name"), "templates".to_string())
            .unwrap();
        plan.set_string(&AttributePath::new("org_id"), "urn:vcloud:org:7d2b".to_string())
            .unwrap();
        plan.set_list(
            &AttributePath::new("storage_class_ids"),
            vec![Dynamic::String("urn:vcloud:storageClass:1".to_string())],
        )
        .unwrap();
        plan.set_bool(&AttributePath::new("delete_recursive"), true)
            .unwrap();
        plan.mark_unknown(&AttributePath::new("description")).unwrap();
        plan
    }

    fn with_subscription(mut plan: DynamicValue, url: &str, password: &str) -> DynamicValue {
        let mut block = HashMap::new();
        block.insert(
            "subscription_url".to_string(),
            Dynamic::String(url.to_string()),
        );
        block.insert(
            "password".to_string(),
            Dynamic::String(password.to_string()),
        );
        plan.set_list(
            &AttributePath::new("subscription_config"),
            vec![Dynamic::Map(block)],
        )
        .unwrap();
        plan
    }

    #[test]
    fn library_from_plan_collects_storage_classes_and_subscription() {
        let plan = with_subscription(planned(), "https://publisher/lib.json", "s3cret");
        let library = ContentLibraryResource::new()
            .library_from_plan(&plan)
            .unwrap();

        assert_eq!(library.name, "templates");
        assert_eq!(library.description, "");
        assert!(library.auto_attach);
        assert_eq!(library.storage_classes[0].id, "urn:vcloud:storageClass:1");
        let config = library.subscription_config.unwrap();
        assert_eq!(config.subscription_url, "https://publisher/lib.json");
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn state_keeps_password_and_delete_flags() {
        let plan = with_subscription(planned(), "https://publisher/lib.json", "s3cret");
        let library = ContentLibrary {
            id: "urn:vcloud:contentLibrary:41c2".to_string(),
            name: "templates".to_string(),
            library_type: "TENANT".to_string(),
            org: Some(OpenApiReference {
                id: "urn:vcloud:org:7d2b".to_string(),
                name: "tenant1".to_string(),
            }),
            subscription_config: Some(SubscriptionConfig {
                subscription_url: "https://publisher/lib.json".to_string(),
                password: String::new(),
            }),
            ..Default::default()
        };

        let state = library_state(&library, &plan);
        assert_eq!(subscription_password(&state).as_deref(), Some("s3cret"));
        assert!(state.get_bool(&AttributePath::new("delete_recursive")).unwrap());
        assert!(state
            .get(&AttributePath::new("delete_force"))
            .unwrap()
            .is_null());
        assert_eq!(
            state.get_string(&AttributePath::new("org_id")).unwrap(),
            "urn:vcloud:org:7d2b"
        );
    }

    #[test]
    fn state_without_subscription_has_empty_block_list() {
        let state = library_state(&ContentLibrary::default(), &DynamicValue::object());
        assert!(state
            .get_list(&AttributePath::new("subscription_config"))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn subscription_url_change_requires_replace() {
        let resource = ContentLibraryResource::new();
        let prior = with_subscription(planned(), "https://publisher/a.json", "");
        let proposed = with_subscription(planned(), "https://publisher/b.json", "");

        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "vcfa_content_library".to_string(),
                    config: proposed.clone(),
                    prior_state: prior,
                    proposed_new_state: proposed,
                    prior_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(
            response.requires_replace,
            vec![AttributePath::new("subscription_config")]
        );
    }

    #[tokio::test]
    async fn unchanged_or_new_plan_needs_no_replace() {
        let resource = ContentLibraryResource::new();
        let state = with_subscription(planned(), "https://publisher/a.json", "");

        let unchanged = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "vcfa_content_library".to_string(),
                    config: state.clone(),
                    prior_state: state.clone(),
                    proposed_new_state: state.clone(),
                    prior_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert!(unchanged.requires_replace.is_empty());

        let create = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "vcfa_content_library".to_string(),
                    config: state.clone(),
                    prior_state: DynamicValue::null(),
                    proposed_new_state: state,
                    prior_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert!(create.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn schema_has_single_subscription_block() {
        let schema = ContentLibraryResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        assert_eq!(schema.block.block_types.len(), 1);
        assert_eq!(schema.block.block_types[0].max_items, 1);
        assert!(schema.block.attribute("org_id").unwrap().required);
        assert!(!schema.block.attribute("delete_force").unwrap().computed);
    }
}
