//! Organization resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::TmOrg;
use crate::VcfaProviderData;

/// Computed counters reported for every org
pub(crate) const ORG_COUNTERS: [&str; 7] = [
    "org_vdc_count",
    "catalog_count",
    "vapp_count",
    "running_vm_count",
    "user_count",
    "disk_count",
    "directly_managed_org_count",
];

#[derive(Default)]
pub struct OrgResource {
    provider_data: Option<VcfaProviderData>,
}

impl OrgResource {
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

    /// Builds the API object from a planned state. Unknown optional values
    /// fall back to their empty form.
    fn org_from_plan(&self, plan: &DynamicValue) -> Result<TmOrg, Diagnostic> {
        let name = plan
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;
        let display_name = plan
            .get_string(&AttributePath::new("display_name"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing display_name",
                    "The 'display_name' attribute is required",
                )
            })?;

        Ok(TmOrg {
            id: plan
                .get_string(&AttributePath::new("id"))
                .unwrap_or_default(),
            name,
            display_name,
            description: plan
                .get_string(&AttributePath::new("description"))
                .unwrap_or_default(),
            is_enabled: plan
                .get_bool(&AttributePath::new("is_enabled"))
                .unwrap_or(true),
            can_manage_orgs: plan
                .get_bool(&AttributePath::new("is_subprovider"))
                .unwrap_or(false),
            is_classic_tenant: plan
                .get_bool(&AttributePath::new("is_classic_tenant"))
                .unwrap_or(false),
            ..Default::default()
        })
    }
}

/// Writes every org attribute into `state`
pub(crate) fn set_org_state(state: &mut DynamicValue, org: &TmOrg) {
    let _ = state.set_string(&AttributePath::new("id"), org.id.clone());
    let _ = state.set_string(&AttributePath::new("name"), org.name.clone());
    let _ = state.set_string(&AttributePath::new("display_name"), org.display_name.clone());
    let _ = state.set_string(&AttributePath::new("description"), org.description.clone());
    let _ = state.set_bool(&AttributePath::new("is_enabled"), org.is_enabled);
    let _ = state.set_bool(&AttributePath::new("is_subprovider"), org.can_manage_orgs);
    let _ = state.set_bool(&AttributePath::new("is_classic_tenant"), org.is_classic_tenant);

    match &org.managed_by {
        Some(managed_by) => {
            let _ = state.set_string(&AttributePath::new("managed_by_id"), managed_by.id.clone());
            let _ = state.set_string(
                &AttributePath::new("managed_by_name"),
                managed_by.name.clone(),
            );
        }
        None => {
            let _ = state.set_string(&AttributePath::new("managed_by_id"), String::new());
            let _ = state.set_string(&AttributePath::new("managed_by_name"), String::new());
        }
    }

    let counters = [
        org.org_vdc_count,
        org.catalog_count,
        org.vapp_count,
        org.running_vm_count,
        org.user_count,
        org.disk_count,
        org.directly_managed_org_count,
    ];
    for (name, value) in ORG_COUNTERS.iter().zip(counters) {
        let path = AttributePath::new(name);
        let _ = match value {
            Some(count) => state.set_number(&path, count as f64),
            None => state.set_number(&path, 0.0),
        };
    }
}

fn org_state(org: &TmOrg) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_org_state(&mut state, org);
    state
}

#[async_trait]
impl Resource for OrgResource {
    fn type_name(&self) -> &str {
        "vcfa_org"
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
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Provides a resource to manage Organizations in VCF Automation")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Org URN")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the Organization")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("A human readable name of the Organization")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the Organization")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_enabled", AttributeType::Bool)
                    .description("Whether the Organization is enabled. Defaults to true")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_subprovider", AttributeType::Bool)
                    .description("Whether the Organization can manage other Organizations")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_classic_tenant", AttributeType::Bool)
                    .description("Whether the Organization is a classic VRA-style tenant. Cannot be changed")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("managed_by_id", AttributeType::String)
                    .description("ID of the Organization that manages this one")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("managed_by_name", AttributeType::String)
                    .description("Name of the Organization that manages this one")
                    .computed()
                    .build(),
            );

        for counter in ORG_COUNTERS {
            builder = builder.attribute(
                AttributeBuilder::new(counter, AttributeType::Number)
                    .computed()
                    .build(),
            );
        }

        ResourceSchemaResponse {
            schema: builder.build(),
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

        let org = match self.org_from_plan(&request.planned_state) {
            Ok(org) => org,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let orgs = provider_data.client.orgs();
        let created = match orgs.create(&ctx, &org).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create org",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };

        tracing::debug!("created org {} ({})", created.name, created.id);

        let org = match orgs.get_by_id(&created.id).await {
            Ok(org) => org,
            Err(e) => {
                diagnostics.push(Diagnostic::warning(
                    "Failed to read org after creation",
                    format!("API error: {}", e),
                ));
                created
            }
        };

        CreateResourceResponse {
            new_state: org_state(&org),
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

        let id = match request.current_state.get_string(&AttributePath::new("id")) {
            Ok(id) if !id.is_empty() => id,
            _ => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        match provider_data.client.orgs().get_by_id(&id).await {
            Ok(org) => ReadResourceResponse {
                new_state: Some(org_state(&org)),
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("org {} no longer exists, removing from state", id);
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
                    "Failed to read org",
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

        let mut org = match self.org_from_plan(&request.planned_state) {
            Ok(org) => org,
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
        if org.id.is_empty() {
            org.id = request
                .prior_state
                .get_string(&AttributePath::new("id"))
                .unwrap_or_default();
        }

        match provider_data.client.orgs().update(&ctx, &org).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: org_state(&updated),
                private: vec![],
                diagnostics,
                new_identity: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update org",
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

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => return DeleteResourceResponse { diagnostics },
        };

        let orgs = provider_data.client.orgs();
        let org = match orgs.get_by_id(&id).await {
            Ok(org) => org,
            Err(e) if e.is_not_found() => {
                tracing::debug!("org {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read org before deletion",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = orgs.delete(&ctx, &org).await {
            diagnostics.push(Diagnostic::error(
                "Failed to delete org",
                format!("API error: {}", e),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for OrgResource {
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
impl ResourceWithImportState for OrgResource {
    /// Orgs are imported by name
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

        match provider_data.client.orgs().get_by_name(&request.id).await {
            Ok(org) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: request.type_name,
                    state: org_state(&org),
                    private: vec![],
                    identity: None,
                }],
                diagnostics,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to import org",
                    format!("error retrieving org '{}': {}", request.id, e),
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
    use crate::api::OpenApiReference;

    #[tokio::test]
    async fn schema_marks_classic_tenant_force_new() {
        let resource = OrgResource::new();
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        let classic = schema.block.attribute("is_classic_tenant").unwrap();
        assert!(classic.optional && classic.computed);
        assert_eq!(classic.plan_modifiers.len(), 1);
        assert!(schema.block.attribute("name").unwrap().required);
        assert!(schema.block.attribute("running_vm_count").unwrap().computed);
        assert_eq!(schema.block.attributes.len(), 9 + ORG_COUNTERS.len());
    }

    #[test]
    fn org_from_plan_maps_subprovider() {
        let mut plan = DynamicValue::object();
        plan.set_string(&AttributePath::new("name"), "tenant1".to_string())
            .unwrap();
        plan.set_string(&AttributePath::new("display_name"), "Tenant".to_string())
            .unwrap();
        plan.set_bool(&AttributePath::new("is_subprovider"), true)
            .unwrap();
        plan.mark_unknown(&AttributePath::new("id")).unwrap();

        let org = OrgResource::new().org_from_plan(&plan).unwrap();
        assert!(org.can_manage_orgs);
        assert!(org.is_enabled);
        assert_eq!(org.id, "");
        assert_eq!(org.description, "");
    }

    #[test]
    fn org_from_plan_requires_display_name() {
        let mut plan = DynamicValue::object();
        plan.set_string(&AttributePath::new("name"), "tenant1".to_string())
            .unwrap();

        let diag = OrgResource::new().org_from_plan(&plan).unwrap_err();
        assert_eq!(diag.summary, "Missing display_name");
    }

    #[test]
    fn state_carries_managed_by_and_counters() {
        let org = TmOrg {
            id: "urn:vcloud:org:1".to_string(),
            name: "tenant1".to_string(),
            display_name: "Tenant".to_string(),
            is_enabled: true,
            managed_by: Some(OpenApiReference {
                id: "urn:vcloud:org:0".to_string(),
                name: "System".to_string(),
            }),
            catalog_count: Some(4),
            ..Default::default()
        };

        let state = org_state(&org);
        assert_eq!(
            state.get_string(&AttributePath::new("managed_by_name")).unwrap(),
            "System"
        );
        assert_eq!(
            state.get_number(&AttributePath::new("catalog_count")).unwrap(),
            4.0
        );
        assert_eq!(
            state.get_number(&AttributePath::new("user_count")).unwrap(),
            0.0
        );
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_error() {
        let resource = OrgResource::new();
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "vcfa_org".to_string(),
                    prior_state: DynamicValue::object(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
