//! gRPC service implementation of the Terraform Plugin Protocol v6.9
//!
//! `GrpcProviderServer` adapts a `Provider` to the generated service trait.
//! Resources and data sources are created per request from the provider's
//! factories and configured with the data returned by ConfigureProvider.
//! Planning (defaults, unknown computed values, plan modifiers) happens here
//! so individual resources only implement CRUD.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Attribute, Block, DefaultRequest, NestedBlock, NestingMode, PlanModifierRequest, Schema,
    StringKind,
};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue, ResourceIdentityData,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    resources: Arc<HashMap<String, ResourceFactory>>,
    data_sources: Arc<HashMap<String, DataSourceFactory>>,
    stop: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            resources: Arc::new(resources),
            data_sources: Arc::new(data_sources),
            stop: Context::new(),
        }
    }

    /// Context handed to provider calls; cancelled by StopProvider
    fn ctx(&self) -> Context {
        self.stop.clone()
    }

    /// Builds a resource and configures it with the current provider data.
    /// Configure is skipped until the provider itself has been configured,
    /// matching how validation can run before ConfigureProvider.
    async fn resource(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceWithConfigure>, Vec<Diagnostic>), Status> {
        let factory = self
            .resources
            .get(type_name)
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))?;
        let mut resource = factory();

        let provider_data = self.provider_data.read().await.clone();
        let diagnostics = match provider_data {
            Some(data) => {
                resource
                    .configure(
                        self.ctx(),
                        ConfigureResourceRequest {
                            provider_data: Some(data),
                        },
                    )
                    .await
                    .diagnostics
            }
            None => vec![],
        };

        Ok((resource, diagnostics))
    }

    async fn data_source(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), Status> {
        let factory = self
            .data_sources
            .get(type_name)
            .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()))?;
        let mut data_source = factory();

        let provider_data = self.provider_data.read().await.clone();
        let diagnostics = match provider_data {
            Some(data) => {
                data_source
                    .configure(
                        self.ctx(),
                        ConfigureDataSourceRequest {
                            provider_data: Some(data),
                        },
                    )
                    .await
                    .diagnostics
            }
            None => vec![],
        };

        Ok((data_source, diagnostics))
    }

    async fn resource_schema(&self, resource: &dyn ResourceWithConfigure) -> Schema {
        resource.schema(self.ctx(), ResourceSchemaRequest).await.schema
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let metadata = provider.metadata(self.ctx(), ProviderMetadataRequest).await;

        let mut resources: Vec<_> = self.resources.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_sources.keys().cloned().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
            functions: vec![],
            ephemeral_resources: vec![],
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> Result<Response<proto::get_provider_schema::Response>, Status> {
        let provider = self.provider.read().await;
        let metadata = provider.metadata(self.ctx(), ProviderMetadataRequest).await;
        let schema = provider.schema(self.ctx(), ProviderSchemaRequest).await;
        let meta_schema = provider
            .meta_schema(self.ctx(), ProviderMetaSchemaRequest)
            .await;

        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(meta_schema.diagnostics);

        let mut resource_schemas = HashMap::new();
        for (type_name, factory) in self.resources.iter() {
            let resource = factory();
            let response = resource.schema(self.ctx(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(type_name.clone(), schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (type_name, factory) in self.data_sources.iter() {
            let data_source = factory();
            let response = data_source
                .schema(self.ctx(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(type_name.clone(), schema_to_proto(&response.schema));
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: meta_schema.schema.as_ref().map(schema_to_proto),
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            functions: HashMap::new(),
            ephemeral_resource_schemas: HashMap::new(),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        let provider = self.provider.read().await;
        let schema = provider.schema(self.ctx(), ProviderSchemaRequest).await.schema;
        let mut diagnostics = schema.validate_config(&config);
        diagnostics.extend(
            provider
                .validate(self.ctx(), ValidateProviderConfigRequest { config })
                .await
                .diagnostics,
        );

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;
        let (resource, mut diagnostics) = self.resource(&req.type_name).await?;

        let schema = self.resource_schema(resource.as_ref()).await;
        diagnostics.extend(schema.validate_config(&config));
        diagnostics.extend(
            resource
                .validate(
                    self.ctx(),
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                        client_capabilities: client_capabilities_from_proto(
                            req.client_capabilities,
                        ),
                    },
                )
                .await
                .diagnostics,
        );

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;
        let (data_source, mut diagnostics) = self.data_source(&req.type_name).await?;

        let schema = data_source
            .schema(self.ctx(), DataSourceSchemaRequest)
            .await
            .schema;
        diagnostics.extend(schema.validate_config(&config));
        diagnostics.extend(
            data_source
                .validate(
                    self.ctx(),
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await
                .diagnostics,
        );

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let (resource, _) = self.resource(&req.type_name).await?;
        let schema = self.resource_schema(resource.as_ref()).await;

        let json = req
            .raw_state
            .map(|raw| raw.json)
            .filter(|json| !json.is_empty());

        let Some(json) = json else {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                    "Unable to upgrade resource state",
                    "Only JSON encoded state is supported",
                )]),
            }));
        };

        if req.version > schema.version {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                    "Unable to upgrade resource state",
                    format!(
                        "State version {} is newer than the provider schema version {}",
                        req.version, schema.version
                    ),
                )]),
            }));
        }

        let state = DynamicValue::decode_json(&json)?;
        let upgraded = DynamicValue::new(schema.block.conform(&state.value));

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(&upgraded)?),
            diagnostics: vec![],
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> Result<Response<proto::get_resource_identity_schemas::Response>, Status> {
        Ok(Response::new(proto::get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn upgrade_resource_identity(
        &self,
        _request: Request<proto::upgrade_resource_identity::Request>,
    ) -> Result<Response<proto::upgrade_resource_identity::Response>, Status> {
        Err(Status::unimplemented("resource identity is not supported"))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        tracing::debug!(
            terraform_version = %req.terraform_version,
            "configuring provider"
        );

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    self.ctx(),
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: client_capabilities_from_proto(
                            req.client_capabilities,
                        ),
                    },
                )
                .await
        };

        if response.provider_data.is_some() {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        let current_state = decode_dynamic_value(req.current_state.as_ref())?;
        let (resource, mut diagnostics) = self.resource(&req.type_name).await?;

        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: req.current_state,
                diagnostics: diagnostics_to_proto(diagnostics),
                private: req.private,
                deferred: None,
                new_identity: None,
            }));
        }

        let schema = self.resource_schema(resource.as_ref()).await;
        let response = resource
            .read(
                self.ctx(),
                ReadResourceRequest {
                    type_name: req.type_name.clone(),
                    current_state,
                    private: req.private,
                    provider_meta: optional_dynamic_value(req.provider_meta.as_ref())?,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                    current_identity: identity_from_proto(req.current_identity.as_ref())?,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let new_state = match response.new_state {
            Some(state) => DynamicValue::new(schema.block.conform(&state.value)),
            None => {
                tracing::debug!(type_name = %req.type_name, "resource no longer exists");
                DynamicValue::null()
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            private: response.private,
            deferred: response.deferred.as_ref().map(deferred_to_proto),
            new_identity: identity_to_proto(response.new_identity.as_ref())?,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let proposed_new_state = decode_dynamic_value(req.proposed_new_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        // Destroy plans need no further work
        if proposed_new_state.is_null() {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: req.proposed_new_state,
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
                deferred: None,
                planned_identity: req.prior_identity,
            }));
        }

        let (resource, mut diagnostics) = self.resource(&req.type_name).await?;
        let schema = self.resource_schema(resource.as_ref()).await;

        let mut planned_state = proposed_new_state;
        let plan = plan_attributes(&schema.block, &config, &prior_state, &mut planned_state)?;
        let mut requires_replace = plan.requires_replace;
        diagnostics.extend(plan.diagnostics);

        let mut planned_private = req.prior_private.clone();
        if let Some(modifier) = resource.as_modify_plan() {
            let response = modifier
                .modify_plan(
                    self.ctx(),
                    ModifyPlanRequest {
                        type_name: req.type_name.clone(),
                        config,
                        prior_state,
                        proposed_new_state: planned_state,
                        prior_private: req.prior_private,
                        provider_meta: optional_dynamic_value(req.provider_meta.as_ref())?,
                    },
                )
                .await;
            planned_state = response.planned_state;
            planned_private = response.planned_private;
            for path in response.requires_replace {
                if !requires_replace.contains(&path) {
                    requires_replace.push(path);
                }
            }
            diagnostics.extend(response.diagnostics);
        }

        let planned_state = DynamicValue::new(schema.block.conform(&planned_state.value));

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&planned_state)?),
            requires_replace: requires_replace.iter().map(path_to_proto).collect(),
            planned_private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
            deferred: None,
            planned_identity: req.prior_identity,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let planned_state = decode_dynamic_value(req.planned_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;
        let provider_meta = optional_dynamic_value(req.provider_meta.as_ref())?;

        let (resource, mut diagnostics) = self.resource(&req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: req.prior_state,
                private: req.planned_private,
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
                new_identity: None,
            }));
        }
        let schema = self.resource_schema(resource.as_ref()).await;

        let (new_state, private, new_identity) = if planned_state.is_null() {
            tracing::debug!(type_name = %req.type_name, "deleting resource");
            let response = resource
                .delete(
                    self.ctx(),
                    DeleteResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);
            let state = if failed {
                prior_state
            } else {
                DynamicValue::null()
            };
            (state, req.planned_private, None)
        } else if prior_state.is_null() {
            tracing::debug!(type_name = %req.type_name, "creating resource");
            let response = resource
                .create(
                    self.ctx(),
                    CreateResourceRequest {
                        type_name: req.type_name.clone(),
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (response.new_state, response.private, None)
        } else {
            tracing::debug!(type_name = %req.type_name, "updating resource");
            let response = resource
                .update(
                    self.ctx(),
                    UpdateResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                        planned_identity: identity_from_proto(req.planned_identity.as_ref())?,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (response.new_state, response.private, response.new_identity)
        };

        let new_state = DynamicValue::new(schema.block.conform(&new_state.value));

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
            new_identity: identity_to_proto(new_identity.as_ref())?,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let (resource, mut diagnostics) = self.resource(&req.type_name).await?;

        let Some(importer) = resource.as_import_state() else {
            diagnostics.push(Diagnostic::error(
                "Resource Import Not Implemented",
                format!("{} does not support import", req.type_name),
            ));
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        };

        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        }

        let schema = self.resource_schema(resource.as_ref()).await;
        let response = importer
            .import_state(
                self.ctx(),
                ImportResourceStateRequest {
                    type_name: req.type_name.clone(),
                    id: req.id,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                    identity: identity_from_proto(req.identity.as_ref())?,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            let state = DynamicValue::new(schema.block.conform(&imported.state.value));
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: if imported.type_name.is_empty() {
                    req.type_name.clone()
                } else {
                    imported.type_name
                },
                state: Some(encode_dynamic_value(&state)?),
                private: imported.private,
                identity: identity_to_proto(imported.identity.as_ref())?,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn move_resource_state(
        &self,
        _request: Request<proto::move_resource_state::Request>,
    ) -> Result<Response<proto::move_resource_state::Response>, Status> {
        Err(Status::unimplemented("moving resource state is not supported"))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;
        let (data_source, mut diagnostics) = self.data_source(&req.type_name).await?;

        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: None,
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        }

        let schema = data_source
            .schema(self.ctx(), DataSourceSchemaRequest)
            .await
            .schema;
        let response = data_source
            .read(
                self.ctx(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta: optional_dynamic_value(req.provider_meta.as_ref())?,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let state = DynamicValue::new(schema.block.conform(&response.state.value));

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(&state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn validate_ephemeral_resource_config(
        &self,
        _request: Request<proto::validate_ephemeral_resource_config::Request>,
    ) -> Result<Response<proto::validate_ephemeral_resource_config::Response>, Status> {
        Err(Status::unimplemented("ephemeral resources are not supported"))
    }

    async fn open_ephemeral_resource(
        &self,
        _request: Request<proto::open_ephemeral_resource::Request>,
    ) -> Result<Response<proto::open_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented("ephemeral resources are not supported"))
    }

    async fn renew_ephemeral_resource(
        &self,
        _request: Request<proto::renew_ephemeral_resource::Request>,
    ) -> Result<Response<proto::renew_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented("ephemeral resources are not supported"))
    }

    async fn close_ephemeral_resource(
        &self,
        _request: Request<proto::close_ephemeral_resource::Request>,
    ) -> Result<Response<proto::close_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented("ephemeral resources are not supported"))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> Result<Response<proto::get_functions::Response>, Status> {
        Ok(Response::new(proto::get_functions::Response {
            functions: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn call_function(
        &self,
        request: Request<proto::call_function::Request>,
    ) -> Result<Response<proto::call_function::Response>, Status> {
        let name = request.into_inner().name;
        Ok(Response::new(proto::call_function::Response {
            result: None,
            error: Some(proto::FunctionError {
                text: format!("function {} is not defined by this provider", name),
                function_argument: None,
            }),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> Result<Response<proto::stop_provider::Response>, Status> {
        tracing::info!("stop requested, cancelling in-flight operations");
        self.stop.cancel();

        let provider = self.provider.read().await;
        let response = provider.stop(Context::new(), StopProviderRequest).await;

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

/// Outcome of the schema-driven part of planning
struct PlannedAttributes {
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

/// Applies defaults, marks computed attributes unknown and runs plan
/// modifiers on the top-level attributes of `planned`. Nested blocks are left
/// to the resource's own ModifyPlan.
fn plan_attributes(
    block: &Block,
    config: &DynamicValue,
    prior: &DynamicValue,
    planned: &mut DynamicValue,
) -> Result<PlannedAttributes, TfplugError> {
    let creating = prior.is_null();
    let value_at = |value: &DynamicValue, path: &AttributePath| {
        value.get(path).cloned().unwrap_or(Dynamic::Null)
    };

    for attr in &block.attributes {
        let Some(default) = &attr.default else {
            continue;
        };
        let path = AttributePath::new(&attr.name);
        if attr.optional && attr.computed && value_at(config, &path).is_null() {
            let value = default.default_value(DefaultRequest { path: path.clone() }).value;
            planned.set(&path, value.value)?;
        }
    }

    if creating || planned.value != prior.value {
        for attr in block.attributes.iter().filter(|attr| is_unset_computed(attr)) {
            let path = AttributePath::new(&attr.name);
            if value_at(config, &path).is_null() {
                planned.mark_unknown(&path)?;
            }
        }
    }

    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();
    for attr in &block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let path = AttributePath::new(&attr.name);
        let config_value = DynamicValue::new(value_at(config, &path));
        let state_value = DynamicValue::new(value_at(prior, &path));
        let mut plan_value = DynamicValue::new(value_at(planned, &path));

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config_value.clone(),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !creating && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        planned.set(&path, plan_value.value)?;
    }

    Ok(PlannedAttributes {
        requires_replace,
        diagnostics,
    })
}

fn is_unset_computed(attr: &Attribute) -> bool {
    attr.computed && attr.default.is_none()
}

pub(crate) fn decode_dynamic_value(
    value: Option<&proto::DynamicValue>,
) -> Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)?
    } else {
        DynamicValue::decode_json(&value.json)?
    };
    Ok(decoded)
}

fn optional_dynamic_value(
    value: Option<&proto::DynamicValue>,
) -> Result<Option<DynamicValue>, Status> {
    value.map(|v| decode_dynamic_value(Some(v))).transpose()
}

pub(crate) fn encode_dynamic_value(value: &DynamicValue) -> Result<proto::DynamicValue, Status> {
    Ok(proto::DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

fn identity_from_proto(
    identity: Option<&proto::ResourceIdentityData>,
) -> Result<Option<ResourceIdentityData>, Status> {
    identity
        .map(|identity| {
            Ok(ResourceIdentityData {
                identity_data: decode_dynamic_value(identity.identity_data.as_ref())?,
            })
        })
        .transpose()
}

fn identity_to_proto(
    identity: Option<&ResourceIdentityData>,
) -> Result<Option<proto::ResourceIdentityData>, Status> {
    identity
        .map(|identity| {
            Ok(proto::ResourceIdentityData {
                identity_data: Some(encode_dynamic_value(&identity.identity_data)?),
            })
        })
        .transpose()
}

fn client_capabilities_from_proto(
    capabilities: Option<proto::ClientCapabilities>,
) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

fn server_capabilities_to_proto(
    capabilities: &crate::types::ServerCapabilities,
) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: capabilities.plan_destroy,
        get_provider_schema_optional: capabilities.get_provider_schema_optional,
        move_resource_state: capabilities.move_resource_state,
    }
}

fn deferred_to_proto(deferred: &Deferred) -> proto::Deferred {
    let reason = match deferred.reason {
        DeferredReason::Unknown => proto::deferred::Reason::Unknown,
        DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
        DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
        DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
    };
    proto::Deferred {
        reason: reason as i32,
    }
}

pub(crate) fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

pub(crate) fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|diag| {
            let severity = match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: diag.summary,
                detail: diag.detail,
                attribute: diag.attribute.as_ref().map(path_to_proto),
                function_argument: None,
            }
        })
        .collect()
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

pub(crate) fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block.attributes.iter().map(attribute_to_proto).collect(),
        block_types: block.block_types.iter().map(nested_block_to_proto).collect(),
        description: block.description.clone(),
        description_kind: string_kind_to_proto(block.description_kind),
        deprecated: block.deprecated,
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_bytes(),
        nested_type: None,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
        write_only: false,
    }
}

fn nested_block_to_proto(nested: &NestedBlock) -> proto::schema::NestedBlock {
    use proto::schema::nested_block::NestingMode as ProtoNesting;

    let nesting = match nested.nesting {
        NestingMode::Invalid => ProtoNesting::Invalid,
        NestingMode::Single => ProtoNesting::Single,
        NestingMode::List => ProtoNesting::List,
        NestingMode::Set => ProtoNesting::Set,
        NestingMode::Map => ProtoNesting::Map,
        NestingMode::Group => ProtoNesting::Group,
    };

    proto::schema::NestedBlock {
        type_name: nested.type_name.clone(),
        block: Some(block_to_proto(&nested.block)),
        nesting: nesting as i32,
        min_items: nested.min_items,
        max_items: nested.max_items,
    }
}
