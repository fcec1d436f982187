//! Shared setup for provider-level tests against a mockito server

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use tfplug::types::{AttributePath, ClientCapabilities, DynamicValue};
use vcfa::VcfaProvider;

pub type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        deferral_allowed: false,
        write_only_attributes_allowed: false,
    }
}

/// Provider block using a static bearer token, so no login call is made
pub fn token_config(url: &str, extra: &[(&str, &str)]) -> DynamicValue {
    let mut config = DynamicValue::object();
    let _ = config.set_string(&AttributePath::new("url"), url.to_string());
    let _ = config.set_string(&AttributePath::new("auth_type"), "token".to_string());
    let _ = config.set_string(&AttributePath::new("token"), "test-token".to_string());
    for (name, value) in extra {
        let _ = config.set_string(&AttributePath::new(name), value.to_string());
    }
    config
}

pub async fn configure_provider(config: DynamicValue) -> ProviderData {
    let mut provider = VcfaProvider::new();
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
                client_capabilities: client_capabilities(),
            },
        )
        .await;

    assert!(
        response.diagnostics.is_empty(),
        "configure failed: {:?}",
        response.diagnostics
    );
    response.provider_data
}

pub async fn resource(name: &str, provider_data: ProviderData) -> Box<dyn ResourceWithConfigure> {
    let factories = VcfaProvider::new().resources();
    let mut resource = factories.get(name).unwrap()();
    let response = resource
        .configure(Context::new(), ConfigureResourceRequest { provider_data })
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

pub async fn data_source(
    name: &str,
    provider_data: ProviderData,
) -> Box<dyn DataSourceWithConfigure> {
    let factories = VcfaProvider::new().data_sources();
    let mut data_source = factories.get(name).unwrap()();
    let response = data_source
        .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
        .await;
    assert!(response.diagnostics.is_empty());
    data_source
}

pub fn string_at(value: &DynamicValue, name: &str) -> String {
    value.get_string(&AttributePath::new(name)).unwrap()
}

pub const ORG_JSON: &str = r#"{
    "id": "urn:vcloud:org:7d2b",
    "name": "tenant1",
    "displayName": "Tenant One",
    "description": "first tenant",
    "isEnabled": true,
    "canManageOrgs": false,
    "isClassicTenant": false,
    "managedBy": {"name": "System", "id": "urn:vcloud:org:a93c"},
    "orgVdcCount": 0,
    "catalogCount": 2,
    "vappCount": 0,
    "runningVMCount": 0,
    "userCount": 5,
    "diskCount": 0,
    "directlyManagedOrgCount": 0
}"#;
