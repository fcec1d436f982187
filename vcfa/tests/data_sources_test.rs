//! vcfa_org and vcfa_content_library data sources against a mocked CloudAPI

mod common;

use common::*;
use mockito::{Matcher, Server};
use tfplug::context::Context;
use tfplug::data_source::{
    DataSource, DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::provider::Provider;
use tfplug::types::{AttributePath, DynamicValue};

async fn read(
    data_source: &dyn DataSourceWithConfigure,
    type_name: &str,
    values: &[(&str, &str)],
) -> ReadDataSourceResponse {
    let mut config = DynamicValue::object();
    for (name, value) in values {
        let _ = config.set_string(&AttributePath::new(name), value.to_string());
    }
    data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: type_name.to_string(),
                config,
                provider_meta: None,
                client_capabilities: client_capabilities(),
            },
        )
        .await
}

#[tokio::test(flavor = "multi_thread")]
async fn org_data_source_reads_by_name() {
    let mut server = Server::new_async().await;
    let list = server
        .mock("GET", "/cloudapi/1.0.0/orgs")
        .match_query(Matcher::UrlEncoded(
            "filter".to_string(),
            "name==tenant1".to_string(),
        ))
        .with_body(format!(r#"{{"pageCount":1,"values":[{}]}}"#, ORG_JSON))
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let data_source = data_source("vcfa_org", provider_data).await;

    let response = read(data_source.as_ref(), "vcfa_org", &[("name", "tenant1")]).await;
    assert!(response.diagnostics.is_empty());
    assert_eq!(string_at(&response.state, "id"), "urn:vcloud:org:7d2b");
    assert_eq!(string_at(&response.state, "description"), "first tenant");
    assert_eq!(
        response
            .state
            .get_number(&AttributePath::new("catalog_count"))
            .unwrap(),
        2.0
    );
    list.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn org_data_source_reports_unknown_org() {
    let mut server = Server::new_async().await;
    let _empty = server
        .mock("GET", "/cloudapi/1.0.0/orgs")
        .match_query(Matcher::Any)
        .with_body(r#"{"pageCount":0,"values":[]}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let data_source = data_source("vcfa_org", provider_data).await;

    let response = read(data_source.as_ref(), "vcfa_org", &[("name", "ghost")]).await;
    assert_eq!(response.diagnostics[0].summary, "Failed to read org");
    assert!(response.state.is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn content_library_data_source_in_tenant() {
    let mut server = Server::new_async().await;
    let _org = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_body(ORG_JSON)
        .create_async()
        .await;
    let libraries = server
        .mock("GET", "/cloudapi/vcf/contentLibraries")
        .match_query(Matcher::UrlEncoded(
            "filter".to_string(),
            "name==mirror".to_string(),
        ))
        .match_header("x-vmware-vcloud-tenant-context", "7d2b")
        .with_body(
            r#"{"pageCount":1,"values":[{
                "id":"urn:vcloud:contentLibrary:77",
                "name":"mirror",
                "description":null,
                "autoAttach":false,
                "isSubscribed":true,
                "libraryType":"TENANT",
                "org":{"name":"tenant1","id":"urn:vcloud:org:7d2b"},
                "storageClasses":[{"name":"gold","id":"urn:vcloud:storageClass:2"}],
                "subscriptionConfig":{"subscriptionUrl":"https://publisher/lib.json"},
                "versionNumber":4
            }]}"#,
        )
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let data_source = data_source("vcfa_content_library", provider_data).await;

    let response = read(
        data_source.as_ref(),
        "vcfa_content_library",
        &[("name", "mirror"), ("org_id", "urn:vcloud:org:7d2b")],
    )
    .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = &response.state;
    assert_eq!(string_at(state, "description"), "");
    assert_eq!(
        state
            .get_string(
                &AttributePath::new("subscription_config")
                    .index(0)
                    .attribute("subscription_url")
            )
            .unwrap(),
        "https://publisher/lib.json"
    );
    assert_eq!(
        state
            .get_number(&AttributePath::new("version_number"))
            .unwrap(),
        4.0
    );
    libraries.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn content_library_data_source_without_org_is_provider_scoped() {
    let mut server = Server::new_async().await;
    let libraries = server
        .mock("GET", "/cloudapi/vcf/contentLibraries")
        .match_query(Matcher::Any)
        .match_header("x-vmware-vcloud-tenant-context", Matcher::Missing)
        .with_body(
            r#"{"pageCount":1,"values":[{
                "id":"urn:vcloud:contentLibrary:1",
                "name":"provider-lib",
                "libraryType":"PROVIDER",
                "org":{"name":"System","id":"urn:vcloud:org:a93c"},
                "storageClasses":[]
            }]}"#,
        )
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let data_source = data_source("vcfa_content_library", provider_data).await;

    let response = read(
        data_source.as_ref(),
        "vcfa_content_library",
        &[("name", "provider-lib")],
    )
    .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(string_at(&response.state, "org_id"), "urn:vcloud:org:a93c");
    assert!(response
        .state
        .get_list(&AttributePath::new("subscription_config"))
        .unwrap()
        .is_empty());
    libraries.assert_async().await;
}

#[tokio::test]
async fn unconfigured_data_source_reports_error() {
    let factories = vcfa::VcfaProvider::new().data_sources();
    let data_source = factories.get("vcfa_right").unwrap()();

    let response = read(
        data_source.as_ref(),
        "vcfa_right",
        &[("name", "Organization: View")],
    )
    .await;
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}
