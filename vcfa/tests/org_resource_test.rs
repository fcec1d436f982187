//! vcfa_org resource against a mocked CloudAPI

mod common;

use common::*;
use mockito::{Matcher, Server};
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest,
    ReadResourceRequest, Resource, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, DynamicValue};

fn planned_org(display_name: &str) -> DynamicValue {
    let mut plan = DynamicValue::object();
    let _ = plan.set_string(&AttributePath::new("name"), "tenant1".to_string());
    let _ = plan.set_string(&AttributePath::new("display_name"), display_name.to_string());
    let _ = plan.set_bool(&AttributePath::new("is_enabled"), true);
    let _ = plan.set_bool(&AttributePath::new("is_subprovider"), false);
    let _ = plan.set_bool(&AttributePath::new("is_classic_tenant"), false);
    let _ = plan.mark_unknown(&AttributePath::new("id"));
    let _ = plan.mark_unknown(&AttributePath::new("description"));
    plan
}

fn org_state() -> DynamicValue {
    let mut state = planned_org("Tenant One");
    let _ = state.set_string(&AttributePath::new("id"), "urn:vcloud:org:7d2b".to_string());
    let _ = state.set_string(&AttributePath::new("description"), "first tenant".to_string());
    state
}

fn read_request(state: DynamicValue) -> ReadResourceRequest {
    ReadResourceRequest {
        type_name: "vcfa_org".to_string(),
        current_state: state,
        private: vec![],
        provider_meta: None,
        client_capabilities: client_capabilities(),
        current_identity: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn create_posts_org_and_reads_it_back() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/cloudapi/1.0.0/orgs")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJsonString(
            r#"{"name":"tenant1","displayName":"Tenant One","isEnabled":true,"canManageOrgs":false}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(ORG_JSON)
        .create_async()
        .await;
    let read_back = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_body(ORG_JSON)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let plan = planned_org("Tenant One");
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "vcfa_org".to_string(),
                planned_state: plan.clone(),
                config: plan,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(string_at(&response.new_state, "id"), "urn:vcloud:org:7d2b");
    assert_eq!(string_at(&response.new_state, "managed_by_name"), "System");
    assert_eq!(
        response
            .new_state
            .get_number(&AttributePath::new("user_count"))
            .unwrap(),
        5.0
    );

    create.assert_async().await;
    read_back.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn read_of_missing_org_clears_state() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_status(404)
        .with_body(r#"{"minorErrorCode":"NOT_FOUND","message":"Org not found"}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let response = resource.read(Context::new(), read_request(org_state())).await;
    assert!(response.diagnostics.is_empty());
    assert!(response.new_state.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn read_failure_keeps_state_and_reports_error() {
    let mut server = Server::new_async().await;
    let _broken = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_status(400)
        .with_body(r#"{"minorErrorCode":"BAD_REQUEST","message":"malformed id"}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let response = resource.read(Context::new(), read_request(org_state())).await;
    assert_eq!(response.diagnostics[0].summary, "Failed to read org");
    assert!(response.diagnostics[0].detail.contains("malformed id"));
    assert_eq!(response.new_state, Some(org_state()));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_puts_full_org() {
    let mut server = Server::new_async().await;
    let updated = ORG_JSON.replace("Tenant One", "Tenant Uno");
    let put = server
        .mock("PUT", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .match_body(Matcher::PartialJsonString(
            r#"{"id":"urn:vcloud:org:7d2b","name":"tenant1","displayName":"Tenant Uno"}"#
                .to_string(),
        ))
        .with_body(&updated)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let mut plan = org_state();
    let _ = plan.set_string(&AttributePath::new("display_name"), "Tenant Uno".to_string());
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "vcfa_org".to_string(),
                prior_state: org_state(),
                planned_state: plan.clone(),
                config: plan,
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(string_at(&response.new_state, "display_name"), "Tenant Uno");
    put.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_disables_enabled_org_first() {
    let mut server = Server::new_async().await;
    let get = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_body(ORG_JSON)
        .create_async()
        .await;
    let disable = server
        .mock("PUT", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .match_body(Matcher::PartialJsonString(r#"{"isEnabled":false}"#.to_string()))
        .with_body(ORG_JSON.replace(r#""isEnabled": true"#, r#""isEnabled": false"#))
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_status(204)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "vcfa_org".to_string(),
                prior_state: org_state(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    get.assert_async().await;
    disable.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_of_vanished_org_succeeds() {
    let mut server = Server::new_async().await;
    let _gone = server
        .mock("GET", "/cloudapi/1.0.0/orgs/urn:vcloud:org:7d2b")
        .with_status(404)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "vcfa_org".to_string(),
                prior_state: org_state(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn import_by_name() {
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
    let resource = resource("vcfa_org", provider_data).await;
    let importer = resource.as_import_state().unwrap();

    let response = importer
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "vcfa_org".to_string(),
                id: "tenant1".to_string(),
                client_capabilities: client_capabilities(),
                identity: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let imported = &response.imported_resources[0];
    assert_eq!(imported.type_name, "vcfa_org");
    assert_eq!(string_at(&imported.state, "id"), "urn:vcloud:org:7d2b");
    assert_eq!(string_at(&imported.state, "display_name"), "Tenant One");
    list.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn import_of_unknown_org_fails() {
    let mut server = Server::new_async().await;
    let _empty = server
        .mock("GET", "/cloudapi/1.0.0/orgs")
        .match_query(Matcher::Any)
        .with_body(r#"{"pageCount":0,"values":[]}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(token_config(&server.url(), &[])).await;
    let resource = resource("vcfa_org", provider_data).await;

    let response = resource
        .as_import_state()
        .unwrap()
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "vcfa_org".to_string(),
                id: "ghost".to_string(),
                client_capabilities: client_capabilities(),
                identity: None,
            },
        )
        .await;

    assert!(response.imported_resources.is_empty());
    assert!(response.diagnostics[0].detail.contains("'ghost'"));
}
