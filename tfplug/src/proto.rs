//! Generated Terraform Plugin Protocol v6.9 types
//!
//! Built from `proto/tfplugin6.9.proto` by tonic-build. Several messages share
//! names with framework types (`DynamicValue`, `Diagnostic`, `Schema`), so
//! refer to these through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
