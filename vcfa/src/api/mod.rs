pub mod client;
pub mod common;
pub mod content_libraries;
pub mod error;
pub mod orgs;
pub mod rights;
pub mod task;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientConfig, Credentials, RetryConfig, TenantContext, SYSTEM_ORG};
pub use common::*;
pub use content_libraries::{ContentLibrary, SubscriptionConfig};
pub use error::ApiError;
pub use orgs::TmOrg;
pub use rights::Right;
pub use task::Task;
