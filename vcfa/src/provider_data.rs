//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::config::DEFAULT_IMPORT_SEPARATOR;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct VcfaProviderData {
    pub client: Arc<Client>,
    /// Joins org and entity names in import IDs
    pub import_separator: String,
}

impl VcfaProviderData {
    pub fn new(client: Client, import_separator: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            import_separator: import_separator.into(),
        }
    }

    pub fn with_default_separator(client: Client) -> Self {
        Self::new(client, DEFAULT_IMPORT_SEPARATOR)
    }

    /// Recovers the provider data handed to a resource or data source's
    /// `configure`
    pub fn from_any(data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Self, Diagnostic> {
        let data = data.ok_or_else(|| {
            Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )
        })?;

        data.downcast_ref::<VcfaProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract VcfaProviderData from provider data",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClientConfig, Credentials};

    fn client() -> Client {
        Client::new(ClientConfig::new(
            "https://vcfa.example.com",
            "System",
            Credentials::Token("t".to_string()),
        ))
        .unwrap()
    }

    #[test]
    fn from_any_downcasts() {
        let data: Arc<dyn Any + Send + Sync> =
            Arc::new(VcfaProviderData::new(client(), "/"));
        let recovered = VcfaProviderData::from_any(Some(data)).unwrap();
        assert_eq!(recovered.import_separator, "/");
    }

    #[test]
    fn from_any_rejects_missing_and_foreign_data() {
        let missing = VcfaProviderData::from_any(None).err().unwrap();
        assert_eq!(missing.summary, "No provider data");

        let foreign: Arc<dyn Any + Send + Sync> = Arc::new(42_u32);
        let invalid = VcfaProviderData::from_any(Some(foreign)).err().unwrap();
        assert_eq!(invalid.summary, "Invalid provider data");
    }

    #[test]
    fn default_separator_is_dot() {
        assert_eq!(
            VcfaProviderData::with_default_separator(client()).import_separator,
            "."
        );
    }
}
