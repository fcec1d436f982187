//! Common types and utilities for the VCFA CloudAPI

use super::error::ApiError;
use serde::{Deserialize, Deserializer, Serialize};

/// Page size requested for collection endpoints
pub const PAGE_SIZE: u32 = 128;

/// Reference to another entity, as CloudAPI embeds them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenApiReference {
    pub id: String,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,
}

impl OpenApiReference {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }
}

/// One page of a CloudAPI collection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiPage<T> {
    #[serde(default)]
    pub result_total: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

/// Error body returned by CloudAPI and the legacy API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcfaErrorResponse {
    #[serde(default)]
    pub message: String,
    pub minor_error_code: Option<String>,
    pub major_error_code: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// FIQL equality filter, e.g. `name==tenant`
    pub fn filter_eq(self, field: &str, value: &str) -> Self {
        self.add("filter", format!("{}=={}", field, escape_fiql(value)))
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Percent-encodes the FIQL operators `,` (or) and `;` (and) inside a value
fn escape_fiql(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(',', "%2C")
        .replace(';', "%3B")
}

/// The only entity a name filter returned. `what` names it in errors.
pub fn single_match<T>(items: Vec<T>, what: &str) -> Result<T, ApiError> {
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(ApiError::NotFound(what.to_string())),
        (Some(_), Some(_)) => Err(ApiError::Ambiguous(what.to_string())),
    }
}

/// CloudAPI sends `null` for unset strings and lists
pub fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The UUID part of a URN such as `urn:vcloud:org:<uuid>`
pub fn extract_uuid(urn: &str) -> &str {
    urn.rsplit(':').next().unwrap_or(urn)
}
