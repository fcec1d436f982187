//! Rights API implementation

use super::client::Client;
use super::common::{deserialize_null_default, single_match, ApiQueryParams, OpenApiReference};
use super::error::ApiError;
use serde::{Deserialize, Serialize};

const RIGHTS_PATH: &str = "/cloudapi/1.0.0/rights";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Right {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub bundle_key: String,
    /// Category URN, `urn:vcloud:rightsCategory:...`
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub category: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub right_type: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub service_namespace: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub implied_rights: Vec<OpenApiReference>,
}

pub struct RightsApi<'a> {
    client: &'a Client,
}

impl<'a> RightsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /cloudapi/1.0.0/rights/{id}
    pub async fn get_by_id(&self, id: &str) -> Result<Right, ApiError> {
        self.client
            .get(&format!("{}/{}", RIGHTS_PATH, id), None)
            .await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Right, ApiError> {
        let params = ApiQueryParams::new().filter_eq("name", name);
        let rights: Vec<Right> = self.client.get_all(RIGHTS_PATH, &params, None).await?;

        single_match(rights, &format!("right '{}'", name))
    }
}
