use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::common::{extract_uuid, ApiQueryParams, OpenApiPage, VcfaErrorResponse, PAGE_SIZE};
use super::error::ApiError;
use tfplug::Context;

macro_rules! api_version {
    () => {
        "40.0"
    };
}

pub const API_VERSION: &str = api_version!();
pub const SYSTEM_ORG: &str = "System";

const ACCEPT_JSON: &str = concat!("application/json;version=", api_version!());
const ACCEPT_LEGACY_JSON: &str = concat!("application/*+json;version=", api_version!());
const ACCESS_TOKEN_HEADER: &str = "x-vmware-vcloud-access-token";
const TENANT_CONTEXT_HEADER: &str = "x-vmware-vcloud-tenant-context";
const AUTH_CONTEXT_HEADER: &str = "x-vmware-vcloud-auth-context";

/// How the client obtains its bearer token
#[derive(Clone)]
pub enum Credentials {
    /// Session login with `user@org`
    Password { user: String, password: String },
    /// A bearer token used as is
    Token(String),
    /// Refresh token exchanged for an access token
    ApiToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::ApiToken(_) => f.write_str("ApiToken(<redacted>)"),
        }
    }
}

/// Org scope for requests made on behalf of a tenant
#[derive(Debug, Clone, PartialEq)]
pub struct TenantContext {
    pub org_id: String,
    pub org_name: String,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint without the trailing `/api`
    pub base_url: String,
    pub org: String,
    pub credentials: Credentials,
    pub allow_unverified_ssl: bool,
    /// Upper bound for waiting on asynchronous tasks
    pub max_retry_timeout: Duration,
    pub task_poll_interval: Duration,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, org: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            org: org.into(),
            credentials,
            allow_unverified_ssl: false,
            max_retry_timeout: Duration::from_secs(60),
            task_poll_interval: Duration::from_secs(1),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_allow_unverified_ssl(mut self, allow: bool) -> Self {
        self.allow_unverified_ssl = allow;
        self
    }

    pub fn with_max_retry_timeout(mut self, timeout: Duration) -> Self {
        self.max_retry_timeout = timeout;
        self
    }

    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// VCFA API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    org: String,
    credentials: Credentials,
    bearer: RwLock<Option<String>>,
    retry_config: RetryConfig,
    max_retry_timeout: Duration,
    task_poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        url::Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid url '{}': {}", config.base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.allow_unverified_ssl)
            .timeout(Duration::from_secs(config.retry.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let bearer = match &config.credentials {
            Credentials::Token(token) => Some(token.clone()),
            _ => None,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                org: config.org,
                credentials: config.credentials,
                bearer: RwLock::new(bearer),
                retry_config: config.retry,
                max_retry_timeout: config.max_retry_timeout,
                task_poll_interval: config.task_poll_interval,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Org the client logs in to
    pub fn org(&self) -> &str {
        &self.inner.org
    }

    /// Whether the client is logged in as a provider administrator
    pub fn is_system(&self) -> bool {
        self.inner.org.eq_ignore_ascii_case(SYSTEM_ORG)
    }

    pub fn max_retry_timeout(&self) -> Duration {
        self.inner.max_retry_timeout
    }

    pub(crate) fn task_poll_interval(&self) -> Duration {
        self.inner.task_poll_interval
    }

    /// Organization API operations
    pub fn orgs(&self) -> crate::api::orgs::OrgsApi<'_> {
        crate::api::orgs::OrgsApi::new(self)
    }

    /// Content library API operations
    pub fn content_libraries(&self) -> crate::api::content_libraries::ContentLibrariesApi<'_> {
        crate::api::content_libraries::ContentLibrariesApi::new(self)
    }

    /// Rights API operations
    pub fn rights(&self) -> crate::api::rights::RightsApi<'_> {
        crate::api::rights::RightsApi::new(self)
    }

    /// Obtains the bearer token for the configured credentials
    pub async fn authenticate(&self) -> Result<(), ApiError> {
        let token = match &self.inner.credentials {
            Credentials::Token(token) => token.clone(),
            Credentials::Password { user, password } => {
                self.login_with_password(user, password).await?
            }
            Credentials::ApiToken(refresh_token) => self.exchange_api_token(refresh_token).await?,
        };

        *self.inner.bearer.write().await = Some(token);
        tracing::debug!(org = %self.inner.org, "authenticated against {}", self.inner.base_url);
        Ok(())
    }

    async fn login_with_password(&self, user: &str, password: &str) -> Result<String, ApiError> {
        let path = if self.is_system() {
            "/cloudapi/1.0.0/sessions/provider"
        } else {
            "/cloudapi/1.0.0/sessions"
        };
        let url = self.url(path);
        let username = format!("{}@{}", user, self.inner.org);

        let response = self
            .send_with_retry(
                || {
                    self.inner
                        .http_client
                        .post(&url)
                        .header(ACCEPT, ACCEPT_JSON)
                        .basic_auth(&username, Some(password))
                },
                path,
            )
            .await?;

        response
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Auth(format!(
                    "login response did not include the {} header",
                    ACCESS_TOKEN_HEADER
                ))
            })
    }

    async fn exchange_api_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let path = if self.is_system() {
            "/oauth/provider/token".to_string()
        } else {
            format!("/oauth/tenant/{}/token", urlencoding::encode(&self.inner.org))
        };
        let url = self.url(&path);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .send_with_retry(
                || {
                    self.inner
                        .http_client
                        .post(&url)
                        .header(ACCEPT, "application/json")
                        .form(&form)
                },
                &path,
            )
            .await?;

        let token: TokenResponse = parse_json(response).await?;
        Ok(token.access_token)
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::GET, path, None::<&()>, ACCEPT_JSON, tenant)
            .await?;
        parse_json(response).await
    }

    /// GET against the legacy `/api` surface (tasks)
    pub(crate) async fn get_legacy<T: DeserializeOwned>(
        &self,
        path: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::GET, path, None::<&()>, ACCEPT_LEGACY_JSON, tenant)
            .await?;
        parse_json(response).await
    }

    /// Fetches every page of a collection
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
        tenant: Option<&TenantContext>,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let query = params
                .clone()
                .add("page", page)
                .add("pageSize", PAGE_SIZE)
                .to_query_string();
            let result: OpenApiPage<T> = self.get(&format!("{}{}", path, query), tenant).await?;
            items.extend(result.values);

            if page >= result.page_count {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// POST to a collection and return the created entity. An asynchronous
    /// answer is followed through its task, then the task owner is fetched.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
        tenant: Option<&TenantContext>,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::POST, path, Some(body), ACCEPT_JSON, tenant)
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            return parse_json(response).await;
        }

        let task = self
            .wait_for_task(ctx, &task_location(&response)?, tenant)
            .await?;
        let owner = task.owner.ok_or_else(|| {
            ApiError::Parse(format!("task for POST {} did not report an owner", path))
        })?;
        self.get(&format!("{}/{}", path, owner.id), tenant).await
    }

    /// PUT an entity and return its updated representation
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
        tenant: Option<&TenantContext>,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::PUT, path, Some(body), ACCEPT_JSON, tenant)
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            return parse_json(response).await;
        }

        self.wait_for_task(ctx, &task_location(&response)?, tenant)
            .await?;
        self.get(path, tenant).await
    }

    /// DELETE an entity, waiting for the task when the server answers 202
    pub async fn delete(
        &self,
        ctx: &Context,
        path: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<(), ApiError> {
        let response = self
            .execute(Method::DELETE, path, None::<&()>, ACCEPT_JSON, tenant)
            .await?;

        if response.status() == StatusCode::ACCEPTED {
            self.wait_for_task(ctx, &task_location(&response)?, tenant)
                .await?;
        }
        Ok(())
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        accept: &'static str,
        tenant: Option<&TenantContext>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        let headers = self.headers(accept, tenant).await?;

        tracing::debug!("{} request to: {}", method, url);

        self.send_with_retry(
            || {
                let builder = self
                    .inner
                    .http_client
                    .request(method.clone(), &url)
                    .headers(headers.clone());
                match body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            },
            path,
        )
        .await
    }

    async fn headers(
        &self,
        accept: &'static str,
        tenant: Option<&TenantContext>,
    ) -> Result<HeaderMap, ApiError> {
        let bearer = self
            .inner
            .bearer
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::Auth("client is not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);

        if let Some(tenant) = tenant {
            headers.insert(
                TENANT_CONTEXT_HEADER,
                header_value(extract_uuid(&tenant.org_id))?,
            );
            headers.insert(AUTH_CONTEXT_HEADER, header_value(&tenant.org_name)?);
        }

        Ok(headers)
    }

    /// Task links come back absolute; everything else is relative to the
    /// endpoint
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.inner.base_url, path)
        }
    }

    /// Sends the request built by `build_request`, retrying transient
    /// failures with exponential backoff
    async fn send_with_retry<F>(
        &self,
        build_request: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match build_request().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    match status {
                        StatusCode::UNAUTHORIZED => {
                            let error = error_from_response(response).await;
                            return Err(ApiError::Auth(error.to_string()));
                        }
                        StatusCode::TOO_MANY_REQUESTS => last_error = Some(ApiError::RateLimited),
                        StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT => {
                            last_error = Some(ApiError::ServiceUnavailable)
                        }
                        _ => return Err(error_from_response(response).await),
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidConfig(format!("invalid header value: {}", e)))
}

fn task_location(response: &reqwest::Response) -> Result<String, ApiError> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Parse("202 response without a task Location header".to_string()))
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    tracing::trace!("API response body: {}", text);

    serde_json::from_str::<T>(&text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Parse(format!("Failed to parse response: {}", e))
    })
}

/// Maps an error status to NotFound or Api, keeping VCFA's message and
/// minor error code when the body carries them
async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let (message, minor_code) = match serde_json::from_str::<VcfaErrorResponse>(&text) {
        Ok(body) if !body.message.is_empty() => (body.message, body.minor_error_code),
        _ => (text, None),
    };

    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(message);
    }

    ApiError::Api {
        status: status.as_u16(),
        message,
        minor_code,
    }
}
