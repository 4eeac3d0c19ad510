//! HTTP client for the grading backend.
//!
//! Only two surfaces are consumed: the subscription usage endpoint and the
//! per-operation AI endpoints. Any non-2xx response becomes [`Error::Api`].

mod response;

pub use response::ApiErrorBody;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{ApiSettings, DEFAULT_TIMEOUT_SECS};
use crate::usage::{UsageResponse, UsageSnapshot};
use crate::{Error, Result};

pub const USAGE_PATH: &str = "api/subscription/usage";
pub const OPERATION_PATH_PREFIX: &str = "api/ai/";

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    token: Option<SecretString>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&settings.base_url)
            .timeout(settings.timeout);
        if let Some(token) = &settings.token {
            builder = builder.token_secret(token.clone());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidRequest(format!("invalid endpoint path {path:?}: {e}")))
    }

    pub fn operation_endpoint(&self, operation: &str) -> Result<Url> {
        let valid = !operation.is_empty()
            && operation
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidRequest(format!(
                "invalid operation name: {operation:?}"
            )));
        }
        self.endpoint(&format!("{OPERATION_PATH_PREFIX}{operation}"))
    }

    pub async fn fetch_usage(&self) -> Result<UsageSnapshot> {
        let url = self.endpoint(USAGE_PATH)?;
        let response: UsageResponse = self.send(self.http.get(url)).await?;
        Ok(response.into_snapshot())
    }

    /// POST `payload` to the endpoint for `operation` and return the
    /// backend's JSON reply (`Value::Null` for an empty body).
    pub async fn run_operation<P: Serialize + ?Sized>(
        &self,
        operation: &str,
        payload: &P,
    ) -> Result<serde_json::Value> {
        let url = self.operation_endpoint(operation)?;
        self.send(self.http.post(url).json(payload)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        tracing::debug!(%url, status = status.as_u16(), "Backend response");

        let body = response.text().await?;
        if !status.is_success() {
            let error = ApiErrorBody::parse(&body).into_error(status);
            tracing::warn!(%url, error = %error, "Backend request failed");
            return Err(error);
        }

        let body = if body.trim().is_empty() { "null" } else { &body };
        Ok(serde_json::from_str(body)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    token: Option<SecretString>,
    timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(self, token: impl Into<String>) -> Self {
        self.token_secret(SecretString::from(token.into()))
    }

    pub fn token_secret(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured HTTP client. The timeout setting is ignored.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let raw = self
            .base_url
            .unwrap_or_else(|| crate::config::DEFAULT_BASE_URL.to_string());
        let mut base_url = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid base URL {raw:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL must use http or https: {raw}"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(
                    self.timeout
                        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
                )
                .build()?,
        };

        Ok(ApiClient {
            base_url,
            token: self.token,
            http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::builder().base_url(base).build().unwrap()
    }

    #[test]
    fn test_endpoint_join() {
        let api = client("http://localhost:8000");
        assert_eq!(
            api.endpoint(USAGE_PATH).unwrap().as_str(),
            "http://localhost:8000/api/subscription/usage"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("https://grading.example.edu/backend");
        assert_eq!(
            api.operation_endpoint("grade").unwrap().as_str(),
            "https://grading.example.edu/backend/api/ai/grade"
        );
        assert_eq!(
            api.endpoint("/api/subscription/usage").unwrap().as_str(),
            "https://grading.example.edu/backend/api/subscription/usage"
        );
    }

    #[test]
    fn test_operation_name_validation() {
        let api = client("http://localhost:8000");
        assert!(api.operation_endpoint("../admin").is_err());
        assert!(api.operation_endpoint("").is_err());
        assert!(api.operation_endpoint("rubric_check").is_ok());
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = ApiClient::builder()
            .base_url("ftp://files.example.edu")
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());

        assert!(ApiClient::builder().base_url("not a url").build().is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let api = ApiClient::builder()
            .base_url("http://localhost:8000")
            .token("secret-bearer")
            .build()
            .unwrap();
        let debug = format!("{:?}", api);
        assert!(!debug.contains("secret-bearer"));
        assert!(debug.contains("authenticated: true"));
    }

    #[test]
    fn test_from_settings() {
        let settings = ApiSettings {
            base_url: "http://127.0.0.1:9000".into(),
            token: Some(SecretString::from("t".to_string())),
            timeout: Duration::from_secs(5),
        };
        let api = ApiClient::from_settings(&settings).unwrap();
        assert_eq!(api.base_url().as_str(), "http://127.0.0.1:9000/");
        assert!(api.has_token());
    }
}
