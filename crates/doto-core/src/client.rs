//! Authenticated request gateway.
//!
//! Every call is a single GET with `client_id` and `api_key` in the query string. The API
//! reports success or failure through the `status` field of the JSON body, so a body that
//! parses as JSON is judged by that field, whatever the HTTP status line says.

use crate::config::{ClientConfig, CredentialSource, Credentials};
use crate::query::QueryParams;
use crate::{Error, Result};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Query parameter carrying the client id.
pub const CLIENT_ID_PARAM: &str = "client_id";
/// Query parameter carrying the api key.
pub const API_KEY_PARAM: &str = "api_key";

const STATUS_FIELD: &str = "status";
const STATUS_OK: &str = "OK";
const MESSAGE_FIELDS: [&str; 2] = ["error_message", "message"];

/// Builder for [`ApiClient`].
#[derive(Debug, Clone, Default)]
pub struct ApiClientBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
}

impl ApiClientBuilder {
    /// Create a builder targeting the production API.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the HTTP client configuration.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    /// Use these credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Load credentials from `source` now.
    ///
    /// # Errors
    ///
    /// Propagates the source's error, normally [`Error::ConfigError`].
    pub fn with_credential_source(self, source: &dyn CredentialSource) -> Result<Self> {
        let credentials = source.load()?;
        Ok(self.with_credentials(credentials))
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if no credentials were supplied, the configuration is invalid,
    /// or the HTTP client cannot be built.
    pub fn build(self) -> Result<ApiClient> {
        let credentials = self.credentials.ok_or_else(|| {
            Error::ConfigError("No credentials configured for the API client".to_string())
        })?;

        let mut base_url = self.config.parse_base_url()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // Transport defaults apply: no timeout override.
        let http = ClientBuilder::new()
            .user_agent(self.config.user_agent.as_str())
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(ApiClient {
            http,
            base_url,
            credentials: Arc::new(credentials),
        })
    }
}

/// Authenticated, stateless gateway to the API.
///
/// Cloning is cheap: the HTTP pool and the credentials are shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    credentials: Arc<Credentials>,
}

impl ApiClient {
    /// Build a client for the production API with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        ApiClientBuilder::new().with_credentials(credentials).build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credentials sent with every request.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Shared handle to the credentials.
    #[must_use]
    pub fn shared_credentials(&self) -> Arc<Credentials> {
        Arc::clone(&self.credentials)
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let normalized = path.strip_prefix('/').unwrap_or(path);
        if normalized.is_empty() {
            return Err(Error::InvalidEndpoint(format!(
                "Empty endpoint path `{path}`"
            )));
        }

        // The joined URL must stay under the base URL.
        if normalized.starts_with('/') || Url::parse(normalized).is_ok() {
            return Err(Error::InvalidEndpoint(format!(
                "Endpoint path `{path}` is not relative to the base URL"
            )));
        }

        let url = self
            .base_url
            .join(normalized)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{path}`: {err}")))?;

        if url.origin() != self.base_url.origin() || !url.path().starts_with(self.base_url.path())
        {
            return Err(Error::InvalidEndpoint(format!(
                "Endpoint path `{path}` escapes the base URL"
            )));
        }

        Ok(url)
    }

    /// Issue one authenticated GET and return the parsed body.
    ///
    /// `client_id` and `api_key` always come from the client's credentials; entries with
    /// those names in `params` are discarded.
    ///
    /// # Errors
    ///
    /// - transport variants when the call does not complete
    /// - [`Error::ApiError`] when the body's `status` is anything but `OK`
    /// - [`Error::ParseError`] when a successful response is not JSON
    pub async fn request(&self, path: &str, params: &QueryParams) -> Result<Value> {
        let url = self.build_url(path)?;
        let extra = params.clone().without(&[CLIENT_ID_PARAM, API_KEY_PARAM]);

        let mut query: Vec<(&str, &str)> = vec![
            (CLIENT_ID_PARAM, self.credentials.client_id()),
            (API_KEY_PARAM, self.credentials.api_key()),
        ];
        query.extend(extra.as_pairs().iter().map(|(key, value)| (*key, value.as_str())));

        let param_names: Vec<&str> = extra.keys().collect();
        info!(path, params = ?param_names, "DigitalOcean request");

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        interpret_response(path, status, &text)
    }
}

fn interpret_response(path: &str, status: StatusCode, text: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(body) => check_body_status(path, status, body),
        Err(_) if !status.is_success() => Err(map_status_to_error(status, text.to_string())),
        Err(err) => Err(Error::ParseError(format!(
            "Failed to parse response for `{path}`: {err}"
        ))),
    }
}

fn check_body_status(path: &str, http_status: StatusCode, body: Value) -> Result<Value> {
    let reported = match body.get(STATUS_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(status)) => Some(status.clone()),
        Some(other) => Some(other.to_string()),
    };

    match reported {
        Some(status) if status.eq_ignore_ascii_case(STATUS_OK) => Ok(body),
        Some(status) => {
            let message = MESSAGE_FIELDS
                .iter()
                .find_map(|field| body.get(*field).and_then(Value::as_str))
                .unwrap_or("no error message supplied")
                .to_string();
            warn!(path, %status, %message, "DigitalOcean reported failure");
            Err(Error::ApiError { status, message })
        }
        None if http_status.is_success() => Ok(body),
        None => Err(map_status_to_error(http_status, body.to_string())),
    }
}

fn map_status_to_error(status: StatusCode, text: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::InvalidRequest(format!("authentication failed: {text}"))
        }
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("temporarily unavailable: {text}"))
        }
        status if status.is_server_error() => {
            Error::ServiceUnavailable(format!("server error {status}: {text}"))
        }
        _ => Error::HttpError(format!("error {status}: {text}")),
    }
}
