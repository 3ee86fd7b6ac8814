//! Asynchronous connection to the DigitalOcean v1 API.

use crate::listing::Listing;
use crate::models::{CreateDropletRequest, Droplet};
use crate::resource::{project, Fetched, Resource};
use crate::Result;
use doto_core::{ApiClient, ApiClientBuilder, ClientConfig, ConfigFile, Credentials, QueryParams};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Builder for [`Connection`].
///
/// A base URL set with [`ConnectionBuilder::with_base_url`] wins over the one in a
/// [`ClientConfig`], whichever is set first.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    config: ClientConfig,
    base_url: Option<String>,
    credentials: Option<Credentials>,
    config_path: Option<PathBuf>,
}

impl ConnectionBuilder {
    /// Create a builder for the production API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            base_url: None,
            credentials: None,
            config_path: None,
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use these credentials instead of reading the credentials file.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Read credentials from this file instead of the default location.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Build the connection, reading the credentials file unless credentials were given.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConfigError`] if the credentials file is missing or
    /// incomplete, or any error from building the HTTP client.
    pub fn build(self) -> Result<Connection> {
        let mut inner = ApiClientBuilder::new().with_config(self.config);
        if let Some(base_url) = self.base_url {
            inner = inner.with_base_url(base_url);
        }

        let inner = match self.credentials {
            Some(credentials) => inner.with_credentials(credentials),
            None => {
                let file = ConfigFile::resolve(self.config_path.as_deref())?;
                inner.with_credential_source(&file)?
            }
        };

        Ok(Connection {
            inner: inner.build()?,
        })
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection to the API.
///
/// Holds no session; every call is authenticated on its own. Cloning is cheap and every
/// [`Droplet`] keeps a clone for its own follow-up calls.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: ApiClient,
}

impl Connection {
    /// Connect using the credentials file at `path`, or the default location.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConfigError`] if the credentials cannot be loaded.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConnectionBuilder::new();
        if let Some(path) = path {
            builder = builder.with_config_path(path);
        }
        builder.build()
    }

    /// Connect with explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_credentials(credentials: Credentials) -> Result<Self> {
        ConnectionBuilder::new().with_credentials(credentials).build()
    }

    /// Start a [`ConnectionBuilder`].
    #[must_use]
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// Credentials sent with every request.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        self.inner.credentials()
    }

    /// Authenticated GET on an arbitrary path, returning the parsed body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn request(&self, path: &str, params: &QueryParams) -> Result<Value> {
        self.inner.request(path, params).await
    }

    /// Fetch `resource` and project it, or return the raw body when `status_check` is set.
    ///
    /// # Errors
    ///
    /// Gateway errors, plus [`crate::Error::MissingField`] when the response lacks the
    /// resource key.
    pub async fn fetch(
        &self,
        resource: Resource,
        params: &QueryParams,
        status_check: bool,
    ) -> Result<Fetched> {
        let body = self.inner.request(&resource.path(), params).await?;
        if status_check {
            return Ok(Fetched::Raw(body));
        }
        project(resource, body, self)
    }

    /// Raw, unprojected body for `resource`.
    ///
    /// # Errors
    ///
    /// Gateway errors only; the body is not inspected beyond its `status`.
    pub async fn status_check(&self, resource: Resource) -> Result<Value> {
        self.fetch(resource, &QueryParams::new(), true)
            .await?
            .into_raw()
    }

    /// Create a droplet.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ApiError`] if the API refuses the request (for instance when
    /// name, size, image or region is missing).
    pub async fn create_droplet(&self, request: &CreateDropletRequest) -> Result<Droplet> {
        info!(name = ?request.name, "create droplet");
        self.fetch(Resource::NewDroplet, &request.to_params(), false)
            .await?
            .into_droplet()
    }

    /// Fetch one droplet by id.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ApiError`] if the droplet does not exist.
    pub async fn get_droplet(&self, id: u64) -> Result<Droplet> {
        self.fetch(Resource::Droplet(id), &QueryParams::new(), false)
            .await?
            .into_droplet()
    }

    /// All droplets, in the order the API lists them.
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_all_droplets(&self) -> Result<Vec<Droplet>> {
        info!("get all droplets");
        self.fetch(Resource::Droplets, &QueryParams::new(), false)
            .await?
            .into_droplets()
    }

    async fn get_listing(&self, resource: Resource) -> Result<Listing> {
        self.fetch(resource, &QueryParams::new(), false)
            .await?
            .into_listing()
    }

    /// Droplet sizes, cheapest first.
    ///
    /// Every listing method projects its answer. The unprojected body is available through
    /// [`Connection::status_check`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> doto::Result<()> {
    /// use doto::{Connection, Resource};
    ///
    /// let connection = Connection::new(None)?;
    /// let sizes = connection.get_sizes().await?;
    /// let raw = connection.status_check(Resource::Sizes).await?;
    /// # let _ = (sizes, raw);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_sizes(&self) -> Result<Listing> {
        self.get_listing(Resource::Sizes).await
    }

    /// Regions, in API order.
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_regions(&self) -> Result<Listing> {
        self.get_listing(Resource::Regions).await
    }

    /// Public images and the account's private images, in API order.
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_images(&self) -> Result<Listing> {
        self.get_listing(Resource::Images).await
    }

    /// The account's SSH keys, in API order.
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_ssh_keys(&self) -> Result<Listing> {
        self.get_listing(Resource::SshKeys).await
    }

    /// The account's domains, in API order.
    ///
    /// # Errors
    ///
    /// Gateway errors, or [`crate::Error::MissingField`] for a malformed answer.
    pub async fn get_domains(&self) -> Result<Listing> {
        self.get_listing(Resource::Domains).await
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigitalOcean connection to {}", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_connection(server: &MockServer) -> Connection {
        Connection::builder()
            .with_base_url(server.uri())
            .with_credentials(Credentials::new("abc", "xyz"))
            .build()
            .unwrap()
    }

    async fn mount_ok(server: &MockServer, endpoint: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("client_id", "abc"))
            .and(query_param("api_key", "xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    fn three_priced(key: &str) -> Value {
        json!({
            "status": "OK",
            key: [
                {"id": 1, "name": "first", "cost_per_hour": 0.119},
                {"id": 2, "name": "second", "cost_per_hour": 0.007},
                {"id": 3, "name": "third", "cost_per_hour": 0.0149}
            ]
        })
    }

    #[tokio::test]
    async fn create_droplet_returns_entity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/droplets/new"))
            .and(query_param("name", "web-01"))
            .and(query_param("size_id", "66"))
            .and(query_param("image_id", "1341147"))
            .and(query_param("region_id", "1"))
            .and(query_param("ssh_key_ids", "18669"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "droplet": {
                    "id": 100_824,
                    "name": "web-01",
                    "image_id": 1_341_147,
                    "size_id": 66,
                    "event_id": 7499
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connection = test_connection(&server);
        let request = CreateDropletRequest::new("web-01")
            .with_size_id(66)
            .with_image_id(1_341_147)
            .with_region_id(1)
            .with_ssh_key_id(18669);
        let droplet = connection.create_droplet(&request).await.unwrap();

        assert_eq!(droplet.id(), 100_824);
        assert_eq!(droplet.name(), "web-01");
        assert_eq!(droplet.record().image_id, Some(1_341_147));
        assert_eq!(droplet.record().size_id, Some(66));
        assert_eq!(droplet.record().extra.get("event_id"), Some(&json!(7499)));
        assert_eq!(droplet.credentials(), &Credentials::new("abc", "xyz"));

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0]
            .url
            .query_pairs()
            .any(|(key, _)| key == "private_networking"));
    }

    #[tokio::test]
    async fn create_droplet_surfaces_api_error() {
        let server = MockServer::start().await;
        mount_ok(
            &server,
            "/droplets/new",
            json!({"status": "ERROR", "error_message": "You must specify a size"}),
        )
        .await;

        let err = test_connection(&server)
            .create_droplet(&CreateDropletRequest::new("web-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApiError { ref message, .. } if message.contains("size")));
    }

    #[tokio::test]
    async fn get_all_droplets_preserves_order() {
        let server = MockServer::start().await;
        mount_ok(
            &server,
            "/droplets",
            json!({
                "status": "OK",
                "droplets": [
                    {"id": 30, "name": "c", "status": "active"},
                    {"id": 10, "name": "a", "status": "off"},
                    {"id": 20, "name": "b", "status": "new"}
                ]
            }),
        )
        .await;

        let droplets = test_connection(&server).get_all_droplets().await.unwrap();
        let ids: Vec<u64> = droplets.iter().map(Droplet::id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_eq!(droplets[1].status(), Some("off"));
        assert!(droplets
            .iter()
            .all(|droplet| droplet.credentials().client_id() == "abc"));
    }

    #[tokio::test]
    async fn get_all_droplets_with_none() {
        let server = MockServer::start().await;
        mount_ok(&server, "/droplets", json!({"status": "OK", "droplets": []})).await;

        let droplets = test_connection(&server).get_all_droplets().await.unwrap();
        assert!(droplets.is_empty());
    }

    #[tokio::test]
    async fn base_url_survives_http_config() {
        let server = MockServer::start().await;
        mount_ok(&server, "/regions", json!({"status": "OK", "regions": []})).await;

        let connection = Connection::builder()
            .with_base_url(server.uri())
            .with_http_config(ClientConfig::new().with_user_agent("doto-tests"))
            .with_credentials(Credentials::new("abc", "xyz"))
            .build()
            .unwrap();

        assert!(connection.base_url().as_str().starts_with(&server.uri()));
        assert!(connection.get_regions().await.unwrap().is_empty());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests[0].headers.get("user-agent").unwrap(),
            "doto-tests"
        );
    }

    #[tokio::test]
    async fn status_check_returns_raw_body() {
        let server = MockServer::start().await;
        let body = json!({
            "status": "OK",
            "droplets": [{"id": 1, "name": "a"}],
            "unexpected": {"nested": [1, 2, 3]}
        });
        mount_ok(&server, "/droplets", body.clone()).await;

        let raw = test_connection(&server)
            .status_check(Resource::Droplets)
            .await
            .unwrap();
        assert_eq!(raw, body);
    }

    #[tokio::test]
    async fn status_check_skips_projection_of_malformed_body() {
        let server = MockServer::start().await;
        mount_ok(&server, "/sizes", json!({"status": "OK"})).await;

        let connection = test_connection(&server);
        let fetched = connection
            .fetch(Resource::Sizes, &QueryParams::new(), true)
            .await
            .unwrap();
        assert!(matches!(fetched, Fetched::Raw(_)));
    }

    #[tokio::test]
    async fn sizes_are_sorted_by_cost() {
        let server = MockServer::start().await;
        mount_ok(&server, "/sizes", three_priced("sizes")).await;

        let sizes = test_connection(&server).get_sizes().await.unwrap();
        assert_eq!(
            sizes.column("cost_per_hour"),
            vec![Some(&json!(0.007)), Some(&json!(0.0149)), Some(&json!(0.119))]
        );
    }

    #[tokio::test]
    async fn other_listings_keep_api_order() {
        let server = MockServer::start().await;
        for (endpoint, key) in [
            ("/regions", "regions"),
            ("/images", "images"),
            ("/ssh_keys", "ssh_keys"),
            ("/domains", "domains"),
        ] {
            mount_ok(&server, endpoint, three_priced(key)).await;
        }

        let connection = test_connection(&server);
        let listings = [
            connection.get_regions().await.unwrap(),
            connection.get_images().await.unwrap(),
            connection.get_ssh_keys().await.unwrap(),
            connection.get_domains().await.unwrap(),
        ];
        for listing in &listings {
            assert_eq!(
                listing.column("cost_per_hour"),
                vec![Some(&json!(0.119)), Some(&json!(0.007)), Some(&json!(0.0149))]
            );
        }
    }

    #[tokio::test]
    async fn missing_payload_key_is_structural_error() {
        let server = MockServer::start().await;
        mount_ok(&server, "/droplets/5", json!({"status": "OK"})).await;

        let err = test_connection(&server).get_droplet(5).await.unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }

    #[tokio::test]
    async fn get_droplet_reads_all_attributes() {
        let server = MockServer::start().await;
        mount_ok(
            &server,
            "/droplets/42",
            json!({
                "status": "OK",
                "droplet": {
                    "id": 42,
                    "name": "db-01",
                    "status": "active",
                    "region_id": 1,
                    "backups_active": false,
                    "ip_address": "198.51.100.7",
                    "private_ip_address": "10.128.0.7",
                    "locked": false,
                    "created_at": "2013-11-22T17:16:31Z"
                }
            }),
        )
        .await;

        let connection = test_connection(&server);
        let droplet = connection.get_droplet(42).await.unwrap();
        assert_eq!(droplet.ip_address(), Some("198.51.100.7"));
        assert_eq!(droplet.record().backups_active, Some(false));
        assert!(droplet.record().created_at.is_some());
    }

    #[tokio::test]
    async fn droplet_status_check_targets_its_id() {
        let server = MockServer::start().await;
        let body = json!({"status": "OK", "droplet": {"id": 9, "name": "cache"}});
        Mock::given(method("GET"))
            .and(path("/droplets/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let connection = test_connection(&server);
        let droplet = connection.get_droplet(9).await.unwrap();
        assert_eq!(droplet.status_check().await.unwrap(), body);
        assert_eq!(droplet.refresh().await.unwrap().name(), "cache");
    }

    #[test]
    fn connection_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[Credentials]\nclient_id = file-client\napi_key = file-key\n")
            .unwrap();

        let connection = Connection::new(Some(file.path())).unwrap();
        assert_eq!(connection.credentials().client_id(), "file-client");
        assert_eq!(connection.credentials().api_key(), "file-key");
        assert_eq!(
            connection.to_string(),
            "DigitalOcean connection to https://api.digitalocean.com/"
        );
    }

    #[test]
    fn connection_with_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Connection::new(Some(dir.path().join("nope.cfg").as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
