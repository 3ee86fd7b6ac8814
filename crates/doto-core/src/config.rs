//! Credentials and client configuration.
//!
//! Credentials live in an INI file with a `Credentials` section:
//!
//! ```ini
//! [Credentials]
//! client_id = abc123
//! api_key = 0123456789abcdef
//! ```
//!
//! The file is looked up at an explicit path, else `$DOTO_CONFIG`, else
//! `~/.doto/.doto.cfg`.

use crate::{Error, Result};
use ini::Ini;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;
use validator::Validate;

/// Production API address.
pub const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com";

/// Environment variable naming the credentials file.
pub const CONFIG_PATH_ENV: &str = "DOTO_CONFIG";

/// Location of the credentials file relative to the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".doto/.doto.cfg";

/// INI section holding the credentials.
pub const CREDENTIALS_SECTION: &str = "Credentials";

const CLIENT_ID_KEY: &str = "client_id";
const API_KEY_KEY: &str = "api_key";

/// API credentials: the public client id and the secret api key.
///
/// Both values are sent as query parameters on every request.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    api_key: SecretString,
}

impl Credentials {
    /// Create credentials from a client id and api key.
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    /// The client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The api key. This exposes the secret.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.api_key() == other.api_key()
    }
}

impl Eq for Credentials {}

/// Anything that can hand out credentials.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialSource {
    /// Produce the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the credentials cannot be produced.
    fn load(&self) -> Result<Credentials>;
}

impl CredentialSource for Credentials {
    fn load(&self) -> Result<Credentials> {
        Ok(self.clone())
    }
}

/// Credentials file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Use the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `path` if given, else the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if no path was given and no home directory can be found.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        Self::resolve_with(
            path,
            std::env::var_os(CONFIG_PATH_ENV),
            dirs_next::home_dir(),
        )
    }

    /// Resolution order: explicit path, `env_path`, then `home`/[`DEFAULT_CONFIG_FILE`].
    ///
    /// # Errors
    ///
    /// Returns an error if none of the three yields a path.
    pub fn resolve_with(
        path: Option<&Path>,
        env_path: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = path {
            return Ok(Self::new(path));
        }
        if let Some(env_path) = env_path.filter(|value| !value.is_empty()) {
            return Ok(Self::new(env_path));
        }
        home.map(|home| Self::new(home.join(DEFAULT_CONFIG_FILE)))
            .ok_or_else(|| {
                Error::ConfigError(
                    "No credentials path given and no home directory found".to_string(),
                )
            })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse credentials from INI text. `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] on malformed INI or missing/empty keys.
    pub fn parse(text: &str, origin: &str) -> Result<Credentials> {
        let ini = Ini::load_from_str(text).map_err(|err| {
            Error::ConfigError(format!("Malformed credentials file `{origin}`: {err}"))
        })?;

        let section = ini.section(Some(CREDENTIALS_SECTION)).ok_or_else(|| {
            Error::ConfigError(format!(
                "Missing [{CREDENTIALS_SECTION}] section in `{origin}`"
            ))
        })?;

        let required = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::ConfigError(format!(
                        "Missing `{key}` in [{CREDENTIALS_SECTION}] of `{origin}`"
                    ))
                })
        };

        Ok(Credentials::new(required(CLIENT_ID_KEY)?, required(API_KEY_KEY)?))
    }
}

impl CredentialSource for ConfigFile {
    fn load(&self) -> Result<Credentials> {
        let origin = self.path.display().to_string();
        debug!("loading credentials from {origin}");

        let text = std::fs::read_to_string(&self.path).map_err(|err| {
            Error::ConfigError(format!("Cannot read credentials file `{origin}`: {err}"))
        })?;

        Self::parse(&text, &origin)
    }
}

/// HTTP client settings for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    /// API base URL
    #[validate(url)]
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[validate(length(min = 1))]
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("doto/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    /// Configuration pointing at the production API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }

    /// Point the client at another address (a mock server, a proxy).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate and parse the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the URL cannot be parsed.
    pub fn parse_base_url(&self) -> Result<Url> {
        self.validate()?;
        Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("Invalid base URL: {e}")))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
