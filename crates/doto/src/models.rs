//! Droplet models.

use crate::client::Connection;
use crate::resource::Resource;
use crate::Result;
use chrono::{DateTime, Utc};
use doto_core::{Credentials, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters for the `/droplets/new` endpoint.
///
/// Everything is optional here, but the API rejects requests lacking a name, size,
/// image or region.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateDropletRequest {
    /// Droplet name (used as its hostname).
    pub name: Option<String>,
    /// Size id, see [`Connection::get_sizes`].
    pub size_id: Option<u64>,
    /// Image id, see [`Connection::get_images`].
    pub image_id: Option<u64>,
    /// Region id, see [`Connection::get_regions`].
    pub region_id: Option<u64>,
    /// SSH keys to install, see [`Connection::get_ssh_keys`].
    pub ssh_key_ids: Vec<u64>,
    /// Enable a private network interface where the region supports it.
    pub private_networking: Option<bool>,
}

impl CreateDropletRequest {
    /// Start a request for a droplet called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the size id.
    #[must_use]
    pub const fn with_size_id(mut self, size_id: u64) -> Self {
        self.size_id = Some(size_id);
        self
    }

    /// Set the image id.
    #[must_use]
    pub const fn with_image_id(mut self, image_id: u64) -> Self {
        self.image_id = Some(image_id);
        self
    }

    /// Set the region id.
    #[must_use]
    pub const fn with_region_id(mut self, region_id: u64) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// Add an SSH key id.
    #[must_use]
    pub fn with_ssh_key_id(mut self, ssh_key_id: u64) -> Self {
        self.ssh_key_ids.push(ssh_key_id);
        self
    }

    /// Enable or disable private networking.
    #[must_use]
    pub const fn with_private_networking(mut self, enabled: bool) -> Self {
        self.private_networking = Some(enabled);
        self
    }

    /// Convert the parameters into query pairs, skipping unset ones.
    #[must_use]
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("name", self.name.as_deref());
        params.push_opt("size_id", self.size_id);
        params.push_opt("image_id", self.image_id);
        params.push_opt("region_id", self.region_id);
        params.push_joined("ssh_key_ids", &self.ssh_key_ids);
        params.push_opt("private_networking", self.private_networking);
        params
    }
}

/// Droplet attributes as returned by the API.
///
/// The create endpoint only echoes a subset, hence the optional fields. Anything the
/// API sends beyond the known fields lands in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropletRecord {
    /// Droplet id.
    pub id: u64,
    /// Droplet name.
    pub name: String,
    /// Lifecycle status (`new`, `active`, `off`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Image the droplet was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<u64>,
    /// Size id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_id: Option<u64>,
    /// Region id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<u64>,
    /// Whether backups are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backups_active: Option<bool>,
    /// Public IPv4 address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Private IPv4 address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    /// Locked while an event is in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields not modelled above (`event_id` on create, for instance).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A droplet snapshot together with the connection it came from.
///
/// The attributes are fixed at the time of the response. Use [`Droplet::refresh`] for a
/// newer snapshot.
#[derive(Debug, Clone)]
pub struct Droplet {
    record: DropletRecord,
    connection: Connection,
}

impl Droplet {
    /// Pair a record with the connection used for follow-up calls.
    #[must_use]
    pub fn new(record: DropletRecord, connection: Connection) -> Self {
        Self { record, connection }
    }

    /// Droplet id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.record.id
    }

    /// Droplet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Lifecycle status, if the response carried one.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.record.status.as_deref()
    }

    /// Public IPv4 address, if assigned.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.record.ip_address.as_deref()
    }

    /// All attributes.
    #[must_use]
    pub const fn record(&self) -> &DropletRecord {
        &self.record
    }

    /// Consume the droplet, keeping its attributes.
    #[must_use]
    pub fn into_record(self) -> DropletRecord {
        self.record
    }

    /// Credentials used for calls about this droplet.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        self.connection.credentials()
    }

    /// Connection used for calls about this droplet.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    fn resource(&self) -> Resource {
        Resource::Droplet(self.record.id)
    }

    /// Fetch a fresh snapshot of this droplet.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::get_droplet`].
    pub async fn refresh(&self) -> Result<Droplet> {
        self.connection.get_droplet(self.record.id).await
    }

    /// Raw API answer about this droplet.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::status_check`].
    pub async fn status_check(&self) -> Result<Value> {
        self.connection.status_check(self.resource()).await
    }
}
