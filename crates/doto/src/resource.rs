//! Endpoints and the shapes their payloads are projected into.
//!
//! Each [`Resource`] knows its path, the response key holding its payload and whether
//! that payload becomes droplets or a [`Listing`]. [`project`] does the reshaping for all
//! of them.

use crate::client::Connection;
use crate::listing::Listing;
use crate::models::{Droplet, DropletRecord};
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Result shape of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single droplet.
    Entity,
    /// An ordered list of droplets.
    Entities,
    /// A read-only listing.
    Table,
}

/// Endpoints of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `/droplets/new`
    NewDroplet,
    /// `/droplets/{id}`
    Droplet(u64),
    /// `/droplets`
    Droplets,
    /// `/sizes`
    Sizes,
    /// `/regions`
    Regions,
    /// `/images`
    Images,
    /// `/ssh_keys`
    SshKeys,
    /// `/domains`
    Domains,
}

impl Resource {
    /// The reference-data endpoints.
    pub const LISTINGS: [Self; 5] = [
        Self::Sizes,
        Self::Regions,
        Self::Images,
        Self::SshKeys,
        Self::Domains,
    ];

    /// Endpoint path.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::NewDroplet => "/droplets/new".to_string(),
            Self::Droplet(id) => format!("/droplets/{id}"),
            Self::Droplets => "/droplets".to_string(),
            Self::Sizes => "/sizes".to_string(),
            Self::Regions => "/regions".to_string(),
            Self::Images => "/images".to_string(),
            Self::SshKeys => "/ssh_keys".to_string(),
            Self::Domains => "/domains".to_string(),
        }
    }

    /// Response key holding the payload.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::NewDroplet | Self::Droplet(_) => "droplet",
            Self::Droplets => "droplets",
            Self::Sizes => "sizes",
            Self::Regions => "regions",
            Self::Images => "images",
            Self::SshKeys => "ssh_keys",
            Self::Domains => "domains",
        }
    }

    /// Shape of the projected result.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self {
            Self::NewDroplet | Self::Droplet(_) => Shape::Entity,
            Self::Droplets => Shape::Entities,
            Self::Sizes | Self::Regions | Self::Images | Self::SshKeys | Self::Domains => {
                Shape::Table
            }
        }
    }

    /// Field the listing is pre-sorted by. Only sizes are, cheapest first.
    #[must_use]
    pub const fn sort_field(&self) -> Option<&'static str> {
        match self {
            Self::Sizes => Some("cost_per_hour"),
            _ => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of [`Connection::fetch`].
#[derive(Debug, Clone)]
pub enum Fetched {
    /// Unprojected body, returned when a status check was requested.
    Raw(Value),
    /// One droplet.
    Droplet(Droplet),
    /// Droplets in API order.
    Droplets(Vec<Droplet>),
    /// Reference data.
    Listing(Listing),
}

impl Fetched {
    fn kind(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw body",
            Self::Droplet(_) => "droplet",
            Self::Droplets(_) => "droplet list",
            Self::Listing(_) => "listing",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::ParseError(format!("expected {expected}, got {}", self.kind()))
    }

    /// The raw body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] for any other variant.
    pub fn into_raw(self) -> Result<Value> {
        match self {
            Self::Raw(body) => Ok(body),
            other => Err(other.mismatch("raw body")),
        }
    }

    /// The single droplet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] for any other variant.
    pub fn into_droplet(self) -> Result<Droplet> {
        match self {
            Self::Droplet(droplet) => Ok(droplet),
            other => Err(other.mismatch("droplet")),
        }
    }

    /// The droplet list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] for any other variant.
    pub fn into_droplets(self) -> Result<Vec<Droplet>> {
        match self {
            Self::Droplets(droplets) => Ok(droplets),
            other => Err(other.mismatch("droplet list")),
        }
    }

    /// The listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] for any other variant.
    pub fn into_listing(self) -> Result<Listing> {
        match self {
            Self::Listing(listing) => Ok(listing),
            other => Err(other.mismatch("listing")),
        }
    }
}

fn take_payload(resource: Resource, body: Value) -> Result<Value> {
    let key = resource.key();
    let payload = match body {
        Value::Object(mut object) => object.remove(key),
        _ => None,
    };
    payload.ok_or_else(|| Error::MissingField(format!("`{key}` in response to `{resource}`")))
}

fn take_array(resource: Resource, body: Value) -> Result<Vec<Value>> {
    match take_payload(resource, body)? {
        Value::Array(items) => Ok(items),
        other => Err(Error::ParseError(format!(
            "`{}` in response to `{resource}` is not an array: {other}",
            resource.key()
        ))),
    }
}

fn to_droplet(resource: Resource, value: Value, connection: &Connection) -> Result<Droplet> {
    let record: DropletRecord = serde_json::from_value(value).map_err(|err| {
        Error::ParseError(format!("Failed to parse droplet from `{resource}`: {err}"))
    })?;
    Ok(Droplet::new(record, connection.clone()))
}

/// Reshape a successful response body according to `resource`.
///
/// Droplets receive a clone of `connection` so they can make calls of their own.
///
/// # Errors
///
/// - [`Error::MissingField`] when the resource key is absent
/// - [`Error::ParseError`] when the payload has the wrong JSON type
pub fn project(resource: Resource, body: Value, connection: &Connection) -> Result<Fetched> {
    match resource.shape() {
        Shape::Entity => {
            let value = take_payload(resource, body)?;
            to_droplet(resource, value, connection).map(Fetched::Droplet)
        }
        Shape::Entities => {
            let droplets = take_array(resource, body)?
                .into_iter()
                .map(|value| to_droplet(resource, value, connection))
                .collect::<Result<Vec<_>>>()?;
            debug!(count = droplets.len(), %resource, "projected droplets");
            Ok(Fetched::Droplets(droplets))
        }
        Shape::Table => {
            let mut listing = Listing::from_values(take_array(resource, body)?)?;
            if let Some(field) = resource.sort_field() {
                listing.sort_by(field);
            }
            debug!(rows = listing.len(), %resource, "projected listing");
            Ok(Fetched::Listing(listing))
        }
    }
}
