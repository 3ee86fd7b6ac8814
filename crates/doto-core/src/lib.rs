//! # doto-core
//!
//! Shared building blocks for talking to the DigitalOcean v1 API.
//!
//! ## Modules
//!
//! - [`error`] - Error type covering configuration, transport, API and payload failures
//! - [`config`] - Credentials, the credentials file loader and client configuration
//! - [`query`] - Query string builder that drops absent values
//! - [`client`] - Authenticated request gateway

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ClientConfig, ConfigFile, CredentialSource, Credentials};
pub use error::{Error, Result};
pub use query::QueryParams;
