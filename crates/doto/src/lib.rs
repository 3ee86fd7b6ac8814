//! Convenience client for the DigitalOcean v1 API.
//!
//! A [`Connection`] issues authenticated GET requests and reshapes the answers: droplets
//! come back as [`Droplet`] values that can make further calls about themselves, while
//! reference data (sizes, regions, images, ssh keys, domains) comes back as a
//! [`Listing`] for inspection and sorting.
//!
//! ```no_run
//! # async fn run() -> doto::Result<()> {
//! let connection = doto::Connection::new(None)?;
//! let sizes = connection.get_sizes().await?;
//! println!("{sizes}");
//!
//! let request = doto::CreateDropletRequest::new("web-01")
//!     .with_size_id(66)
//!     .with_image_id(1_341_147)
//!     .with_region_id(1);
//! let droplet = connection.create_droplet(&request).await?;
//! println!("created droplet {}", droplet.id());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod listing;
pub mod models;
pub mod resource;

pub use client::{Connection, ConnectionBuilder};
pub use doto_core::{Credentials, Error};
pub use listing::{Listing, Record};
pub use models::{CreateDropletRequest, Droplet, DropletRecord};
pub use resource::{Fetched, Resource, Shape};

/// Convenient result alias that reuses the shared doto error type.
pub type Result<T> = doto_core::Result<T>;
