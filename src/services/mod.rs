//! Services layer for the evalsync offline subsystem
//!
//! Provides the remote evaluation API client and cached catalog reads.

pub mod api;
pub mod catalog;

pub use api::{HttpRemoteApi, RemoteApi};
pub use catalog::CatalogService;
