// Upstream module - outbound calls to the shop management API

pub mod client;
pub mod paths;

pub use client::{UpstreamBody, UpstreamCallSpec, UpstreamClient, UpstreamError, UpstreamResponse};
