// Middleware module - Axum layers

pub mod cors;

pub use cors::cors_layer;
