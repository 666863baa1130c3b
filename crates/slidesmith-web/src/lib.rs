//! # Slidesmith Web
//!
//! Browser form and JSON API in front of the generation pipeline.

pub mod model;
pub mod observer_impl;
pub mod server;

pub use model::{EventStatus, GenerationEvent, GenerationLog};
pub use server::{ApiError, AppState, SlidesmithServer};

/// Install a `tracing-subscriber` formatter filtered by `RUST_LOG`
/// (default `info`). Does nothing if a subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
