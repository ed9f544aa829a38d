//! HTTP surface of the sidecar.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → server.rs (axum router, trace / timeout / request-id layers)
//!     → allow-listed upstream path?  → proxy.rs → routing engine
//!     → sidecar control path?        → handlers.rs → ConfigStore
//! ```

pub mod handlers;
pub mod proxy;
pub mod request;
pub mod server;

pub use proxy::ReverseProxy;
pub use server::{AppState, SidecarServer};

/// Routing-engine v2 paths the sidecar proxies verbatim.
pub const ALERTS_PATH: &str = "/api/v2/alerts";
pub const SILENCES_PATH: &str = "/api/v2/silences";
pub const SILENCE_ITEM_PATH: &str = "/api/v2/silence/{id}";
pub const AM_RECEIVERS_PATH: &str = "/api/v2/receivers";

/// Config hot-reload; called by the ConfigStore, never proxied outward.
pub const RELOAD_PATH: &str = "/-/reload";

/// Sidecar-private control surface.
pub const SIDECAR_INIT_PATH: &str = "/sidecar/v1/init";
pub const SIDECAR_RECEIVERS_PATH: &str = "/sidecar/v1/receivers";
pub const SIDECAR_RECEIVER_PATH: &str = "/sidecar/v1/receiver";
