//! Alertmanager sidecar library.
//!
//! Mediates between a multi-region control plane and a single
//! Alertmanager-compatible routing engine: re-asserts the control plane's
//! alert set on a timer, manages receiver/route configuration through the
//! engine's YAML file, and proxies the alert/silence surface verbatim.

// Core subsystems
pub mod amconfig;
pub mod http;
pub mod model;
pub mod store;

// Control-plane facing manager
pub mod creds;
pub mod mgr;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod settings;

pub use error::{Error, Result};
pub use http::SidecarServer;
pub use lifecycle::Shutdown;
pub use mgr::{AlertCache, AlertMgrServer};
pub use settings::SidecarSettings;
pub use store::ConfigStore;
