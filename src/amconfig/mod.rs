//! Typed model of the routing engine's configuration file.
//!
//! # Data Flow
//! ```text
//! alertmanager.yml (YAML on local disk)
//!     → schema.rs (serde model, unknown keys preserved)
//!     → edited in memory by the ConfigStore
//!     → rewritten whole, then hot-reloaded by the routing engine
//!
//! The {receiver, route} pair doubles as the JSON wire contract between
//! the control-plane manager and the sidecar's private API.
//! ```
//!
//! # Design Decisions
//! - Every block carries a flattened catch-all map so a hand-edited file
//!   survives the read-modify-write cycle
//! - Secrets serialize verbatim; a rewrite must not redact the SMTP password
//! - The default configuration is rendered from a template kept as data

pub mod schema;
pub mod template;

pub use schema::{
    AmConfig, EmailConfig, GlobalConfig, PagerdutyConfig, Receiver, ReceiverWithRoute, Route,
    SlackConfig, DEFAULT_RECEIVER,
};
pub use template::{render_default_config, InitInfo};
