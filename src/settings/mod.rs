//! Sidecar process settings.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SidecarSettings (validated, immutable)
//! ```
//!
//! Distinct from the *managed* Alertmanager configuration: these settings
//! describe the sidecar process itself and never change at runtime.
//!
//! # Design Decisions
//! - All fields have defaults so a minimal (or absent) file works
//! - CLI flags override the common fields after loading
//! - Validation reports every error, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, SettingsError};
pub use schema::{
    ListenerSettings, ObservabilitySettings, SidecarSettings, StartupSettings, TimeoutSettings,
    TlsSettings, UpstreamSettings,
};
