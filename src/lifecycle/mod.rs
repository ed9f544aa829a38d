//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load settings → Validate → Wait for routing engine → Bootstrap
//!     → Start listener
//!
//! Shutdown:
//!     SIGINT/SIGTERM (signals.rs) → Shutdown trigger (shutdown.rs)
//!     → listeners drain, background tasks join
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::spawn_signal_listener;
