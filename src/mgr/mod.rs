//! Control-plane facing manager.
//!
//! # Data Flow
//! ```text
//! control plane mutates AlertCache
//!     → update stream: changed alert pushed immediately
//!     → refresh tick: whole snapshot re-pushed (rolling endsAt)
//!     → sidecar → routing engine
//!
//! operator receiver calls
//!     → local validation → {receiver, route} pair → sidecar control API
//! ```

pub mod cache;
pub mod client;
pub mod server;

pub use cache::AlertCache;
pub use client::ApiClient;
pub use server::{build_receiver_pair, AlertMgrServer, ConnectOptions};
