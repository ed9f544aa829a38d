//! Control-plane data model.
//!
//! # Data Flow
//! ```text
//! control plane cache
//!     → Alert (labels + annotations + activation time)
//!     → PostableAlert (Alertmanager v2 wire shape, rolling endsAt)
//!
//! operator request
//!     → AlertReceiver (identity + scope + notification payload)
//!     → ReceiverId (structured 4-field identity, rendered on disk)
//!     → route match-label map (scope tag + coordinates)
//! ```

pub mod alert;
pub mod receiver;

pub use alert::{Alert, GettableAlert, PostableAlert};
pub use receiver::{
    AlertReceiver, AppInstScope, CloudletScope, ReceiverFilter, ReceiverId, ReceiverKind, Severity,
};
