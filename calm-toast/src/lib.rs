//! calm-toast library interface
//!
//! Transient notification (toast) manager: an ordered active set of
//! notifications, each with its own auto-expiry timer, that a rendering
//! layer reads through snapshots and dismisses by id.
//!
//! # Example
//!
//! ```no_run
//! use calm_toast::{NotificationManager, ToastRequest};
//!
//! # async fn demo() -> calm_common::Result<()> {
//! let manager = NotificationManager::with_defaults()?;
//! let id = manager.enqueue(ToastRequest::success("Saved").description("Your changes were saved"));
//! assert_eq!(manager.snapshot().len(), 1);
//! manager.dismiss(id);
//! assert!(manager.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;

pub use calm_common::events::{RemovalReason, ToastEvent};
pub use calm_common::{Notification, NotificationId, Severity, ToastRequest};
pub use config::ToastConfig;
pub use manager::NotificationManager;
