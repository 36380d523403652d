//! # Calm Common Library
//!
//! Shared code for the Calm notification services including:
//! - Notification entity and severity levels
//! - Toast lifecycle event types (ToastEvent enum) and EventBus
//! - Configuration loading
//! - Error types
//! - Utility functions

pub mod config;
pub mod error;
pub mod events;
pub mod notification;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use notification::{Notification, NotificationId, Severity, ToastRequest};
