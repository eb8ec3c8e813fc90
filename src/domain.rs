//! Domain module - review records and the capabilities the core relies on
//!
//! Nothing in here talks to a browser; the session driver traits describe
//! what the extraction core needs from one.

pub mod field_spec;
pub mod locator;
pub mod record_sink;
pub mod review;
pub mod services;

pub use field_spec::{FieldScope, FieldSpec, ReadTarget};
pub use locator::{Locator, LocatorStrategy, LocatorTemplate};
pub use record_sink::ReviewSink;
pub use review::{FieldValue, ReviewField, ReviewRecord};
pub use services::{SessionDriver, SessionLauncher};
