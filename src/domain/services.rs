//! Domain services
//!
//! Capability traits implemented by the infrastructure layer.

pub mod session_driver;

pub use session_driver::{SessionDriver, SessionLauncher};
