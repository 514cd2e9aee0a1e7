//! Common utilities for camera-bridge
//!
//! Shared plumbing between the bridge components: error handling, logging
//! setup, and the async channel bridge to the blocking device thread.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{DeviceBridge, DeviceCommand, DeviceEvent, DeviceWorker, create_device_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
