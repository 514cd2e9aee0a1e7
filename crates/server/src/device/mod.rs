//! Device side of the bridge: blocking transport plus its worker thread

mod transport;
mod worker;

pub use transport::Transport;
pub use worker::{DeviceWorkerThread, spawn_device_worker};
