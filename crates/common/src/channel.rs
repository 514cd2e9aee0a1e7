//! Async channel bridge between the Tokio runtime and the device thread
//!
//! Socket I/O with the sensor control process is blocking and lives in a
//! dedicated OS thread; the rest of the bridge is async. The two sides
//! communicate exclusively through this pair of bounded channels.

use async_channel::{Receiver, Sender, bounded};

/// Commands from the Tokio runtime to the device thread
///
/// Command packets are fire-and-forget: the hardware answers asynchronously
/// with telemetry reports, never with per-command replies.
#[derive(Debug, Clone, Copy)]
pub enum DeviceCommand {
    /// Encode and send one command packet
    Send(protocol::Command),

    /// Shut down the device thread gracefully
    Shutdown,
}

/// Telemetry from the device thread to the Tokio runtime
#[derive(Debug, Clone, Copy)]
pub enum DeviceEvent {
    /// A decoded report packet
    Report(protocol::Report),
}

/// Handle for the Tokio runtime (async)
#[derive(Clone)]
pub struct DeviceBridge {
    cmd_tx: Sender<DeviceCommand>,
    event_rx: Receiver<DeviceEvent>,
}

impl DeviceBridge {
    /// Send a command to the device thread
    pub async fn send_command(&self, cmd: DeviceCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive the next telemetry event from the device thread
    ///
    /// Errors when the device thread has exited, which means the hardware
    /// channel is gone and the state mirror can no longer be trusted.
    pub async fn recv_event(&self) -> crate::Result<DeviceEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the device thread (blocking)
pub struct DeviceWorker {
    pub(crate) cmd_rx: Receiver<DeviceCommand>,
    pub(crate) event_tx: Sender<DeviceEvent>,
}

impl DeviceWorker {
    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<DeviceCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send a telemetry event to the Tokio runtime (blocking)
    pub fn send_event(&self, event: DeviceEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and the device thread
///
/// Returns (DeviceBridge for Tokio, DeviceWorker for the device thread)
pub fn create_device_bridge() -> (DeviceBridge, DeviceWorker) {
    let (cmd_tx, cmd_rx) = bounded(256);
    let (event_tx, event_rx) = bounded(256);

    (
        DeviceBridge { cmd_tx, event_rx },
        DeviceWorker { cmd_rx, event_tx },
    )
}
