//! Device worker thread
//!
//! Owns the blocking transport on a dedicated OS thread and bridges it to
//! the async side through the bounded device channel. One loop iteration
//! drains at most one command and one inbound packet; the 100ms receive
//! timeout doubles as the command poll interval.

use super::transport::Transport;
use crate::config::DeviceSettings;
use common::{DeviceCommand, DeviceEvent, DeviceWorker};
use protocol::{Command, Report};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct DeviceWorkerThread {
    transport: Transport,
    worker: DeviceWorker,
}

impl DeviceWorkerThread {
    pub fn new(transport: Transport, worker: DeviceWorker) -> Self {
        Self { transport, worker }
    }

    /// Run until shutdown or transport loss
    ///
    /// Any transport error returns `Err` and tears the event channel down,
    /// which the telemetry pump treats as fatal for the whole process.
    pub fn run(self) -> common::Result<()> {
        info!("Device worker started");

        // Prime the mirror: ask for a full state report straight away.
        self.transport.send(&Command::RequestState.encode())?;

        let mut buf = [0u8; 1024];
        'main: loop {
            // Drain the whole command backlog before blocking in recv, so a
            // burst of queued commands is not paced by the receive timeout.
            while let Some(command) = self.worker.try_recv_command() {
                match command {
                    DeviceCommand::Shutdown => {
                        info!("Device worker shutting down");
                        break 'main;
                    }
                    DeviceCommand::Send(command) => {
                        debug!(?command, "Sending command packet");
                        self.transport.send(&command.encode())?;
                    }
                }
            }

            if let Some(size) = self.transport.recv(&mut buf)? {
                match Report::decode(&buf[..size]) {
                    Ok(report) => {
                        if self.worker.send_event(DeviceEvent::Report(report)).is_err() {
                            // Async side is gone; nothing left to serve.
                            break;
                        }
                    }
                    // Malformed reports are logged and dropped; the stream
                    // stays up.
                    Err(e) => warn!("Ignoring malformed report: {}", e),
                }
            }
        }

        Ok(())
    }
}

/// Spawn the worker on its own named thread
///
/// Connecting happens on the thread so startup is not blocked by the
/// control process coming up late.
pub fn spawn_device_worker(
    worker: DeviceWorker,
    settings: DeviceSettings,
) -> JoinHandle<common::Result<()>> {
    std::thread::Builder::new()
        .name("device-worker".to_string())
        .spawn(move || {
            let transport = Transport::connect(
                &settings.socket_path,
                settings.connect_attempts,
                Duration::from_millis(settings.connect_retry_ms),
            )?;
            DeviceWorkerThread::new(transport, worker).run()
        })
        .expect("Failed to spawn device worker thread")
}
