//! Bridge context and telemetry pump
//!
//! `BridgeContext` is the explicitly constructed wiring handed to every
//! component at startup: the state store, the hub handle, and the device
//! bridge. Control handlers go through it and never touch the transport or
//! the packet codec directly.

use crate::hub::HubHandle;
use crate::state::StateStore;
use common::{DeviceBridge, DeviceCommand, DeviceEvent};
use protocol::{AutoExposureMode, AutoExposureState, Command, PropertyEvent, PropertyPath,
    PropertyValue, Report};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct BridgeContext {
    pub store: Arc<StateStore>,
    pub hub: HubHandle,
    pub device: DeviceBridge,
    /// Outbound queue depth per websocket session
    pub session_queue_depth: usize,
    /// Per-message write deadline for session writers
    pub write_timeout: Duration,
}

impl BridgeContext {
    /// Apply an auto-exposure mode request
    ///
    /// Optimistic local echo: the snapshot is updated and broadcast before
    /// the command packet leaves, and the hardware's 0x02 echo later
    /// re-confirms it through the telemetry path.
    pub async fn set_auto_exposure(
        &self,
        mode: AutoExposureMode,
    ) -> common::Result<AutoExposureState> {
        let (snapshot, auto_white_balance) = self.store.set_auto_exposure(mode).await;

        self.device
            .send_command(DeviceCommand::Send(Command::SetControls {
                auto_exposure: mode == AutoExposureMode::Continuous,
                auto_white_balance,
            }))
            .await?;

        self.hub
            .broadcast(PropertyEvent {
                path: PropertyPath::VideoAutoExposure,
                value: PropertyValue::AutoExposure(snapshot),
            })
            .await?;

        Ok(snapshot)
    }

    /// Trigger a one-shot auto white balance pass
    ///
    /// Fire-and-forget: no state mutation, no event.
    pub async fn trigger_auto_white_balance(&self) -> common::Result<()> {
        self.device
            .send_command(DeviceCommand::Send(Command::TriggerAutoWhiteBalance))
            .await
    }
}

/// Pump decoded telemetry into the state store and fan the changes out
///
/// Returns an error only when the device bridge is gone, which is fatal to
/// the whole process: without an unbroken telemetry stream the mirror would
/// silently drift from hardware truth.
pub async fn run_telemetry_pump(ctx: Arc<BridgeContext>) -> common::Result<()> {
    info!("Telemetry pump started");

    loop {
        let DeviceEvent::Report(report) = ctx.device.recv_event().await?;

        match report {
            Report::SensorState {
                gain_analog,
                gain_digital,
                exposure_us,
                color_temp_k,
            } => {
                debug!(
                    gain_analog,
                    gain_digital, exposure_us, color_temp_k, "Sensor state report"
                );
                let events = ctx
                    .store
                    .apply_sensor_state(gain_analog, gain_digital, exposure_us, color_temp_k)
                    .await;
                for event in events {
                    ctx.hub.broadcast(event).await?;
                }
            }

            Report::ControlState {
                auto_exposure,
                auto_white_balance,
            } => {
                debug!(auto_exposure, auto_white_balance, "Control state echo");
                let event = ctx
                    .store
                    .apply_controls(auto_exposure, auto_white_balance)
                    .await;
                ctx.hub.broadcast(event).await?;
            }
        }
    }
}
