//! Device state store
//!
//! The single authoritative in-memory mirror of sensor-observable state.
//! Mutated only by the telemetry pump and the control handlers; every reader
//! gets a copied snapshot taken under the lock, never a reference into the
//! live structure, so a torn read is impossible.

use protocol::{
    AutoExposureMode, AutoExposureState, GainState, PropertyEvent, PropertyPath, PropertyValue,
    RgblState, ShutterState, WhiteBalanceState,
};
use tokio::sync::RwLock;

/// All sensor-observable state, one sub-state per property path
#[derive(Debug, Clone, Default)]
struct DeviceState {
    gain: GainState,
    shutter: ShutterState,
    white_balance: WhiteBalanceState,
    auto_exposure: AutoExposureState,
    cc_lift: RgblState,
    cc_gamma: RgblState,
    cc_gain: RgblState,
    cc_offset: RgblState,

    /// Last auto-white-balance flag echoed by the device; carried on
    /// outgoing 0x02 commands, not exposed as a property
    auto_white_balance: bool,
}

/// The authoritative state store
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<DeviceState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the sub-state behind one property path
    pub async fn snapshot(&self, path: PropertyPath) -> PropertyValue {
        let state = self.inner.read().await;
        match path {
            PropertyPath::VideoGain => PropertyValue::Gain(state.gain),
            PropertyPath::VideoShutter => PropertyValue::Shutter(state.shutter),
            PropertyPath::VideoWhiteBalance => PropertyValue::WhiteBalance(state.white_balance),
            PropertyPath::VideoAutoExposure => PropertyValue::AutoExposure(state.auto_exposure),
            PropertyPath::ColorLift => PropertyValue::ColorCorrection(state.cc_lift),
            PropertyPath::ColorGamma => PropertyValue::ColorCorrection(state.cc_gamma),
            PropertyPath::ColorGain => PropertyValue::ColorCorrection(state.cc_gain),
            PropertyPath::ColorOffset => PropertyValue::ColorCorrection(state.cc_offset),
        }
    }

    /// Apply a full sensor state report (opcode 0x01)
    ///
    /// Emits exactly three change-events in fixed order: gain, shutter,
    /// white balance. Every report re-broadcasts, including reports whose
    /// values are unchanged; clients may rely on the stream as a heartbeat.
    pub async fn apply_sensor_state(
        &self,
        gain_analog: f32,
        _gain_digital: f32,
        exposure_us: u32,
        color_temp_k: u32,
    ) -> Vec<PropertyEvent> {
        // Exposure time in microseconds becomes a denominator-style shutter
        // speed: 20000us -> 1/50s.
        let shutter_speed = if exposure_us == 0 {
            0
        } else {
            1_000_000 / exposure_us
        };

        let mut state = self.inner.write().await;
        state.gain.gain = gain_analog;
        state.shutter.shutter_speed = shutter_speed;
        state.white_balance.white_balance = color_temp_k;

        vec![
            PropertyEvent {
                path: PropertyPath::VideoGain,
                value: PropertyValue::Gain(state.gain),
            },
            PropertyEvent {
                path: PropertyPath::VideoShutter,
                value: PropertyValue::Shutter(state.shutter),
            },
            PropertyEvent {
                path: PropertyPath::VideoWhiteBalance,
                value: PropertyValue::WhiteBalance(state.white_balance),
            },
        ]
    }

    /// Apply an auto-control flags echo (opcode 0x02)
    ///
    /// Emits exactly one change-event for `/video/autoExposure`.
    pub async fn apply_controls(
        &self,
        auto_exposure: bool,
        auto_white_balance: bool,
    ) -> PropertyEvent {
        let mut state = self.inner.write().await;
        state.auto_exposure.mode = if auto_exposure {
            AutoExposureMode::Continuous
        } else {
            AutoExposureMode::Off
        };
        state.auto_white_balance = auto_white_balance;

        PropertyEvent {
            path: PropertyPath::VideoAutoExposure,
            value: PropertyValue::AutoExposure(state.auto_exposure),
        }
    }

    /// Optimistically apply a requested auto-exposure mode
    ///
    /// Returns the new snapshot and the current auto-white-balance flag for
    /// the outgoing 0x02 command. Does not wait for the hardware echo.
    pub async fn set_auto_exposure(&self, mode: AutoExposureMode) -> (AutoExposureState, bool) {
        let mut state = self.inner.write().await;
        state.auto_exposure.mode = mode;
        (state.auto_exposure, state.auto_white_balance)
    }

    /// Current auto-exposure snapshot, for the request-reply endpoint
    pub async fn auto_exposure(&self) -> AutoExposureState {
        self.inner.read().await.auto_exposure
    }
}
