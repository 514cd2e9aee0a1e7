//! Property paths and state snapshots
//!
//! The set of addressable device state is closed and known at compile time:
//! every [`PropertyPath`] maps to exactly one snapshot structure, and change
//! events carry an immutable copy of that structure taken at mutation time.

use serde::{Deserialize, Serialize};

/// Stable string key identifying one addressable piece of device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyPath {
    #[serde(rename = "/video/gain")]
    VideoGain,
    #[serde(rename = "/video/shutter")]
    VideoShutter,
    #[serde(rename = "/video/whiteBalance")]
    VideoWhiteBalance,
    #[serde(rename = "/video/autoExposure")]
    VideoAutoExposure,
    #[serde(rename = "/colorCorrection/lift")]
    ColorLift,
    #[serde(rename = "/colorCorrection/gamma")]
    ColorGamma,
    #[serde(rename = "/colorCorrection/gain")]
    ColorGain,
    #[serde(rename = "/colorCorrection/offset")]
    ColorOffset,
}

impl PropertyPath {
    /// Every valid property path, in the order reported by listProperties
    pub const ALL: [PropertyPath; 8] = [
        PropertyPath::VideoGain,
        PropertyPath::VideoShutter,
        PropertyPath::VideoWhiteBalance,
        PropertyPath::VideoAutoExposure,
        PropertyPath::ColorLift,
        PropertyPath::ColorGamma,
        PropertyPath::ColorGain,
        PropertyPath::ColorOffset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyPath::VideoGain => "/video/gain",
            PropertyPath::VideoShutter => "/video/shutter",
            PropertyPath::VideoWhiteBalance => "/video/whiteBalance",
            PropertyPath::VideoAutoExposure => "/video/autoExposure",
            PropertyPath::ColorLift => "/colorCorrection/lift",
            PropertyPath::ColorGamma => "/colorCorrection/gamma",
            PropertyPath::ColorGain => "/colorCorrection/gain",
            PropertyPath::ColorOffset => "/colorCorrection/offset",
        }
    }

    /// Parse a client-supplied path string
    pub fn parse(s: &str) -> Option<PropertyPath> {
        PropertyPath::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor gain snapshot (`/video/gain`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GainState {
    pub gain: f32,
}

/// Shutter snapshot (`/video/shutter`)
///
/// `shutter_speed` is the denominator-style display value derived from the
/// exposure time, e.g. 50 for 1/50s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutterState {
    pub continuous_shutter_auto_exposure: bool,
    pub shutter_speed: u32,
    pub shutter_angle: f32,
}

/// White balance snapshot (`/video/whiteBalance`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteBalanceState {
    pub white_balance: u32,
}

/// Auto exposure mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoExposureMode {
    #[default]
    Off,
    Continuous,
}

/// What the auto exposure algorithm is allowed to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoExposureType {
    #[default]
    Off,
    Iris,
    Shutter,
    Both,
}

/// Auto exposure snapshot (`/video/autoExposure`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoExposureState {
    pub mode: AutoExposureMode,
    #[serde(rename = "type")]
    pub ae_type: AutoExposureType,
}

/// One color-correction quad (`/colorCorrection/{lift,gamma,gain,offset}`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RgblState {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub luma: f32,
}

/// Closed union of all snapshot structures, keyed by property path
///
/// Serializes untagged: on the wire the value is just the snapshot object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Gain(GainState),
    Shutter(ShutterState),
    WhiteBalance(WhiteBalanceState),
    AutoExposure(AutoExposureState),
    ColorCorrection(RgblState),
}

/// A state-change notification, the unit of fan-out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyEvent {
    pub path: PropertyPath,
    pub value: PropertyValue,
}
