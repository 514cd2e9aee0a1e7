//! Protocol library for camera-bridge
//!
//! This crate defines the two wire formats the bridge speaks:
//!
//! - the hardware packet protocol on the sensor control channel
//!   (opcode-dispatched, little-endian fixed-width fields), in [`packet`];
//! - the JSON websocket protocol for real-time clients, in [`messages`].
//!
//! Shared between them are the closed set of property paths and the
//! strongly-typed state snapshots in [`properties`].
//!
//! # Example
//!
//! ```
//! use protocol::{Command, Report};
//!
//! let bytes = Command::SetGain { gain: 4 }.encode();
//! assert_eq!(bytes, vec![0x06, 0x04]);
//!
//! let report = [0x02, 0x01, 0x00];
//! assert!(matches!(
//!     Report::decode(&report).unwrap(),
//!     Report::ControlState { auto_exposure: true, .. }
//! ));
//! ```

pub mod error;
pub mod messages;
pub mod packet;
pub mod properties;

pub use error::{PacketError, Result};
pub use messages::{ClientMessage, ClientRequest, EventBody, ResponseBody, ServerMessage};
pub use packet::{Command, Report};
pub use properties::{
    AutoExposureMode, AutoExposureState, AutoExposureType, GainState, PropertyEvent, PropertyPath,
    PropertyValue, RgblState, ShutterState, WhiteBalanceState,
};
