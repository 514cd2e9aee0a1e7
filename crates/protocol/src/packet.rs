//! Hardware packet codec
//!
//! Encodes outbound commands and decodes inbound reports exchanged with the
//! sensor control process. Every packet is a single message on the SEQPACKET
//! channel: the first byte is the opcode, the remainder is a fixed-width
//! little-endian payload with no padding and no length prefix (message
//! boundaries come from the socket).
//!
//! # Opcode table
//!
//! | Opcode | Direction       | Payload |
//! |--------|-----------------|---------|
//! | 0x01   | bridge → device | none (request full-state report) |
//! | 0x01   | device → bridge | gain_analog: f32, gain_digital: f32, exposure_us: u32, color_temp_k: u32 |
//! | 0x02   | bridge → device | auto_exposure: u8, auto_white_balance: u8 |
//! | 0x02   | device → bridge | auto_exposure: u8, auto_white_balance: u8 (echo) |
//! | 0x03   | bridge → device | auto_white_balance: u8 |
//! | 0x04   | bridge → device | none (one-shot auto white balance) |
//! | 0x05   | bridge → device | tally: u8 |
//! | 0x06   | bridge → device | gain: u8 |
//! | 0x07   | bridge → device | shutter_speed: u16 |
//! | 0x08   | bridge → device | fps: u8 |
//! | 0x09   | bridge → device | exposure_compensation: f32 |

use crate::error::{PacketError, Result};

/// Outbound command packets (bridge → device)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Request a full sensor state report (opcode 0x01)
    RequestState,
    /// Enable or disable auto exposure and auto white balance (opcode 0x02)
    SetControls {
        auto_exposure: bool,
        auto_white_balance: bool,
    },
    /// Enable or disable continuous auto white balance (opcode 0x03)
    SetAutoWhiteBalance { enable: bool },
    /// Trigger a one-shot auto white balance pass (opcode 0x04)
    TriggerAutoWhiteBalance,
    /// Set the tally light state (opcode 0x05)
    SetTally { state: u8 },
    /// Set sensor gain (opcode 0x06)
    SetGain { gain: u8 },
    /// Set shutter speed denominator (opcode 0x07)
    SetShutter { speed: u16 },
    /// Set capture frame rate (opcode 0x08)
    SetFps { fps: u8 },
    /// Set exposure compensation in EV (opcode 0x09)
    SetExposureCompensation { ev: f32 },
}

impl Command {
    /// Encode the command into a single packet
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::RequestState => vec![0x01],
            Command::SetControls {
                auto_exposure,
                auto_white_balance,
            } => vec![0x02, auto_exposure as u8, auto_white_balance as u8],
            Command::SetAutoWhiteBalance { enable } => vec![0x03, enable as u8],
            Command::TriggerAutoWhiteBalance => vec![0x04],
            Command::SetTally { state } => vec![0x05, state],
            Command::SetGain { gain } => vec![0x06, gain],
            Command::SetShutter { speed } => {
                let mut packet = vec![0x07];
                packet.extend_from_slice(&speed.to_le_bytes());
                packet
            }
            Command::SetFps { fps } => vec![0x08, fps],
            Command::SetExposureCompensation { ev } => {
                let mut packet = vec![0x09];
                packet.extend_from_slice(&ev.to_le_bytes());
                packet
            }
        }
    }
}

/// Inbound report packets (device → bridge)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    /// Full sensor state (opcode 0x01)
    SensorState {
        gain_analog: f32,
        gain_digital: f32,
        exposure_us: u32,
        color_temp_k: u32,
    },
    /// Auto-control flags echo (opcode 0x02)
    ControlState {
        auto_exposure: bool,
        auto_white_balance: bool,
    },
}

impl Report {
    /// Decode a single report packet
    ///
    /// Trailing bytes beyond an opcode's fixed layout are ignored for
    /// forward compatibility, as is an unknown opcode (a distinct error the
    /// caller logs and skips without mutating state).
    pub fn decode(packet: &[u8]) -> Result<Report> {
        let (&opcode, payload) = packet.split_first().ok_or(PacketError::Empty)?;
        match opcode {
            0x01 => {
                check_len(opcode, payload, 16)?;
                Ok(Report::SensorState {
                    gain_analog: read_f32(payload, 0),
                    gain_digital: read_f32(payload, 4),
                    exposure_us: read_u32(payload, 8),
                    color_temp_k: read_u32(payload, 12),
                })
            }
            0x02 => {
                check_len(opcode, payload, 2)?;
                Ok(Report::ControlState {
                    auto_exposure: payload[0] != 0,
                    auto_white_balance: payload[1] != 0,
                })
            }
            _ => Err(PacketError::UnknownOpcode { opcode }),
        }
    }
}

fn check_len(opcode: u8, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(PacketError::Truncated {
            opcode,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

// Callers run check_len first, so the 4-byte windows always exist.
fn read_f32(payload: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
}

fn read_u32(payload: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
}
