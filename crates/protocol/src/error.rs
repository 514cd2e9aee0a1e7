//! Packet codec error types

use thiserror::Error;

/// Errors produced while decoding hardware report packets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Packet carried no opcode byte
    #[error("Empty packet")]
    Empty,

    /// Opcode is not in the report table
    ///
    /// Not fatal: newer firmware may add opcodes, callers log and skip.
    #[error("Unknown opcode 0x{opcode:02x}")]
    UnknownOpcode { opcode: u8 },

    /// Payload shorter than the opcode's fixed layout
    #[error("Truncated payload for opcode 0x{opcode:02x}: expected {expected} bytes, got {actual}")]
    Truncated {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

/// Type alias for codec results
pub type Result<T> = std::result::Result<T, PacketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PacketError::Truncated {
            opcode: 0x01,
            expected: 16,
            actual: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("0x01"));
        assert!(msg.contains("16"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn test_unknown_opcode_display() {
        let err = PacketError::UnknownOpcode { opcode: 0x7f };
        assert!(format!("{}", err).contains("0x7f"));
    }
}
