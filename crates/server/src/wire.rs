//! TCP wire format for pointer state polling.
//!
//! # Wire format
//!
//! ```text
//! REQUEST (Agent -> Exposer):   [4 bytes: ASCII opcode]
//!
//! MICE -> [4 bytes: "ECIM"]
//! INIT -> (no reply)
//! READ -> [1 byte: buttons, bit0=left bit1=right]
//!         [4 bytes LE i32: x]
//!         [4 bytes LE i32: y]
//!         [1 byte: wheel, 0xFF=down 0x01=up 0x00=none]
//! CLOS -> (no reply)
//! ```
//!
//! There is no framing or version field. Unknown opcodes are ignored.

use mouserelay_state::{PointerState, WheelDirection};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Opcode length in bytes.
pub const OPCODE_LEN: usize = 4;

/// Length of a `READ` reply.
pub const STATE_RESPONSE_LEN: usize = 10;

/// Reply to a `MICE` liveness check.
pub const MICE_REPLY: [u8; OPCODE_LEN] = *b"ECIM";

/// Wheel byte for a negative scroll delta.
pub const WHEEL_DOWN: u8 = 0xFF;

/// Wheel byte for a positive scroll delta.
pub const WHEEL_UP: u8 = 0x01;

/// Wheel byte when there is no scroll.
pub const WHEEL_NONE: u8 = 0x00;

/// A request received from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Liveness check (`MICE`).
    Mice,
    /// Start of a polling session (`INIT`).
    Init,
    /// Request for the current pointer state (`READ`).
    Read,
    /// End of the polling session (`CLOS`).
    Close,
    /// Anything else; ignored by the handler.
    Unknown([u8; OPCODE_LEN]),
}

impl Opcode {
    /// Parses a raw opcode. Matching is exact and case-sensitive.
    pub fn parse(raw: [u8; OPCODE_LEN]) -> Self {
        match &raw {
            b"MICE" => Self::Mice,
            b"INIT" => Self::Init,
            b"READ" => Self::Read,
            b"CLOS" => Self::Close,
            _ => Self::Unknown(raw),
        }
    }
}

/// Encodes the wheel byte. Negative is tested before positive.
pub fn wheel_byte(state: &PointerState) -> u8 {
    match state.wheel_direction() {
        WheelDirection::Down => WHEEL_DOWN,
        WheelDirection::Up => WHEEL_UP,
        WheelDirection::None => WHEEL_NONE,
    }
}

/// Encodes a `READ` reply. `None` (nothing ever captured) encodes as zeros.
pub fn encode_state(state: Option<&PointerState>) -> [u8; STATE_RESPONSE_LEN] {
    let mut buf = [0u8; STATE_RESPONSE_LEN];
    if let Some(state) = state {
        buf[0] = state.buttons();
        buf[1..5].copy_from_slice(&state.x.to_le_bytes());
        buf[5..9].copy_from_slice(&state.y.to_le_bytes());
        buf[9] = wheel_byte(state);
    }
    buf
}

/// Writes a `READ` reply and flushes it.
pub async fn write_state<W: AsyncWrite + Unpin>(
    writer: &mut W,
    state: Option<&PointerState>,
) -> std::io::Result<()> {
    writer.write_all(&encode_state(state)).await?;
    writer.flush().await
}

/// Writes the `MICE` liveness reply and flushes it.
pub async fn write_mice_reply<W: AsyncWrite + Unpin>(writer: &mut W) -> std::io::Result<()> {
    writer.write_all(&MICE_REPLY).await?;
    writer.flush().await
}
