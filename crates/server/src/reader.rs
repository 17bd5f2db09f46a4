//! Cancel-safe opcode reader.
//!
//! Opcodes may arrive split across several TCP segments. The reader keeps
//! whatever bytes it has already received, so dropping a pending
//! [`OpcodeReader::next`] (on cancellation, preemption or an idle timeout)
//! never loses or misaligns input.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::wire::{OPCODE_LEN, Opcode};

/// Accumulates bytes from the socket until a full opcode is available.
#[derive(Debug, Default)]
pub struct OpcodeReader {
    buf: [u8; OPCODE_LEN],
    filled: usize,
}

impl OpcodeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes of the next opcode already received.
    pub fn partial_len(&self) -> usize {
        self.filled
    }

    /// Reads until a complete opcode is buffered.
    ///
    /// Returns `Ok(None)` when the peer closed the connection. Cancel-safe:
    /// only `read` is awaited and progress is stored after each call.
    pub async fn next<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> std::io::Result<Option<Opcode>> {
        while self.filled < OPCODE_LEN {
            let n = reader.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                return Ok(None);
            }
            self.filled += n;
        }

        self.filled = 0;
        Ok(Some(Opcode::parse(self.buf)))
    }
}
