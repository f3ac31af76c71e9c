//! Byte-stream to line assembly for the radio UART and the USB console.

use heapless::Vec;

/// Input exceeded the line capacity. The rest of the line is discarded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineOverflow;

/// Collects bytes until `\r` or `\n`. Empty lines are skipped, so `\r\n`
/// terminators yield a single line.
///
/// A plain assembler keeps every other byte as is, which is what the radio
/// link needs. The [`editing`](Self::editing) flavour used by the operator
/// console lets backspace and delete erase the previous byte.
pub struct LineAssembler<const N: usize> {
    buffer: Vec<u8, N>,
    discarding: bool,
    erase: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
            erase: false,
        }
    }

    /// Assembler for typed input, honouring backspace and delete.
    pub const fn editing() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
            erase: true,
        }
    }

    /// Feeds one byte. Returns a completed line, or [`LineOverflow`] once when
    /// a line outgrows the buffer.
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8, N>>, LineOverflow> {
        match byte {
            b'\r' | b'\n' => {
                let discarded = core::mem::replace(&mut self.discarding, false);
                if discarded || self.buffer.is_empty() {
                    self.buffer.clear();
                    return Ok(None);
                }
                Ok(Some(core::mem::take(&mut self.buffer)))
            }
            _ if self.discarding => Ok(None),
            0x08 | 0x7f if self.erase => {
                self.buffer.pop();
                Ok(None)
            }
            value => {
                if self.buffer.push(value).is_err() {
                    self.buffer.clear();
                    self.discarding = true;
                    return Err(LineOverflow);
                }
                Ok(None)
            }
        }
    }

    /// Drops any partial line, e.g. when the host disconnects.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}
