//! There's an abomination called RMID, MIDI embedded in a RIFF file.
//! Support for these files is provided by unwrapping the input buffer, stripping away the RIFF
//! wrappers around the raw SMF file.
//!
//! Unlike SMF chunks, RIFF chunk lengths are little-endian and odd-sized chunks are padded to an
//! even length.

use crate::prelude::*;

fn invalid(at: usize, msg: &'static str) -> DecodeError {
    DecodeError::new(ErrorKind::InvalidRiffContainer(msg), at)
}

struct RiffChunks<'a>(Cursor<'a>);
impl<'a> RiffChunks<'a> {
    fn next_chunk(&mut self) -> Result<Option<([u8; 4], Cursor<'a>)>> {
        if self.0.remaining() < 8 {
            return Ok(None);
        }
        let at = self.0.position();
        let id = self.0.read_tag()?;
        let len = u32::from_le_bytes(self.0.read_tag()?) as usize;
        let data = self
            .0
            .read_bytes(len)
            .map_err(|_| invalid(at, "truncated riff chunk"))?;
        if len % 2 == 1 && !self.0.is_empty() {
            self.0.skip(1)?;
        }
        Ok(Some((id, data)))
    }
}

/// Locate the SMF data inside an `RMID` RIFF container.
///
/// The returned cursor keeps offsets relative to the start of `raw`.
pub fn unwrap(raw: &[u8]) -> Result<Cursor<'_>> {
    let (id, mut riff) = RiffChunks(Cursor::new(raw))
        .next_chunk()?
        .ok_or_else(|| invalid(0, "no main riff chunk"))?;
    ensure!(&id == b"RIFF", invalid(0, "invalid main riff chunk"));
    let formtype = riff
        .read_tag()
        .map_err(|err| invalid(err.offset(), "failed to read riff formtype"))?;
    ensure!(&formtype == b"RMID", invalid(8, "not an rmid riff file"));
    let mut chunks = RiffChunks(riff);
    while let Some((id, chunk)) = chunks.next_chunk()? {
        if &id == b"data" {
            return Ok(chunk);
        }
    }
    bail!(invalid(raw.len(), "no rmid data chunk"))
}
