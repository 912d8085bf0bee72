//! Top-level chunk framing: a 4-byte ASCII tag, a 4-byte big-endian length and that many bytes.

use crate::prelude::*;

/// The tag of the header chunk.
pub(crate) const HEADER_TAG: [u8; 4] = *b"MThd";
/// The tag of a track chunk.
pub(crate) const TRACK_TAG: [u8; 4] = *b"MTrk";

/// A single top-level chunk: its tag and a view bounded to exactly its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// The 4-byte type tag, such as `MThd` or `MTrk`.
    pub tag: [u8; 4],
    /// Absolute offset of the chunk tag within the original buffer.
    pub offset: usize,
    /// The chunk payload.
    pub data: Cursor<'a>,
}
impl Chunk<'_> {
    #[inline]
    pub fn is_header(&self) -> bool {
        self.tag == HEADER_TAG
    }

    #[inline]
    pub fn is_track(&self) -> bool {
        self.tag == TRACK_TAG
    }
}

/// Iterates over the top-level chunks of a buffer.
///
/// Each chunk is skipped by its declared length regardless of its contents, so chunks with
/// unknown tags never disturb the position of the following chunks.
///
/// Once an error has been produced the scanner is exhausted, in order to prevent reading a new
/// chunk from the middle of a corrupted one.
#[derive(Copy, Clone, Debug)]
pub struct ChunkScanner<'a> {
    /// Starts at the current chunk boundary, ends at EOF.
    raw: Cursor<'a>,
}
impl<'a> ChunkScanner<'a> {
    /// Scan a whole buffer, starting at its first byte.
    #[inline]
    pub fn new(raw: &'a [u8]) -> ChunkScanner<'a> {
        ChunkScanner::from_cursor(Cursor::new(raw))
    }

    /// Scan the remainder of a cursor, which must be positioned at a chunk boundary.
    #[inline]
    pub fn from_cursor(raw: Cursor<'a>) -> ChunkScanner<'a> {
        ChunkScanner { raw }
    }

    /// The bytes that have not been scanned yet.
    #[inline]
    pub fn unread(&self) -> Cursor<'a> {
        self.raw
    }

    /// Read the next chunk, advancing past its payload.
    ///
    /// If the scanner is *exactly* at EOF returns `None`, signalling no more chunks.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk<'a>>> {
        if self.raw.is_empty() {
            return Ok(None);
        }
        let at = self.raw.position();
        ensure!(
            self.raw.remaining() >= 8,
            DecodeError::new(ErrorKind::TruncatedChunkHeader, at)
        );
        let tag = self.raw.read_tag()?;
        let len = self.raw.read_u32()?;
        let available = self.raw.remaining();
        let data = self.raw.read_bytes(len as usize).map_err(|_| {
            DecodeError::new(
                ErrorKind::TruncatedChunkPayload {
                    declared: len,
                    available,
                },
                at,
            )
        })?;
        trace!(offset = at, len, "scanned chunk {:?}", Tag(tag));
        Ok(Some(Chunk {
            tag,
            offset: at,
            data,
        }))
    }
}
impl<'a> Iterator for ChunkScanner<'a> {
    type Item = Result<Chunk<'a>>;
    fn next(&mut self) -> Option<Result<Chunk<'a>>> {
        //Flip around option and result
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(err) => {
                //Ensure `next_chunk` isn't called again, by moving the cursor to EOF
                self.raw = Cursor::with_offset(&[], self.raw.position());
                Some(Err(err))
            }
        }
    }
}

/// Displays a chunk tag as quoted text when it is printable ASCII, as raw bytes otherwise.
pub(crate) struct Tag(pub [u8; 4]);
impl Tag {
    #[inline]
    pub(crate) fn of(tag: &[u8; 4]) -> Tag {
        Tag(*tag)
    }
}
impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            f.write_str("\"")?;
            for &b in self.0.iter() {
                write!(f, "{}", b as char)?;
            }
            f.write_str("\"")
        } else {
            write!(f, "{:02X?}", self.0)
        }
    }
}
