use crate::chunk::Tag;
use core::fmt;
use thiserror::Error;

/// Represents a failure while decoding an SMF file.
///
/// Every error carries the absolute byte offset into the decoded buffer at which the problem was
/// detected, so tooling can point at the offending bytes.
///
/// Errors are always terminal: the decoder never retries or attempts to recover, and a failed
/// decode yields no partial result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("{kind} (at byte offset {offset})")]
pub struct DecodeError {
    kind: ErrorKind,
    offset: usize,
}
impl DecodeError {
    /// Create a new error of the given kind, detected at the given absolute byte offset.
    #[inline]
    pub const fn new(kind: ErrorKind, offset: usize) -> DecodeError {
        DecodeError { kind, offset }
    }

    /// What went wrong.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The absolute byte offset at which decoding failed.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The type of error that occurred while decoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// The buffer is empty or does not start with an `MThd` chunk.
    #[error("no header chunk at the start of the file")]
    MissingHeaderChunk,
    /// A chunk was handed to a decoder that expects a different chunk type.
    #[error("expected a {:?} chunk, found {:?}", Tag::of(.expected), Tag::of(.found))]
    WrongChunkTag { expected: [u8; 4], found: [u8; 4] },
    /// Fewer than the 8 bytes of a chunk header remain.
    #[error("truncated chunk header")]
    TruncatedChunkHeader,
    /// A chunk declares more payload bytes than remain in the buffer.
    #[error("chunk declares {declared} bytes but only {available} remain")]
    TruncatedChunkPayload { declared: u32, available: usize },

    /// The header format field is not 0, 1 or 2.
    #[error("unknown smf format {0}")]
    UnknownFormat(u16),
    /// The header division uses SMPTE timecode, which this decoder does not support.
    #[error("smpte timing ({fps} fps, {ticks_per_frame} ticks/frame) is not supported")]
    UnsupportedTimingMode { fps: u8, ticks_per_frame: u8 },

    /// A variable-length quantity did not terminate within 4 bytes.
    #[error("variable length quantity longer than 4 bytes")]
    MalformedVariableLengthQuantity,
    /// A read would cross the end of the buffer or the enclosing chunk.
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// A track event has no status byte and no running status is active.
    #[error("event missing status byte with no running status active")]
    MissingStatusByte,
    /// A status byte that cannot appear in a track chunk.
    #[error("invalid status byte 0x{0:02X}")]
    InvalidStatusByte(u8),
    /// A channel message data byte has its top bit set.
    ///
    /// Data bytes are always 7-bit, so a byte such as `0x90` where a data byte is expected is
    /// rejected here instead of being read as a raw data value. This kind extends the base set
    /// of structural errors with a strictness check on channel message payloads.
    #[error("invalid data byte 0x{0:02X} in channel message")]
    InvalidDataByte(u8),

    /// An `RMID` RIFF container could not be unwrapped.
    #[error("invalid rmid container: {0}")]
    InvalidRiffContainer(&'static str),
}

/// The result type used by the decoder.
pub type Result<T> = StdResult<T, DecodeError>;
use core::result::Result as StdResult;

/// A non-fatal anomaly found in a file that otherwise decoded successfully.
///
/// Warnings distinguish "decoded, but the file is non-conformant" from "could not decode".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Warning {
    /// The header declares a different number of tracks than the file contains.
    TrackCountMismatch { declared: u16, found: usize },
    /// A `Format::SingleTrack` file does not contain exactly one track.
    SingleTrackFormatMismatch { found: usize },
    /// The track does not end with an end-of-track meta event.
    MissingEndOfTrack { track: usize },
    /// Events follow the end-of-track meta event.
    EventsAfterEndOfTrack { track: usize },
    /// An extra `MThd` chunk was found after the first one and skipped.
    DuplicateHeader { offset: usize },
}
impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Warning::TrackCountMismatch { declared, found } => write!(
                f,
                "header declares {} tracks but the file contains {}",
                declared, found
            ),
            Warning::SingleTrackFormatMismatch { found } => {
                write!(f, "singletrack format file has {} tracks", found)
            }
            Warning::MissingEndOfTrack { track } => {
                write!(f, "track {} has no end-of-track event", track)
            }
            Warning::EventsAfterEndOfTrack { track } => {
                write!(f, "track {} has events after its end-of-track event", track)
            }
            Warning::DuplicateHeader { offset } => {
                write!(f, "duplicate header chunk at byte offset {}", offset)
            }
        }
    }
}
