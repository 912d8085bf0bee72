//! # Overview
//!
//! `smfparse` decodes Standard Midi Files (`.mid`) into a validated, owned, in-memory model: the
//! file header and the timed event stream of every track.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use smfparse::MidiFile;
//!
//! # let bytes: &[u8] = &[
//! #     b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96,
//! #     b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00,
//! # ];
//! let smf = MidiFile::decode(bytes).unwrap();
//!
//! for (i, track) in smf.tracks().iter().enumerate() {
//!     println!("track {} has {} events", i, track.len());
//! }
//! ```
//!
//! The [`MidiFile`](struct.MidiFile.html) struct is the main type in the crate.
//! Loading the bytes (from disk or elsewhere) is up to the caller: the decoder only borrows the
//! buffer for the duration of the call and copies out everything it keeps.
//!
//! # Strictness
//!
//! The decoder does not attempt to plow through corrupted files.
//! Any structural violation fails the whole decode with a [`DecodeError`](struct.DecodeError.html)
//! pointing at the offending byte offset.
//! Files that decode fine but are not fully conformant (a missing end-of-track event, a track
//! count that does not match the header) produce [`Warning`](enum.Warning.html)s instead, which
//! are available through [`MidiFile::decode_with_warnings`].
//!
//! SMPTE-timed files are recognized but rejected with `ErrorKind::UnsupportedTimingMode`.
//!
//! # Lazy decoding
//!
//! The [`parse`](fn.parse.html) function decodes only the header, and returns an iterator over
//! the track chunks, which in turn yield iterators over the events of each track.
//!
//! # About features
//!
//! - `std` (enabled by default)
//!
//!   Implements `std::error::Error` for `DecodeError`.
//!   Disabling this feature makes the crate `no_std + alloc`.
//!
//! - `parallel` (enabled by default)
//!
//!   Allows [`decode_batch`](fn.decode_batch.html) to decode large batches of independent files
//!   on multiple threads, through the `rayon` dependency.
//!   A single file is always decoded on the calling thread.
//!
//! - `tracing` (enabled by default)
//!
//!   Emits `tracing` events while scanning chunks and recording warnings.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    }};
}
macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    }};
}

mod error;

mod prelude {
    pub(crate) use crate::{
        error::{DecodeError, ErrorKind, Result, Warning},
        primitive::{u14, u24, u28, u4, u7, Cursor},
    };
    pub(crate) use alloc::vec::Vec;
    pub(crate) use core::fmt;
}

mod chunk;
mod event;
mod primitive;
pub mod riff;
mod smf;

pub use crate::{
    chunk::{Chunk, ChunkScanner},
    error::{DecodeError, ErrorKind, Result, Warning},
    event::{
        ChannelMessage, Event, Fps, MetaEvent, MetaMessage, PitchBend, SmpteTime, SysExEvent,
        SysExForm, TrackEvent,
    },
    primitive::{Cursor, Division, Format},
    smf::{decode_batch, parse, EventIter, Header, MidiFile, Track, TrackIter},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u14, u15, u24, u28, u4, u7};
}
