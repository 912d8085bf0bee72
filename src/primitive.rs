//! Simple building-block data that can be read in one go, and the cursor that reads them.
//! All reads are big-endian and bounds-checked.

use crate::prelude::*;

/// Slightly restricted integers.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl From<$inner> for $name {
            /// Lossy conversion, loses the top bits.
            #[inline]
            fn from(raw: $inner) -> $name {
                $name::new(raw)
            }
        }
        impl From<$name> for $inner {
            #[inline]
            fn from(restricted: $name) -> $inner {restricted.0}
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl $name {
            const MASK: $inner = (1 << $bits) - 1;

            /// The maximum value that this restricted integer can hold.
            #[inline]
            pub const fn max_value() -> $name {
                $name(Self::MASK)
            }

            /// Creates a restricted int from its non-restricted counterpart by masking off the
            /// extra bits.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                $name(raw & Self::MASK)
            }

            /// Returns `Some` if the raw integer is within range of the restricted integer, and
            /// `None` otherwise.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw <= Self::MASK {
                    Some($name(raw))
                } else {
                    None
                }
            }

            /// Get the inner integer out of the wrapper.
            /// The inner integer is guaranteed to be in range of the restricted wrapper.
            #[inline]
            pub const fn as_int(self) -> $inner {
                self.0
            }
        }
        impl PartialEq<$inner> for $name {
            fn eq(&self, rhs: &$inner) -> bool {
                self.as_int() == *rhs
            }
        }
        impl PartialOrd<$inner> for $name {
            fn partial_cmp(&self, rhs: &$inner) -> Option<core::cmp::Ordering> {
                Some(self.as_int().cmp(rhs))
            }
        }
    };
}
restricted_int! {
    /// A 28-bit integer type.
    ///
    /// Referred to in the MIDI spec as "variable length quantity".
    u28: u32 => 28
}
restricted_int! {
    /// A 24-bit integer type.
    ///
    /// Wraps the `u32` type and ensures that the top 8 bits are always zero.
    u24: u32 => 24
}
restricted_int! {
    /// A 15-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top bit is always zero.
    u15: u16 => 15
}
restricted_int! {
    /// A 14-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top two bits are always zero.
    u14: u16 => 14
}
restricted_int! {
    /// A 7-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top bit is always zero.
    u7: u8 => 7
}
restricted_int! {
    /// A 4-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top 4 bits are always zero.
    u4: u8 => 4
}

/// A sequential, bounds-checked reader over a bounded view of an immutable byte buffer.
///
/// A cursor never reads past the end of its view, even if the underlying storage is larger.
/// Sub-views created with [`read_bytes`](#method.read_bytes) are cursors themselves, which is
/// what confines each chunk and each event payload to its declared length.
///
/// Every cursor remembers the absolute offset of its view within the original buffer, so errors
/// can report where in the file they occurred.
///
/// This `struct` is very light, so it can be copied freely.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor<'a> {
    /// The unread part of the view.
    raw: &'a [u8],
    /// Absolute offset of `raw[0]` within the original buffer.
    offset: usize,
}
impl<'a> Cursor<'a> {
    /// Create a cursor over a whole buffer, starting at offset 0.
    #[inline]
    pub fn new(raw: &'a [u8]) -> Cursor<'a> {
        Cursor::with_offset(raw, 0)
    }

    /// Create a cursor over a view that starts at the given absolute offset.
    #[inline]
    pub(crate) fn with_offset(raw: &'a [u8], offset: usize) -> Cursor<'a> {
        Cursor { raw, offset }
    }

    /// The absolute offset of the next byte to be read.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// How many bytes are left before the end of this view.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.raw.len()
    }

    /// Whether the view has been fully consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The unread bytes of this view.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.raw
    }

    /// Build an error of the given kind located at the current position.
    #[inline]
    pub(crate) fn err(&self, kind: ErrorKind) -> DecodeError {
        DecodeError::new(kind, self.offset)
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Result<u8> {
        self.raw
            .first()
            .copied()
            .ok_or_else(|| self.err(ErrorKind::UnexpectedEndOfData))
    }

    #[inline]
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        ensure!(len <= self.raw.len(), self.err(ErrorKind::UnexpectedEndOfData));
        let (taken, rest) = self.raw.split_at(len);
        self.raw = rest;
        self.offset += len;
        Ok(taken)
    }

    /// Consume `N` bytes as a fixed-size array.
    #[inline]
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut buf = [0; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    #[inline]
    pub fn read_u24(&mut self) -> Result<u24> {
        let [b0, b1, b2] = self.take_array()?;
        Ok(u24::new(u32::from_be_bytes([0, b0, b1, b2])))
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    /// Read a 4-byte chunk tag.
    #[inline]
    pub(crate) fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.take_array()
    }

    /// Read a variable-length quantity: 7 bits per byte, most significant group first, with the
    /// top bit of each byte flagging that another byte follows.
    ///
    /// At most 4 bytes are read. A 4th byte that still has its continuation bit set fails with
    /// `ErrorKind::MalformedVariableLengthQuantity`, located at the first byte of the quantity.
    pub fn read_vlq(&mut self) -> Result<u28> {
        let start = self.offset;
        let mut int: u32 = 0;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            int = (int << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                //Since we did at most 4 reads of 7 bits each, there MUST be at most 28 bits
                return Ok(u28::new(int));
            }
        }
        Err(DecodeError::new(
            ErrorKind::MalformedVariableLengthQuantity,
            start,
        ))
    }

    /// Split off a bounded view of the next `len` bytes, advancing past them.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<Cursor<'a>> {
        let offset = self.offset;
        let raw = self.take(len)?;
        Ok(Cursor::with_offset(raw, offset))
    }

    /// Advance `len` bytes without looking at them.
    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Read a VLQ length followed by that many bytes, returning the bytes.
    pub(crate) fn read_vlq_slice(&mut self) -> Result<&'a [u8]> {
        let len = self.read_vlq()?.as_int() as usize;
        self.take(len)
    }
}

/// The order in which tracks should be laid out when playing back this SMF file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// This file should have a single track only.
    SingleTrack,
    /// This file has several tracks that should be played simultaneously.
    ///
    /// Usually the first track controls tempo and other song metadata.
    MultiTrackSynchronous,
    /// This file has several tracks, each one a separate song.
    ///
    /// The tracks should be played sequentially, as completely separate MIDI tracks packaged
    /// within a single SMF file.
    MultiTrackAsynchronous,
}
impl Format {
    /// Interpret the raw header format field.
    ///
    /// Fails with `ErrorKind::UnknownFormat` for anything other than 0, 1 or 2.
    pub(crate) fn read(raw: &mut Cursor) -> Result<Format> {
        let at = raw.position();
        let format = raw.read_u16()?;
        Ok(match format {
            0 => Format::SingleTrack,
            1 => Format::MultiTrackSynchronous,
            2 => Format::MultiTrackAsynchronous,
            _ => bail!(DecodeError::new(ErrorKind::UnknownFormat(format), at)),
        })
    }

    /// The raw header field value for this format.
    #[inline]
    pub fn as_bits(self) -> u16 {
        match self {
            Format::SingleTrack => 0,
            Format::MultiTrackSynchronous => 1,
            Format::MultiTrackAsynchronous => 2,
        }
    }
}

/// The tick resolution of an SMF file.
/// This can be in ticks/beat or ticks/frame.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Division {
    /// Specifies ticks/beat as a 15-bit integer.
    ///
    /// The length of a beat is not standard, so in order to fully describe the length of a MIDI
    /// tick a tempo meta event should be present.
    TicksPerQuarterNote(u15),
    /// Specifies ticks/second by dividing a second into frames and then into subframes.
    ///
    /// `fps` is the absolute value of the negative frames-per-second code stored in the file
    /// (24, 25, 29 or 30 in well-formed files).
    Smpte { fps: u8, ticks_per_frame: u8 },
}
impl Division {
    /// Split the raw 16-bit division field into its variants.
    /// The top bit selects the variant.
    #[inline]
    pub fn from_bits(raw: u16) -> Division {
        if raw & 0x8000 != 0 {
            let fps = ((raw >> 8) as u8 as i8).wrapping_neg() as u8;
            Division::Smpte {
                fps,
                ticks_per_frame: (raw & 0xFF) as u8,
            }
        } else {
            Division::TicksPerQuarterNote(u15::new(raw))
        }
    }

    /// Read the header division field, only accepting ticks per quarter note.
    pub(crate) fn read(raw: &mut Cursor) -> Result<Division> {
        let at = raw.position();
        match Division::from_bits(raw.read_u16()?) {
            Division::Smpte {
                fps,
                ticks_per_frame,
            } => Err(DecodeError::new(
                ErrorKind::UnsupportedTimingMode {
                    fps,
                    ticks_per_frame,
                },
                at,
            )),
            metrical => Ok(metrical),
        }
    }

    /// The ticks per quarter note, if the division is metrical.
    #[inline]
    pub fn ticks_per_quarter_note(self) -> Option<u15> {
        match self {
            Division::TicksPerQuarterNote(ticks) => Some(ticks),
            Division::Smpte { .. } => None,
        }
    }
}
