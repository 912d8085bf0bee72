//! All sort of events and their parsers.

use crate::prelude::*;

/// Represents a decoded SMF track event.
///
/// Consists of a delta time (in MIDI ticks relative to the previous event in the same track) and
/// the actual event.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TrackEvent {
    /// How many MIDI ticks after the previous event should this event fire.
    pub delta: u28,
    /// The type of event along with event-specific data.
    pub event: Event,
}
impl TrackEvent {
    /// Advances the cursor past one `(delta, event)` pair and updates `running_status`.
    ///
    /// In case of failure the cursor might be left in the middle of an event!
    pub(crate) fn read(raw: &mut Cursor, running_status: &mut Option<u8>) -> Result<TrackEvent> {
        let delta = raw.read_vlq()?;
        let event = Event::read(raw, running_status)?;
        Ok(TrackEvent { delta, event })
    }
}

/// Represents the different families of SMF events and their associated data.
///
/// It notably does *not* include the timing of the event; the `TrackEvent` struct is responsible
/// for this.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum Event {
    /// A message associated to a MIDI channel carrying musical data.
    ///
    /// Usually, the bulk of MIDI data is these kind of messages.
    Channel {
        /// The MIDI channel that this event is associated with.
        channel: u4,
        /// The MIDI message type and associated data.
        message: ChannelMessage,
    },
    /// A meta event, giving extra information for correct playback, like tempo, song name,
    /// lyrics, etc...
    Meta(MetaEvent),
    /// A System Exclusive event, carrying arbitrary vendor data.
    SysEx(SysExEvent),
}
impl Event {
    fn read(raw: &mut Cursor, running_status: &mut Option<u8>) -> Result<Event> {
        let at = raw.position();
        let mut status = raw.peek_u8()?;
        if status < 0x80 {
            //Running status! The byte is the first data byte of a repeated message
            status = running_status.ok_or_else(|| raw.err(ErrorKind::MissingStatusByte))?;
        } else {
            raw.skip(1)?;
        }
        //Delegate further parsing depending on status
        let event = match status {
            0x80..=0xEF => {
                *running_status = Some(status);
                let (channel, message) = ChannelMessage::read(status, raw)?;
                Event::Channel { channel, message }
            }
            //Meta events neither use nor alter running status
            0xFF => Event::Meta(MetaEvent::read(raw)?),
            0xF0 => {
                *running_status = None;
                Event::SysEx(SysExEvent::read(SysExForm::Initial, raw)?)
            }
            0xF7 => Event::SysEx(SysExEvent::read(SysExForm::Continuation, raw)?),
            _ => bail!(DecodeError::new(ErrorKind::InvalidStatusByte(status), at)),
        };
        Ok(event)
    }

    /// Whether this is an end-of-track meta event.
    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        matches!(self, Event::Meta(meta) if meta.is_end_of_track())
    }
}

/// Represents a MIDI channel message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ChannelMessage {
    /// Stop playing a note.
    NoteOff {
        /// The MIDI key to stop playing.
        key: u7,
        /// The velocity with which to stop playing it.
        vel: u7,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to start playing.
        key: u7,
        /// The velocity (strength) with which to press it.
        ///
        /// Note that by convention a `NoteOn` message with a velocity of 0 is equivalent to a
        /// `NoteOff`.
        vel: u7,
    },
    /// Modify the velocity of a note after it has been played.
    Aftertouch {
        /// The key for which to modify its velocity.
        key: u7,
        /// The new velocity for the key.
        vel: u7,
    },
    /// Modify the value of a MIDI controller.
    Controller {
        /// The controller to modify.
        ///
        /// See the MIDI spec for the meaning of each index.
        controller: u7,
        /// The value to set it to.
        value: u7,
    },
    /// Change the program (also known as instrument) for a channel.
    ProgramChange {
        /// The new program (instrument) to use for the channel.
        program: u7,
    },
    /// Change the note velocity of a whole channel at once, without starting new notes.
    ChannelAftertouch {
        /// The new velocity for all notes currently playing in the channel.
        vel: u7,
    },
    /// Set the pitch bend value for the entire channel.
    PitchBend {
        /// The new pitch-bend value.
        bend: PitchBend,
    },
}
impl ChannelMessage {
    /// Channel messages have a known length, indexed by status nibble.
    pub(crate) fn data_len(status: u8) -> usize {
        const LENGTH_BY_STATUS: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];
        LENGTH_BY_STATUS[(status >> 4) as usize] as usize
    }

    /// Read the data bytes following the given status byte.
    ///
    /// Panics if the `status` is not a channel message status (0x80..=0xEF).
    fn read(status: u8, raw: &mut Cursor) -> Result<(u4, ChannelMessage)> {
        let mut data = [u7::new(0); 2];
        for slot in data.iter_mut().take(Self::data_len(status)) {
            let at = raw.position();
            let byte = raw.read_u8()?;
            *slot = u7::try_from(byte)
                .ok_or_else(|| DecodeError::new(ErrorKind::InvalidDataByte(byte), at))?;
        }
        let channel = u4::new(status);
        let msg = match status >> 4 {
            0x8 => ChannelMessage::NoteOff {
                key: data[0],
                vel: data[1],
            },
            0x9 => ChannelMessage::NoteOn {
                key: data[0],
                vel: data[1],
            },
            0xA => ChannelMessage::Aftertouch {
                key: data[0],
                vel: data[1],
            },
            0xB => ChannelMessage::Controller {
                controller: data[0],
                value: data[1],
            },
            0xC => ChannelMessage::ProgramChange { program: data[0] },
            0xD => ChannelMessage::ChannelAftertouch { vel: data[0] },
            0xE => {
                //Note the little-endian order, contrasting with the default big-endian order of
                //Standard Midi Files
                let lsb = data[0].as_int() as u16;
                let msb = data[1].as_int() as u16;
                ChannelMessage::PitchBend {
                    bend: PitchBend(u14::new(msb << 7 | lsb)),
                }
            }
            _ => panic!("parsed channel message before checking that status is in range"),
        };
        Ok((channel, msg))
    }

    /// Get the raw status nibble for this channel message type (`0x8` to `0xE`).
    pub fn status_nibble(&self) -> u8 {
        match self {
            ChannelMessage::NoteOff { .. } => 0x8,
            ChannelMessage::NoteOn { .. } => 0x9,
            ChannelMessage::Aftertouch { .. } => 0xA,
            ChannelMessage::Controller { .. } => 0xB,
            ChannelMessage::ProgramChange { .. } => 0xC,
            ChannelMessage::ChannelAftertouch { .. } => 0xD,
            ChannelMessage::PitchBend { .. } => 0xE,
        }
    }

    /// Get the raw data bytes of this message, as they appear in the file.
    ///
    /// Program change and channel aftertouch messages have a single data byte, all other
    /// messages have two.
    pub fn data(&self) -> ([u7; 2], usize) {
        match *self {
            ChannelMessage::NoteOff { key, vel }
            | ChannelMessage::NoteOn { key, vel }
            | ChannelMessage::Aftertouch { key, vel } => ([key, vel], 2),
            ChannelMessage::Controller { controller, value } => ([controller, value], 2),
            ChannelMessage::ProgramChange { program } => ([program, u7::new(0)], 1),
            ChannelMessage::ChannelAftertouch { vel } => ([vel, u7::new(0)], 1),
            ChannelMessage::PitchBend { bend } => {
                let raw = bend.0.as_int();
                ([u7::new(raw as u8), u7::new((raw >> 7) as u8)], 2)
            }
        }
    }
}

/// The value of a pitch bend, represented as 14 bits.
///
/// A value of `0x0000` indicates full bend downwards.
/// A value of `0x2000` indicates no bend.
/// A value of `0x3FFF` indicates full bend upwards.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PitchBend(pub u14);
impl PitchBend {
    /// The middle value of `0x2000`, indicating no bend.
    #[inline]
    pub const fn mid_raw_value() -> PitchBend {
        PitchBend(u14::new(0x2000))
    }

    /// Returns an int in the range `[-0x2000, 0x1FFF]`.
    #[inline]
    pub fn as_int(self) -> i16 {
        self.0.as_int() as i16 - 0x2000
    }

    /// Returns an `f32` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f32(self) -> f32 {
        self.as_int() as f32 * (1.0 / 0x2000 as f32)
    }
}

/// A raw meta event: its type byte and the payload that followed its length prefix.
///
/// Use [`message`](#method.message) for a typed view of well-known meta events.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct MetaEvent {
    /// The meta event type byte, following the `0xFF` prefix.
    pub kind: u8,
    /// The payload bytes, not including the length prefix.
    pub data: Vec<u8>,
}
impl MetaEvent {
    /// The type byte of the end-of-track meta event.
    pub const END_OF_TRACK: u8 = 0x2F;

    fn read(raw: &mut Cursor) -> Result<MetaEvent> {
        let kind = raw.read_u8()?;
        let data = raw.read_vlq_slice()?.to_vec();
        Ok(MetaEvent { kind, data })
    }

    /// Whether this is the obligatory end-of-track meta event.
    ///
    /// A well-formed end-of-track event has type `0x2F` and an empty payload. A `0x2F` event
    /// carrying data does not end the track.
    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        self.kind == Self::END_OF_TRACK && self.data.is_empty()
    }

    /// Interpret this meta event.
    ///
    /// Events whose payload is too short for their type are reported as `MetaMessage::Unknown`.
    pub fn message(&self) -> MetaMessage {
        let data = &self.data[..];
        match self.kind {
            0x00 => MetaMessage::TrackNumber(match *data {
                [hi, lo, ..] => Some(u16::from_be_bytes([hi, lo])),
                _ => None,
            }),
            0x01 => MetaMessage::Text(data),
            0x02 => MetaMessage::Copyright(data),
            0x03 => MetaMessage::TrackName(data),
            0x04 => MetaMessage::InstrumentName(data),
            0x05 => MetaMessage::Lyric(data),
            0x06 => MetaMessage::Marker(data),
            0x07 => MetaMessage::CuePoint(data),
            0x08 => MetaMessage::ProgramName(data),
            0x09 => MetaMessage::DeviceName(data),
            0x20 if !data.is_empty() => MetaMessage::MidiChannel(u4::new(data[0])),
            0x21 if !data.is_empty() => MetaMessage::MidiPort(u7::new(data[0])),
            Self::END_OF_TRACK if data.is_empty() => MetaMessage::EndOfTrack,
            0x51 if data.len() >= 3 => {
                MetaMessage::Tempo(u24::new(u32::from_be_bytes([0, data[0], data[1], data[2]])))
            }
            0x54 => match SmpteTime::from_bytes(data) {
                Some(time) => MetaMessage::SmpteOffset(time),
                None => MetaMessage::Unknown(self.kind, data),
            },
            0x58 if data.len() >= 4 => {
                MetaMessage::TimeSignature(data[0], data[1], data[2], data[3])
            }
            0x59 if data.len() >= 2 => MetaMessage::KeySignature(data[0] as i8, data[1] != 0),
            0x7F => MetaMessage::SequencerSpecific(data),
            _ => MetaMessage::Unknown(self.kind, data),
        }
    }
}

/// A typed view of a meta event, as defined by the SMF spec.
/// These events carry metadata about the track, such as tempo, time signature, copyright, etc...
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MetaMessage<'a> {
    /// For `Format::MultiTrackAsynchronous` files, `TrackNumber` can be empty, and defaults to
    /// the track index.
    TrackNumber(Option<u16>),
    /// Arbitrary text associated to an instant.
    Text(&'a [u8]),
    /// A copyright notice.
    Copyright(&'a [u8]),
    /// Information about the name of the track.
    TrackName(&'a [u8]),
    /// Information about the name of the current instrument.
    InstrumentName(&'a [u8]),
    /// Arbitrary lyric information associated to an instant.
    Lyric(&'a [u8]),
    /// Arbitrary marker text associated to an instant.
    Marker(&'a [u8]),
    /// Arbitrary cue point text associated to an instant.
    CuePoint(&'a [u8]),
    /// Information about the name of the current program.
    ProgramName(&'a [u8]),
    /// Name of the device that this file was intended to be played with.
    DeviceName(&'a [u8]),
    /// Number of the MIDI channel that this file was intended to be played with.
    MidiChannel(u4),
    /// Number of the MIDI port that this file was intended to be played with.
    MidiPort(u7),
    /// Obligatory at track end.
    EndOfTrack,
    /// Amount of microseconds per beat (quarter note).
    Tempo(u24),
    /// The starting point of the track, in SMPTE time.
    SmpteOffset(SmpteTime),
    /// In order of the MIDI specification, numerator, denominator, MIDI clocks per click, 32nd
    /// notes per quarter
    TimeSignature(u8, u8, u8, u8),
    /// As in the MIDI specification, negative numbers indicate number of flats and positive
    /// numbers indicate number of sharps.
    /// `false` indicates a major scale, `true` indicates a minor scale.
    KeySignature(i8, bool),
    /// Arbitrary data intended for the sequencer.
    SequencerSpecific(&'a [u8]),
    /// An unknown or malformed meta event.
    ///
    /// The `u8` is the raw meta event type byte, the slice is its payload.
    Unknown(u8, &'a [u8]),
}

/// A timestamp encoding an SMPTE time of the day.
///
/// Enforces several guarantees:
///
/// - `hour` is inside [0, 23]
/// - `minute` is inside [0, 59]
/// - `second` is inside [0, 59]
/// - `frame` is inside [0, fps - 1]
/// - `subframe` is inside [0, 99]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SmpteTime {
    hour: u8,
    minute: u8,
    second: u8,
    frame: u8,
    subframe: u8,
    fps: Fps,
}
impl SmpteTime {
    /// Create a new SMPTE timestamp with the given information.
    #[inline]
    pub fn new(
        hour: u8,
        minute: u8,
        second: u8,
        frame: u8,
        subframe: u8,
        fps: Fps,
    ) -> Option<SmpteTime> {
        if hour < 24 && minute < 60 && second < 60 && frame < fps.as_int() && subframe < 100 {
            Some(SmpteTime {
                hour,
                minute,
                second,
                frame,
                subframe,
                fps,
            })
        } else {
            None
        }
    }

    /// Decode the 5-byte payload of an SMPTE offset meta event.
    fn from_bytes(data: &[u8]) -> Option<SmpteTime> {
        match *data {
            [hour_fps, minute, second, frame, subframe] => {
                let fps = Fps::from_code(hour_fps >> 5 & 0b11);
                SmpteTime::new(hour_fps & 0x1F, minute, second, frame, subframe, fps)
            }
            _ => None,
        }
    }

    /// Get the hour component of this timestamp.
    #[inline]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Get the minute component of this timestamp.
    #[inline]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Get the second component of this timestamp.
    #[inline]
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Get the frame component of this timestamp.
    /// The meaning of this value depends on the value of `fps`.
    #[inline]
    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Get the subframe component of this timestamp (hundredths of a frame).
    #[inline]
    pub fn subframe(&self) -> u8 {
        self.subframe
    }

    /// Get the FPS component of this timestamp.
    #[inline]
    pub fn fps(&self) -> Fps {
        self.fps
    }
}

/// One of the four FPS values available for SMPTE times, as defined by the MIDI standard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Fps {
    /// 24 frames per second.
    Fps24,
    /// 25 frames per second.
    Fps25,
    /// Actually `29.97 = 30 / 1.001` frames per second.
    Fps29,
    /// 30 frames per second.
    Fps30,
}
impl Fps {
    /// Does the conversion from a 2-bit fps code to an `Fps` value.
    fn from_code(code: u8) -> Fps {
        match code & 0b11 {
            0 => Fps::Fps24,
            1 => Fps::Fps25,
            2 => Fps::Fps29,
            _ => Fps::Fps30,
        }
    }

    /// Get the integral approximate fps out.
    #[inline]
    pub fn as_int(self) -> u8 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps29 => 29,
            Fps::Fps30 => 30,
        }
    }
}

/// Which of the two SMF SysEx encodings an event uses.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum SysExForm {
    /// Introduced by `0xF0`: the start of a System Exclusive message.
    /// The implicit `0xF0` is not included in the data.
    Initial,
    /// Introduced by `0xF7`: either a continuation packet of a split SysEx message, or an escape
    /// sequence carrying arbitrary bytes.
    Continuation,
}

/// A System Exclusive event, carrying arbitrary data.
///
/// Usually SysEx events end with an `0xF7` byte, but SysEx events that are split into several
/// packets may only contain the `0xF7` byte in the last packet.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct SysExEvent {
    /// Which prefix introduced this event.
    pub form: SysExForm,
    /// The payload bytes, not including the prefix and the length.
    pub data: Vec<u8>,
}
impl SysExEvent {
    fn read(form: SysExForm, raw: &mut Cursor) -> Result<SysExEvent> {
        let data = raw.read_vlq_slice()?.to_vec();
        Ok(SysExEvent { form, data })
    }

    /// Whether the payload ends with the `0xF7` terminator, completing the message.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.data.last() == Some(&0xF7)
    }
}
