//! Specific to the SMF packaging of MIDI streams.

use crate::{
    chunk::{Chunk, ChunkScanner, Tag, HEADER_TAG},
    event::TrackEvent,
    prelude::*,
    primitive::{Division, Format},
    riff,
};

/// How many events per byte to estimate when allocating memory for events while decoding.
///
/// Real-world files average a little above 4 bytes/event without running status, and a little
/// above 3 bytes/event with it, so erring on the side of overallocation gives 3 bytes/event.
const BYTES_TO_EVENTS: f32 = 1.0 / 3.0;

/// How many bytes a batch of files must add up to in order to enable multithreading.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// A single track: the events of a track chunk, in file order.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct Track {
    events: Vec<TrackEvent>,
}
impl Track {
    #[inline]
    pub(crate) fn new(events: Vec<TrackEvent>) -> Track {
        Track { events }
    }

    /// The events of this track, in the order they appear in the file.
    #[inline]
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, TrackEvent> {
        self.events.iter()
    }

    /// Whether the last event of this track is the end-of-track meta event.
    #[inline]
    pub fn has_end_of_track(&self) -> bool {
        self.events
            .last()
            .map_or(false, |ev| ev.event.is_end_of_track())
    }

    #[inline]
    pub fn into_events(self) -> Vec<TrackEvent> {
        self.events
    }
}
impl IntoIterator for Track {
    type IntoIter = alloc::vec::IntoIter<TrackEvent>;
    type Item = TrackEvent;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
impl<'a> IntoIterator for &'a Track {
    type IntoIter = core::slice::Iter<'a, TrackEvent>;
    type Item = &'a TrackEvent;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Represents a single decoded `.mid` Standard Midi File.
/// If you're casually looking to decode a `.mid` file, this is the type you're looking for.
///
/// A `MidiFile` owns all of its data and does not borrow from the buffer it was decoded from.
/// It cannot be modified after decoding.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct MidiFile {
    header: Header,
    tracks: Vec<Track>,
}
impl MidiFile {
    /// Decode a `.mid` Standard Midi File from its raw bytes.
    ///
    /// Decoding is all-or-nothing: any structural problem fails the whole file.
    /// Non-fatal anomalies are silently accepted; use
    /// [`decode_with_warnings`](#method.decode_with_warnings) to inspect them.
    #[inline]
    pub fn decode(raw: &[u8]) -> Result<MidiFile> {
        Self::decode_with_warnings(raw).map(|(smf, _warnings)| smf)
    }

    /// Decode a `.mid` Standard Midi File, also returning any non-fatal anomalies found in it,
    /// in the order they were found.
    #[inline]
    pub fn decode_with_warnings(raw: &[u8]) -> Result<(MidiFile, Vec<Warning>)> {
        Self::decode_cursor(Cursor::new(raw))
    }

    /// Decode a Standard Midi File wrapped in an `RMID` RIFF container (`.rmi` files).
    ///
    /// Error offsets refer to positions within the RIFF buffer.
    pub fn decode_rmid(raw: &[u8]) -> Result<MidiFile> {
        let smf = riff::unwrap(raw)?;
        Self::decode_cursor(smf).map(|(smf, _warnings)| smf)
    }

    fn decode_cursor(raw: Cursor<'_>) -> Result<(MidiFile, Vec<Warning>)> {
        let (header, mut tracks) = parse_cursor(raw)?;
        let mut decoded = Vec::with_capacity(tracks.track_capacity());
        while let Some(events) = tracks.next() {
            let index = decoded.len();
            decoded.push(events?.collect_track(index, &mut tracks.warnings)?);
        }
        let mut warnings = tracks.warnings;
        if header.track_count as usize != decoded.len() {
            record(
                &mut warnings,
                Warning::TrackCountMismatch {
                    declared: header.track_count,
                    found: decoded.len(),
                },
            );
        }
        if header.format == Format::SingleTrack && decoded.len() != 1 {
            record(
                &mut warnings,
                Warning::SingleTrackFormatMismatch {
                    found: decoded.len(),
                },
            );
        }
        Ok((
            MidiFile {
                header,
                tracks: decoded,
            },
            warnings,
        ))
    }

    /// The header of this MIDI file, indicating the track format and tick resolution.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The tracks within this MIDI file, in file order.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Take the tracks out of this file.
    #[inline]
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Record a warning, reporting it to any diagnostics subscriber.
fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    debug!(%warning, "non-conformant midi file");
    warnings.push(warning);
}

/// Decode several independent files.
///
/// Results are returned in the same order as the input buffers.
/// If the `parallel` feature is enabled and the batch is large enough, files are decoded on the
/// `rayon` thread pool; each file is still decoded by a single thread.
pub fn decode_batch<B>(buffers: &[B]) -> Vec<Result<MidiFile>>
where
    B: AsRef<[u8]> + Sync,
{
    #[cfg(feature = "parallel")]
    {
        let total_len = buffers
            .iter()
            .map(|raw| raw.as_ref().len())
            .sum::<usize>();
        if buffers.len() > 1 && total_len >= PARALLEL_ENABLE_THRESHOLD {
            use rayon::prelude::*;

            return buffers
                .par_iter()
                .map(|raw| MidiFile::decode(raw.as_ref()))
                .collect();
        }
    }
    buffers
        .iter()
        .map(|raw| MidiFile::decode(raw.as_ref()))
        .collect()
}

/// Decode the header of a raw MIDI file, yielding the header and a lazy track iterator.
///
/// The track iterator that is returned yields event iterators, which in turn yield decoded
/// events.
pub fn parse(raw: &[u8]) -> Result<(Header, TrackIter<'_>)> {
    parse_cursor(Cursor::new(raw))
}

fn parse_cursor(raw: Cursor<'_>) -> Result<(Header, TrackIter<'_>)> {
    ensure!(
        raw.as_slice().starts_with(&HEADER_TAG),
        raw.err(ErrorKind::MissingHeaderChunk)
    );
    let mut chunks = ChunkScanner::from_cursor(raw);
    let header = match chunks.next_chunk()? {
        Some(chunk) => Header::decode(chunk)?,
        None => bail!(raw.err(ErrorKind::MissingHeaderChunk)),
    };
    trace!(?header, "decoded midi header");
    Ok((header, TrackIter::new(chunks, header.track_count)))
}

/// A MIDI file header, indicating metadata about the file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    /// Information about how should the tracks be laid out when playing them back.
    pub format: Format,
    /// How many tracks the file declares.
    ///
    /// Nothing guarantees that the file actually contains this many track chunks.
    pub track_count: u16,
    /// The tick resolution used by the delta times of every track.
    pub division: Division,
}
impl Header {
    /// Create a new header from its raw parts.
    #[inline]
    pub fn new(format: Format, track_count: u16, division: Division) -> Header {
        Header {
            format,
            track_count,
            division,
        }
    }

    /// Decode the payload of an `MThd` chunk.
    ///
    /// The payload must be at least 6 bytes long; any trailing bytes are ignored.
    pub fn decode(chunk: Chunk) -> Result<Header> {
        ensure!(
            chunk.is_header(),
            DecodeError::new(
                ErrorKind::WrongChunkTag {
                    expected: HEADER_TAG,
                    found: chunk.tag,
                },
                chunk.offset,
            )
        );
        let mut raw = chunk.data;
        let format = Format::read(&mut raw)?;
        let track_count = raw.read_u16()?;
        let division = Division::read(&mut raw)?;
        if !raw.is_empty() {
            debug!(
                extra = raw.remaining(),
                "ignoring trailing bytes in header chunk"
            );
        }
        Ok(Header::new(format, track_count, division))
    }
}

/// An iterator over all *tracks* in a Standard Midi File.
/// Created by the [`parse`](fn.parse.html) function.
///
/// Chunks with unknown tags are skipped.
/// Stops after yielding the first error.
#[derive(Clone, Debug)]
pub struct TrackIter<'a> {
    chunks: ChunkScanner<'a>,
    track_count_hint: u16,
    warnings: Vec<Warning>,
}
impl<'a> TrackIter<'a> {
    fn new(chunks: ChunkScanner<'a>, track_count_hint: u16) -> TrackIter<'a> {
        TrackIter {
            chunks,
            track_count_hint,
            warnings: Vec::new(),
        }
    }

    /// Peek at the remaining unscanned bytes in the file.
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        self.chunks.unread().as_slice()
    }

    /// How many tracks to allocate room for.
    ///
    /// The header count is only trusted as far as the remaining bytes could hold that many empty
    /// track chunks.
    #[inline]
    pub(crate) fn track_capacity(&self) -> usize {
        usize::from(self.track_count_hint).min(self.chunks.unread().remaining() / 8)
    }

    /// Anomalies found so far while scanning chunks.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
impl<'a> Iterator for TrackIter<'a> {
    type Item = Result<EventIter<'a>>;

    fn next(&mut self) -> Option<Result<EventIter<'a>>> {
        loop {
            match self.chunks.next()? {
                Ok(chunk) if chunk.is_track() => break Some(Ok(EventIter::new(chunk.data))),
                Ok(chunk) if chunk.is_header() => record(
                    &mut self.warnings,
                    Warning::DuplicateHeader {
                        offset: chunk.offset,
                    },
                ),
                Ok(chunk) => {
                    //Unknown chunk, its payload has already been skipped
                    debug!(
                        offset = chunk.offset,
                        len = chunk.data.remaining(),
                        "skipping unknown chunk {:?}",
                        Tag(chunk.tag)
                    );
                }
                Err(err) => break Some(Err(err)),
            }
        }
    }
}

/// An iterator over the events of a single track.
/// Yielded by the [`TrackIter`](struct.TrackIter.html) iterator.
///
/// This iterator is lazy, it decodes events as it goes, and therefore produces
/// `Result<TrackEvent>` rather than `TrackEvent`.
/// It stops after yielding the first error.
#[derive(Clone, Debug)]
pub struct EventIter<'a> {
    raw: Cursor<'a>,
    running_status: Option<u8>,
}
impl<'a> EventIter<'a> {
    /// Decode the events in the payload of a track chunk.
    #[inline]
    pub fn new(raw: Cursor<'a>) -> EventIter<'a> {
        EventIter {
            raw,
            running_status: None,
        }
    }

    /// Get the remaining unread bytes.
    #[inline]
    pub fn unread(&self) -> Cursor<'a> {
        self.raw
    }

    /// Get the current running status of the track.
    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    fn estimate_events(&self) -> usize {
        (self.raw.remaining() as f32 * BYTES_TO_EVENTS) as usize
    }

    /// Decode the remaining events into a `Track`.
    #[inline]
    pub fn into_track(self) -> Result<Track> {
        self.collect_track(0, &mut Vec::new())
    }

    /// Decode the remaining events into a `Track`, recording end-of-track anomalies for the track
    /// with the given index.
    fn collect_track(self, index: usize, warnings: &mut Vec<Warning>) -> Result<Track> {
        let mut events = Vec::with_capacity(self.estimate_events());
        let mut end_of_track = None;
        for ev in self {
            let ev = ev?;
            if end_of_track.is_none() && ev.event.is_end_of_track() {
                end_of_track = Some(events.len());
            }
            events.push(ev);
        }
        match end_of_track {
            None => record(warnings, Warning::MissingEndOfTrack { track: index }),
            Some(at) if at + 1 != events.len() => {
                record(warnings, Warning::EventsAfterEndOfTrack { track: index })
            }
            Some(_) => {}
        }
        Ok(Track::new(events))
    }
}
impl<'a> Iterator for EventIter<'a> {
    type Item = Result<TrackEvent>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.raw.is_empty() {
            return None;
        }
        match TrackEvent::read(&mut self.raw, &mut self.running_status) {
            Ok(ev) => Some(Ok(ev)),
            Err(err) => {
                //Don't decode from the middle of a broken event
                self.raw = Cursor::with_offset(&[], self.raw.position());
                Some(Err(err))
            }
        }
    }
}
