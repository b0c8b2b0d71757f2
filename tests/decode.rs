//! Walker behavior over synthetic directory structures.

use exif_tiff::decoder::ifd::Entry;
use exif_tiff::decoder::stream::TiffBuf;
use exif_tiff::decoder::{
    BaseKind, Control, Decoder, EntryHandler, IfdContext, LevelKind, Limits, RecursionHandler,
};
use exif_tiff::{TiffError, TiffFormatError};

const SHORT: u16 = 3;
const LONG: u16 = 4;

fn w16(v: u16, be: bool) -> [u8; 2] {
    if be {
        v.to_be_bytes()
    } else {
        v.to_le_bytes()
    }
}

fn w32(v: u32, be: bool) -> [u8; 4] {
    if be {
        v.to_be_bytes()
    } else {
        v.to_le_bytes()
    }
}

struct RawEntry {
    tag: u16,
    type_: u16,
    count: u32,
    value: [u8; 4],
}

fn short_entry(tag: u16, v: u16, be: bool) -> RawEntry {
    let half = w16(v, be);
    RawEntry {
        tag,
        type_: SHORT,
        count: 1,
        value: [half[0], half[1], 0, 0],
    }
}

fn long_entry(tag: u16, v: u32, be: bool) -> RawEntry {
    RawEntry {
        tag,
        type_: LONG,
        count: 1,
        value: w32(v, be),
    }
}

/// Builds a TIFF stream from directories placed at absolute offsets.
struct Builder {
    be: bool,
    data: Vec<u8>,
}

impl Builder {
    fn new(be: bool) -> Builder {
        let mut data = Vec::new();
        data.extend_from_slice(if be { b"MM" } else { b"II" });
        data.extend_from_slice(&w16(42, be));
        data.extend_from_slice(&[0; 4]);
        Builder { be, data }
    }

    fn pos(&self) -> u32 {
        self.data.len() as u32
    }

    fn set_first_ifd(&mut self, offset: u32) {
        let raw = w32(offset, self.be);
        self.data[4..8].copy_from_slice(&raw);
    }

    fn raw(&mut self, bytes: &[u8]) -> u32 {
        let at = self.pos();
        self.data.extend_from_slice(bytes);
        at
    }

    fn ifd(&mut self, entries: &[RawEntry], next: u32) -> u32 {
        let at = self.pos();
        self.data.extend_from_slice(&w16(entries.len() as u16, self.be));
        for e in entries {
            self.data.extend_from_slice(&w16(e.tag, self.be));
            self.data.extend_from_slice(&w16(e.type_, self.be));
            self.data.extend_from_slice(&w32(e.count, self.be));
            self.data.extend_from_slice(&e.value);
        }
        self.data.extend_from_slice(&w32(next, self.be));
        at
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Enter(LevelKind, u32),
    Leave(LevelKind, u32),
    /// Tag and first element coerced to u32.
    Entry(u16, u32),
}

/// Records every callback, optionally answering a non-Continue verdict
/// for one tag.
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    abort_on: Option<(u16, Control)>,
}

impl EntryHandler for Recorder {
    fn entry(
        &mut self,
        buf: &mut TiffBuf<'_>,
        entry: &Entry,
        payload: u64,
        _ifd: &IfdContext,
    ) -> Control {
        let tag = entry.tag().to_u16();
        self.events.push(Event::Entry(tag, entry.as_u32(buf, payload, 0)));
        match self.abort_on {
            Some((t, verdict)) if t == tag => verdict,
            _ => Control::Continue,
        }
    }
}

impl RecursionHandler for Recorder {
    fn enter(&mut self, kind: LevelKind, index: u32) {
        self.events.push(Event::Enter(kind, index));
    }

    fn leave(&mut self, kind: LevelKind, index: u32) {
        self.events.push(Event::Leave(kind, index));
    }
}

fn decode(data: &[u8], handler: &mut Recorder) -> Result<(), TiffError> {
    Decoder::new(data).decode(BaseKind::Exif, true, handler)
}

fn entries_of(events: &[Event]) -> Vec<(u16, u32)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Entry(tag, v) => Some((*tag, *v)),
            _ => None,
        })
        .collect()
}

#[test]
fn single_ifd_big_endian() {
    let mut b = Builder::new(true);
    let ifd = b.ifd(&[short_entry(0x112, 6, true)], 0);
    b.set_first_ifd(ifd);

    let mut rec = Recorder::default();
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(
        rec.events,
        vec![
            Event::Enter(LevelKind::ExifRoot, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Entry(0x112, 6),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::ExifRoot, 0),
        ]
    );
}

#[test]
fn little_endian_matches_big_endian() {
    for be in [false, true] {
        let mut b = Builder::new(be);
        let ifd = b.ifd(
            &[short_entry(0x112, 3, be), long_entry(0x129, 0xabcd, be)],
            0,
        );
        b.set_first_ifd(ifd);
        let mut rec = Recorder::default();
        decode(&b.data, &mut rec).unwrap();
        assert_eq!(entries_of(&rec.events), vec![(0x112, 3), (0x129, 0xabcd)]);
    }
}

#[test]
fn unknown_byte_order_marker() {
    let data = b"XY\x00\x2a\x00\x00\x00\x08";
    let mut rec = Recorder::default();
    let err = Decoder::new(data)
        .decode(BaseKind::Tiff, false, &mut rec)
        .unwrap_err();
    assert_eq!(
        err,
        TiffError::FormatError(TiffFormatError::InvalidByteOrder(0x5958))
    );
    assert!(rec.events.is_empty());
}

#[test]
fn wrong_magic_number() {
    let data = b"II\x2b\x00\x08\x00\x00\x00";
    let mut rec = Recorder::default();
    let err = decode(data, &mut rec).unwrap_err();
    assert_eq!(err, TiffError::FormatError(TiffFormatError::InvalidMagic));
}

#[test]
fn short_buffer() {
    let mut rec = Recorder::default();
    let err = decode(b"II\x2a\x00\x08", &mut rec).unwrap_err();
    assert_eq!(err, TiffError::FormatError(TiffFormatError::TruncatedHeader));
}

#[test]
fn exif_container_header_is_skipped() {
    let mut b = Builder::new(false);
    let ifd = b.ifd(&[short_entry(0x112, 2, false)], 0);
    b.set_first_ifd(ifd);
    let mut data = b"Exif\x00\x00".to_vec();
    data.extend_from_slice(&b.data);

    let mut rec = Recorder::default();
    decode(&data, &mut rec).unwrap();
    assert_eq!(entries_of(&rec.events), vec![(0x112, 2)]);

    // Without the preamble hint the same stream is rejected.
    let mut rec = Recorder::default();
    let err = Decoder::new(&data)
        .decode(BaseKind::Exif, false, &mut rec)
        .unwrap_err();
    assert_eq!(
        err,
        TiffError::FormatError(TiffFormatError::InvalidByteOrder(0x7845))
    );
}

#[test]
fn out_of_range_payload_is_skipped() {
    let mut b = Builder::new(false);
    // SHORT x4 does not fit inline; the offset points far past the end.
    let bad = RawEntry {
        tag: 0x8298,
        type_: SHORT,
        count: 4,
        value: w32(0xffff, false),
    };
    let ifd = b.ifd(&[bad, short_entry(0x112, 5, false)], 0);
    b.set_first_ifd(ifd);

    let mut rec = Recorder::default();
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(entries_of(&rec.events), vec![(0x112, 5)]);
}

#[test]
fn unsupported_type_code_is_skipped() {
    let mut b = Builder::new(false);
    let bad = RawEntry {
        tag: 0x8298,
        type_: 13,
        count: 1,
        value: [0; 4],
    };
    let ifd = b.ifd(&[bad, short_entry(0x112, 7, false)], 0);
    b.set_first_ifd(ifd);

    let mut rec = Recorder::default();
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(entries_of(&rec.events), vec![(0x112, 7)]);
}

#[test]
fn abort_stops_the_whole_walk() {
    let mut b = Builder::new(false);
    let ifd1 = b.ifd(&[short_entry(0x103, 1, false)], 0);
    let ifd0 = b.ifd(
        &[
            short_entry(0x100, 10, false),
            short_entry(0x101, 11, false),
            short_entry(0x102, 12, false),
        ],
        ifd1,
    );
    b.set_first_ifd(ifd0);

    let mut rec = Recorder {
        abort_on: Some((0x101, Control::Abort)),
        ..Recorder::default()
    };
    decode(&b.data, &mut rec).unwrap();
    // Nothing after the aborting entry, in this directory or the next.
    assert_eq!(entries_of(&rec.events), vec![(0x100, 10), (0x101, 11)]);
}

#[test]
fn abort_level_continues_with_the_chain() {
    let mut b = Builder::new(false);
    let ifd1 = b.ifd(&[short_entry(0x103, 1, false)], 0);
    let ifd0 = b.ifd(
        &[
            short_entry(0x100, 10, false),
            short_entry(0x101, 11, false),
            short_entry(0x102, 12, false),
        ],
        ifd1,
    );
    b.set_first_ifd(ifd0);

    let mut rec = Recorder {
        abort_on: Some((0x101, Control::AbortLevel)),
        ..Recorder::default()
    };
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(
        entries_of(&rec.events),
        vec![(0x100, 10), (0x101, 11), (0x103, 1)]
    );
}

#[test]
fn next_offset_cycle_hits_the_directory_limit() {
    let mut b = Builder::new(false);
    let at = b.pos();
    let ifd = b.ifd(&[short_entry(0x112, 1, false)], at);
    b.set_first_ifd(ifd);

    let mut rec = Recorder::default();
    let err = decode(&b.data, &mut rec).unwrap_err();
    assert_eq!(err, TiffError::LimitsExceeded);
    // Entries reported before the cut stand.
    assert!(entries_of(&rec.events).len() >= 64);
}

#[test]
fn subifd_cycle_terminates() {
    let mut b = Builder::new(false);
    // A SubIFD pointer whose single element points back at its own
    // directory.
    let at = b.pos();
    let pointer = long_entry(0x14a, at, false);
    let ifd = b.ifd(&[pointer], 0);
    assert_eq!(ifd, at);
    b.set_first_ifd(ifd);

    let mut rec = Recorder::default();
    let err = decode(&b.data, &mut rec).unwrap_err();
    assert_eq!(err, TiffError::LimitsExceeded);
}

#[test]
fn custom_directory_limit() {
    let mut b = Builder::new(false);
    let at = b.pos();
    let ifd = b.ifd(&[], at);
    b.set_first_ifd(ifd);

    let mut limits = Limits::default();
    limits.max_ifds = 2;
    let mut rec = Recorder::default();
    let err = Decoder::new(&b.data)
        .with_limits(limits)
        .decode(BaseKind::Tiff, false, &mut rec)
        .unwrap_err();
    assert_eq!(err, TiffError::LimitsExceeded);
}

#[test]
fn exif_pointer_recursion() {
    let mut b = Builder::new(false);
    let exif_ifd = b.ifd(&[short_entry(0xa001, 1, false)], 0);
    let ifd0 = b.ifd(
        &[
            short_entry(0x112, 8, false),
            long_entry(0x8769, exif_ifd, false),
        ],
        0,
    );
    b.set_first_ifd(ifd0);

    let mut rec = Recorder::default();
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(
        rec.events,
        vec![
            Event::Enter(LevelKind::ExifRoot, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Entry(0x112, 8),
            Event::Enter(LevelKind::ExifIfd, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Entry(0xa001, 1),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::ExifIfd, 0),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::ExifRoot, 0),
        ]
    );
}

#[test]
fn subifd_pointer_with_two_elements() {
    let mut b = Builder::new(false);
    let sub0 = b.ifd(&[short_entry(0x100, 1, false)], 0);
    let sub1 = b.ifd(&[short_entry(0x100, 2, false)], 0);
    let mut offsets = Vec::new();
    offsets.extend_from_slice(&w32(sub0, false));
    offsets.extend_from_slice(&w32(sub1, false));
    let table = b.raw(&offsets);
    let pointer = RawEntry {
        tag: 0x14a,
        type_: LONG,
        count: 2,
        value: w32(table, false),
    };
    let ifd0 = b.ifd(&[pointer], 0);
    b.set_first_ifd(ifd0);

    let mut rec = Recorder::default();
    decode(&b.data, &mut rec).unwrap();
    assert_eq!(
        rec.events,
        vec![
            Event::Enter(LevelKind::ExifRoot, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Enter(LevelKind::SubIfd, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Entry(0x100, 1),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::SubIfd, 0),
            Event::Enter(LevelKind::SubIfd, 1),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Entry(0x100, 2),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::SubIfd, 1),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::ExifRoot, 0),
        ]
    );
}

#[test]
fn dangling_first_ifd_reports_out_of_bounds() {
    let mut b = Builder::new(false);
    b.set_first_ifd(0x1000);
    let mut rec = Recorder::default();
    let err = decode(&b.data, &mut rec).unwrap_err();
    assert_eq!(err, TiffError::FormatError(TiffFormatError::OutOfBounds));
    // The root notification pair still fires.
    assert_eq!(
        rec.events,
        vec![
            Event::Enter(LevelKind::ExifRoot, 0),
            Event::Enter(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::Ifd, 0),
            Event::Leave(LevelKind::ExifRoot, 0),
        ]
    );
}
