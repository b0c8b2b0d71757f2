//! Orientation extraction from EXIF metadata.

use tracing::debug;

use crate::decoder::ifd::Entry;
use crate::decoder::stream::TiffBuf;
use crate::decoder::{
    BaseKind, Control, Decoder, EntryHandler, IfdContext, LevelKind, RecursionHandler,
};
use crate::tags::Tag;

/// The orientation value and whether a decode produced it.
///
/// `orientation` holds one of the eight EXIF orientation codes and
/// defaults to 1, upright, so it is usable whether or not a value was
/// found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExifData {
    /// Whether the stream decoded without a fatal error.
    pub parsed: bool,
    /// EXIF orientation code, 1 through 8.
    pub orientation: u16,
}

impl Default for ExifData {
    fn default() -> ExifData {
        ExifData {
            parsed: false,
            orientation: 1,
        }
    }
}

const STACK_DEPTH: usize = 8;

/// Fixed-depth record of where the walk currently is. Levels deeper than
/// the capacity are counted but not recorded, so the tracked top turns
/// stale rather than the stack overflowing.
#[derive(Debug, Default)]
struct ContextStack {
    depth: usize,
    levels: [(Option<LevelKind>, u32); STACK_DEPTH],
}

impl ContextStack {
    fn push(&mut self, kind: LevelKind, index: u32) {
        if self.depth < STACK_DEPTH {
            self.levels[self.depth] = (Some(kind), index);
        }
        self.depth += 1;
    }

    fn pop(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn top(&self) -> Option<(LevelKind, u32)> {
        if self.depth == 0 || self.depth > STACK_DEPTH {
            return None;
        }
        let (kind, index) = self.levels[self.depth - 1];
        kind.map(|kind| (kind, index))
    }
}

/// Pulls the orientation tag out of the zeroth IFD, ignoring occurrences
/// anywhere deeper in the structure.
#[derive(Debug, Default)]
struct OrientationReader {
    stack: ContextStack,
    data: ExifData,
}

impl EntryHandler for OrientationReader {
    fn entry(
        &mut self,
        buf: &mut TiffBuf<'_>,
        entry: &Entry,
        payload: u64,
        _ifd: &IfdContext,
    ) -> Control {
        if entry.tag() == Tag::Orientation
            && self.stack.depth() == 2
            && self.stack.top() == Some((LevelKind::Ifd, 0))
        {
            let value = entry.as_u32(buf, payload, 0);
            if (1..=8).contains(&value) {
                self.data.orientation = value as u16;
            } else {
                debug!(value, "ignoring out-of-range orientation");
            }
        }
        Control::Continue
    }
}

impl RecursionHandler for OrientationReader {
    fn enter(&mut self, kind: LevelKind, index: u32) {
        self.stack.push(kind, index);
    }

    fn leave(&mut self, _kind: LevelKind, _index: u32) {
        self.stack.pop();
    }
}

/// Decodes EXIF metadata in `data` and extracts the orientation of the
/// primary image.
///
/// `data` may start directly at the byte-order marker or carry an
/// `"Exif\0\0"` container header in front of it. A stream that fails to
/// decode yields `parsed == false` with the orientation left at whatever
/// was extracted before the failure, defaulting to upright.
pub fn parse_orientation(data: &[u8]) -> ExifData {
    let mut reader = OrientationReader::default();
    match Decoder::new(data).decode(BaseKind::Exif, true, &mut reader) {
        Ok(()) => reader.data.parsed = true,
        Err(err) => {
            debug!(%err, "orientation decode failed");
            reader.data.parsed = false;
        }
    }
    reader.data
}
