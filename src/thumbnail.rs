//! Embedded thumbnail JPEG location.

use tracing::debug;

use crate::decoder::ifd::Entry;
use crate::decoder::stream::TiffBuf;
use crate::decoder::{BaseKind, Control, Decoder, EntryHandler, IfdContext, RecursionHandler};
use crate::tags::Tag;

/// Collects the JPEG interchange offset/length pair and stops the walk
/// as soon as both halves are in hand.
#[derive(Debug, Default)]
struct ThumbnailFinder {
    offset: u32,
    size: u32,
}

impl EntryHandler for ThumbnailFinder {
    fn entry(
        &mut self,
        buf: &mut TiffBuf<'_>,
        entry: &Entry,
        payload: u64,
        _ifd: &IfdContext,
    ) -> Control {
        if self.size > 0 {
            return Control::Abort;
        }
        match entry.tag() {
            Tag::JpegInterchangeFormat => self.offset = entry.as_u32(buf, payload, 0),
            Tag::JpegInterchangeFormatLength => self.size = entry.as_u32(buf, payload, 0),
            _ => {}
        }
        Control::Continue
    }
}

impl RecursionHandler for ThumbnailFinder {}

/// Locates the embedded thumbnail JPEG in EXIF metadata, returning its
/// `(offset, size)` relative to the start of the TIFF structure.
///
/// The pair is reported only when the declared extent fits inside
/// `data`; a decode failure after the pair was seen does not discard it.
pub fn find_thumbnail_jpeg(data: &[u8]) -> Option<(u32, u32)> {
    let mut finder = ThumbnailFinder::default();
    if let Err(err) = Decoder::new(data).decode(BaseKind::Exif, true, &mut finder) {
        debug!(%err, "thumbnail decode failed");
    }
    if finder.size == 0 {
        return None;
    }
    let end = u64::from(finder.offset) + u64::from(finder.size);
    if end > data.len() as u64 {
        return None;
    }
    Some((finder.offset, finder.size))
}
