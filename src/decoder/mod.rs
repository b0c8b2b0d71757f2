//! Recursive, bounds-checked IFD walking over an in-memory buffer.

use tracing::debug;

use crate::error::{TiffError, TiffFormatError, TiffResult};
use crate::scan::find_exif_start;
use crate::tags::Tag;

pub mod ifd;
pub mod stream;

use self::ifd::{Entry, ENTRY_LEN};
use self::stream::{ByteOrder, TiffBuf};

/// Byte-order marker `"II"`, read as a little-endian word.
const BYTE_ORDER_LE: u16 = 0x4949;
/// Byte-order marker `"MM"`, read as a little-endian word.
const BYTE_ORDER_BE: u16 = 0x4d4d;
/// TIFF magic number following the byte-order marker.
const TIFF_MAGIC: u16 = 42;
/// Length of the `"Exif\0\0"` container header.
const EXIF_HEADER_LEN: u64 = 6;

/// What the stream as a whole is expected to contain. Governs the root
/// level kind reported to recursion handlers and nothing else; EXIF is a
/// TIFF structure either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    Tiff,
    Exif,
}

/// The kind of structural level a recursion handler is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    /// The whole decode of a plain TIFF stream.
    TiffRoot,
    /// The whole decode of an EXIF stream.
    ExifRoot,
    /// One directory in the current chain.
    Ifd,
    /// One element of a SubIFD pointer entry.
    SubIfd,
    /// One element of an EXIF-private directory pointer entry.
    ExifIfd,
}

/// Flow-control verdict returned by an entry handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Stop walking the current directory; the enclosing chain continues.
    AbortLevel,
    /// Stop the whole decode. Reported as success.
    Abort,
}

/// Where an entry was found: the directory's own position plus its index
/// in the chain and the base kind of the stream it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdContext {
    /// Offset of the directory's entry-count field.
    pub offset: u64,
    /// Zero-based index of the directory within its chain.
    pub index: u32,
    /// Whether this directory was reached through an EXIF pointer.
    pub base: BaseKind,
    /// Number of entries the directory declares.
    pub count: u16,
}

/// Receives every regular directory entry in walk order.
pub trait EntryHandler {
    /// Called once per decodable entry. `payload` is the resolved offset
    /// of the entry's data; it is guaranteed to lie within the buffer.
    fn entry(
        &mut self,
        buf: &mut TiffBuf<'_>,
        entry: &Entry,
        payload: u64,
        ifd: &IfdContext,
    ) -> Control;
}

/// Receives enter/leave notifications as the walk descends into
/// directories and pointer elements. Both default to no-ops.
pub trait RecursionHandler {
    fn enter(&mut self, _kind: LevelKind, _index: u32) {}
    fn leave(&mut self, _kind: LevelKind, _index: u32) {}
}

/// Decoding limits, guarding against directory graphs crafted to keep the
/// walker busy. Cyclic next-offset chains hit the directory cap and fail
/// cleanly instead of spinning.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Total number of directories visited across the whole decode,
    /// recursion included.
    pub max_ifds: u32,
    /// The internals of `Limits` may change; this field keeps construction
    /// going through `Default`.
    _non_exhaustive: (),
}

impl Limits {
    /// A set of strictly unlimited limits.
    pub fn unlimited() -> Limits {
        Limits {
            max_ifds: u32::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_ifds: 64,
            _non_exhaustive: (),
        }
    }
}

/// Walks the directory structure of a TIFF or EXIF stream held entirely
/// in memory, reporting entries and recursion boundaries to a handler.
///
/// The walk is depth-first: SubIFD and EXIF pointer entries are followed
/// as they are encountered, one recursion per pointer element, and each
/// pointed-to directory is itself walked as a chain through its
/// next-offset field.
pub struct Decoder<'a> {
    buf: TiffBuf<'a>,
    limits: Limits,
    ifds_visited: u32,
    abort: bool,
    first_ifd: u64,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over `data` with default limits.
    pub fn new(data: &'a [u8]) -> Decoder<'a> {
        Decoder {
            buf: TiffBuf::new(data),
            limits: Limits::default(),
            ifds_visited: 0,
            abort: false,
            first_ifd: 0,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Decoder<'a> {
        self.limits = limits;
        self
    }

    /// Runs the walk. With `may_have_exif_preamble`, a stream that does
    /// not open with a byte-order marker is scanned once for an embedded
    /// `"Exif\0\0"` container header and re-anchored behind it.
    ///
    /// A handler abort is not an error. An out-of-range read recorded
    /// during the walk is, but only after every reachable entry has been
    /// reported.
    pub fn decode<H>(
        mut self,
        base: BaseKind,
        may_have_exif_preamble: bool,
        handler: &mut H,
    ) -> TiffResult<()>
    where
        H: EntryHandler + RecursionHandler,
    {
        self.resolve_byte_order(may_have_exif_preamble)?;
        if self.buf.u16_at(2) != TIFF_MAGIC {
            return Err(TiffFormatError::InvalidMagic.into());
        }
        self.first_ifd = u64::from(self.buf.u32_at(4));

        let root = match base {
            BaseKind::Tiff => LevelKind::TiffRoot,
            BaseKind::Exif => LevelKind::ExifRoot,
        };
        handler.enter(root, 0);
        let mut result = Ok(());
        let mut offset = self.first_ifd;
        let mut index = 0;
        while offset != 0 {
            match self.walk_ifd(handler, offset, true, index, base) {
                Ok(next) => offset = next,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
            index += 1;
        }
        handler.leave(root, 0);
        result?;

        if !self.buf.ok() {
            debug!(status = ?self.buf.status(), "decode finished with sticky error status");
            return Err(TiffFormatError::OutOfBounds.into());
        }
        Ok(())
    }

    /// Establishes the stream byte order from the leading marker, with at
    /// most one re-anchoring pass over the first 8 bytes for streams that
    /// carry an EXIF container header in front of the TIFF structure.
    fn resolve_byte_order(&mut self, may_have_exif_preamble: bool) -> TiffResult<()> {
        let mut retried = false;
        loop {
            if self.buf.len() < 8 {
                return Err(TiffFormatError::TruncatedHeader.into());
            }
            let mut raw = [0u8; 2];
            self.buf.read_into(0, &mut raw);
            // The marker bytes repeat, so the probe order does not matter.
            let marker = u16::from_le_bytes(raw);
            match marker {
                BYTE_ORDER_LE => {
                    self.buf.set_byte_order(ByteOrder::LittleEndian);
                    return Ok(());
                }
                BYTE_ORDER_BE => {
                    self.buf.set_byte_order(ByteOrder::BigEndian);
                    return Ok(());
                }
                _ if retried || !may_have_exif_preamble => {
                    return Err(TiffFormatError::InvalidByteOrder(marker).into());
                }
                _ => {
                    let mut header = [0u8; 8];
                    self.buf.read_into(0, &mut header);
                    match find_exif_start(&header) {
                        Some(found) => {
                            debug!(found, "re-anchoring behind EXIF container header");
                            self.buf.shift_origin(found as u64 + EXIF_HEADER_LEN);
                        }
                        None => {
                            return Err(TiffFormatError::InvalidByteOrder(marker).into());
                        }
                    }
                    retried = true;
                }
            }
        }
    }

    /// Walks one directory, counting it against the limits, and returns
    /// the offset of the next directory in the chain (0 terminates).
    fn walk_ifd<H>(
        &mut self,
        handler: &mut H,
        offset: u64,
        follow_chain: bool,
        index: u32,
        base: BaseKind,
    ) -> TiffResult<u64>
    where
        H: EntryHandler + RecursionHandler,
    {
        if self.abort {
            return Ok(0);
        }
        self.ifds_visited += 1;
        if self.ifds_visited > self.limits.max_ifds {
            self.abort = true;
            return Err(TiffError::LimitsExceeded);
        }
        handler.enter(LevelKind::Ifd, index);
        let result = self.scan_entries(handler, offset, follow_chain, index, base);
        handler.leave(LevelKind::Ifd, index);
        result
    }

    fn scan_entries<H>(
        &mut self,
        handler: &mut H,
        offset: u64,
        follow_chain: bool,
        index: u32,
        base: BaseKind,
    ) -> TiffResult<u64>
    where
        H: EntryHandler + RecursionHandler,
    {
        let count = self.buf.u16_at(offset);
        if !self.buf.ok() {
            return Ok(0);
        }
        let ifd = IfdContext {
            offset,
            index,
            base,
            count,
        };
        let mut abort_level = false;
        for i in 0..u64::from(count) {
            let entry_offset = offset + 2 + i * ENTRY_LEN;
            let entry = match Entry::decode(&mut self.buf, entry_offset) {
                Some(entry) => entry,
                None => continue,
            };
            if !self.buf.ok() {
                return Ok(0);
            }
            match self.handle_entry(handler, &entry, entry_offset, &ifd)? {
                Control::Continue => {}
                Control::AbortLevel => {
                    abort_level = true;
                }
                Control::Abort => {
                    self.abort = true;
                    abort_level = true;
                }
            }
            if abort_level || self.abort {
                break;
            }
        }
        if self.abort || !follow_chain {
            return Ok(0);
        }
        let next = u64::from(self.buf.u32_at(offset + 2 + u64::from(count) * ENTRY_LEN));
        if !self.buf.ok() {
            return Ok(0);
        }
        Ok(next)
    }

    /// Dispatches one decoded entry: pointer tags recurse, everything
    /// else goes to the entry handler. Entries whose payload lands
    /// outside the buffer are skipped without touching the sticky status.
    fn handle_entry<H>(
        &mut self,
        handler: &mut H,
        entry: &Entry,
        entry_offset: u64,
        ifd: &IfdContext,
    ) -> TiffResult<Control>
    where
        H: EntryHandler + RecursionHandler,
    {
        let payload = entry.payload_offset(entry_offset);
        let in_range = payload
            .checked_add(entry.payload_len())
            .is_some_and(|end| end <= self.buf.len() as u64);
        if !in_range {
            debug!(
                tag = entry.tag().to_u16(),
                payload, "skipping entry with out-of-range payload"
            );
            return Ok(Control::Continue);
        }
        match entry.tag() {
            Tag::ExifDirectory => {
                self.recurse(handler, entry, payload, LevelKind::ExifIfd, BaseKind::Exif)?;
                Ok(Control::Continue)
            }
            Tag::SubIfd => {
                self.recurse(handler, entry, payload, LevelKind::SubIfd, BaseKind::Tiff)?;
                Ok(Control::Continue)
            }
            _ => Ok(handler.entry(&mut self.buf, entry, payload, ifd)),
        }
    }

    /// Follows each element of a pointer entry into its own directory
    /// chain. Each element gets its own enter/leave pair, balanced even
    /// when the walk inside fails.
    fn recurse<H>(
        &mut self,
        handler: &mut H,
        entry: &Entry,
        payload: u64,
        kind: LevelKind,
        base: BaseKind,
    ) -> TiffResult<()>
    where
        H: EntryHandler + RecursionHandler,
    {
        for i in 0..entry.count() {
            if self.abort {
                return Ok(());
            }
            handler.enter(kind, i);
            let mut result = Ok(());
            let mut sub_offset = u64::from(entry.as_u32(&mut self.buf, payload, i));
            let mut sub_index = 0;
            while sub_offset != 0 {
                match self.walk_ifd(handler, sub_offset, true, sub_index, base) {
                    Ok(next) => sub_offset = next,
                    Err(err) => {
                        result = Err(err);
                        break;
                    }
                }
                sub_index += 1;
            }
            handler.leave(kind, i);
            result?;
        }
        Ok(())
    }
}
