//! Byte-order aware, bounds-checked access to the raw metadata buffer.

use bitflags::bitflags;

/// Byte order of the TIFF stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

macro_rules! read_fn {
    ($name:ident, $type:ty) => {
        /// Interprets the raw bytes in this byte order.
        #[inline(always)]
        pub fn $name(self, n: [u8; std::mem::size_of::<$type>()]) -> $type {
            match self {
                ByteOrder::LittleEndian => <$type>::from_le_bytes(n),
                ByteOrder::BigEndian => <$type>::from_be_bytes(n),
            }
        }
    };
}

impl ByteOrder {
    read_fn!(read_u16, u16);
    read_fn!(read_u32, u32);
    read_fn!(read_f32, f32);
    read_fn!(read_f64, f64);
}

bitflags! {
    /// Sticky decode status. Once a bit is set it stays set for the rest
    /// of the decode, and the top-level call reports failure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u32 {
        /// A read was attempted outside the buffer.
        const OUT_OF_BOUNDS = 0x1;
        /// The backing store could not produce the requested bytes.
        const READ_ERROR = 0x2;
    }
}

/// A read-only view over the raw metadata bytes with a movable origin.
///
/// Every multi-byte read is validated against the buffer extent before it
/// happens. A failed read sets a sticky [`Status`] bit and yields a zero
/// value, so callers never branch on missing data mid-walk.
#[derive(Debug)]
pub struct TiffBuf<'a> {
    data: &'a [u8],
    byte_order: ByteOrder,
    status: Status,
    /// End of the most recent successful read, kept for diagnostics.
    cursor: u64,
}

impl<'a> TiffBuf<'a> {
    /// Wraps a buffer. The byte order is provisional until the stream
    /// header has been resolved.
    pub fn new(data: &'a [u8]) -> TiffBuf<'a> {
        TiffBuf {
            data,
            byte_order: ByteOrder::LittleEndian,
            status: Status::empty(),
            cursor: 0,
        }
    }

    /// Length of the view in bytes, measured from the current origin.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub(crate) fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// The accumulated sticky status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether no sticky error has been recorded yet.
    pub fn ok(&self) -> bool {
        self.status.is_empty()
    }

    /// Validated access to `size` bytes starting at `offset`.
    ///
    /// Returns `None` and records [`Status::OUT_OF_BOUNDS`] when any part
    /// of the range falls outside the view. All other readers are built
    /// on this method; nothing else touches the raw slice.
    pub fn get_at(&mut self, offset: u64, size: u64) -> Option<&'a [u8]> {
        if size < 1 {
            self.status |= Status::READ_ERROR;
            return None;
        }
        let end = match offset.checked_add(size) {
            Some(end) if end <= self.data.len() as u64 => end,
            _ => {
                self.status |= Status::OUT_OF_BOUNDS;
                return None;
            }
        };
        self.cursor = end;
        Some(&self.data[offset as usize..end as usize])
    }

    /// Copies `out.len()` bytes at `offset` into `out`, zero-filling on
    /// failure so callers never see stale data. Returns whether the read
    /// succeeded.
    pub fn read_into(&mut self, offset: u64, out: &mut [u8]) -> bool {
        match self.get_at(offset, out.len() as u64) {
            Some(src) => {
                out.copy_from_slice(src);
                true
            }
            None => {
                out.fill(0);
                false
            }
        }
    }

    pub fn u8_at(&mut self, offset: u64) -> u8 {
        self.get_at(offset, 1).map_or(0, |b| b[0])
    }

    pub fn u16_at(&mut self, offset: u64) -> u16 {
        let mut n = [0u8; 2];
        self.read_into(offset, &mut n);
        self.byte_order.read_u16(n)
    }

    pub fn u32_at(&mut self, offset: u64) -> u32 {
        let mut n = [0u8; 4];
        self.read_into(offset, &mut n);
        self.byte_order.read_u32(n)
    }

    pub fn f32_at(&mut self, offset: u64) -> f32 {
        let mut n = [0u8; 4];
        self.read_into(offset, &mut n);
        self.byte_order.read_f32(n)
    }

    pub fn f64_at(&mut self, offset: u64) -> f64 {
        let mut n = [0u8; 8];
        self.read_into(offset, &mut n);
        self.byte_order.read_f64(n)
    }

    /// Moves the effective origin forward, shrinking the view. Used to
    /// skip an EXIF container header once its length is known. Shifts
    /// past the end of the view are ignored.
    pub(crate) fn shift_origin(&mut self, by: u64) {
        if by <= self.data.len() as u64 {
            self.data = &self.data[by as usize..];
            self.cursor = 0;
        }
    }
}
