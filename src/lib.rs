//! Decoding of TIFF-structured metadata, as found in TIFF files and in
//! the EXIF segment of JPEGs.
//!
//! The input is a byte buffer that is treated as untrusted: every read is
//! bounds-checked, pointer entries that leave the buffer are skipped, and
//! cyclic directory chains are cut off by a configurable limit. The core
//! is a recursive directory walker ([`decoder::Decoder`]) that reports
//! entries to caller-supplied handlers; [`parse_orientation`] and
//! [`find_thumbnail_jpeg`] are ready-made consumers built on it.
//!
//! # Examples
//!
//! ```
//! use exif_tiff::parse_orientation;
//!
//! // Big-endian stream with one directory holding an orientation of 6.
//! let data: &[u8] = &[
//!     0x4d, 0x4d, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x08, // header
//!     0x00, 0x01, // entry count
//!     0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, // orientation, SHORT x1
//!     0x00, 0x06, 0x00, 0x00, // value 6
//!     0x00, 0x00, 0x00, 0x00, // end of chain
//! ];
//! let exif = parse_orientation(data);
//! assert!(exif.parsed);
//! assert_eq!(exif.orientation, 6);
//! ```

pub mod decoder;
mod error;
mod orientation;
mod scan;
pub mod tags;
mod thumbnail;

pub use self::error::{TiffError, TiffFormatError, TiffResult};
pub use self::orientation::{parse_orientation, ExifData};
pub use self::scan::{find_exif_start, find_tiff_start};
pub use self::thumbnail::find_thumbnail_jpeg;
