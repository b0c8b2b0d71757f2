use quick_error::quick_error;

quick_error! {
    /// Conditions a malformed or truncated stream can produce.
    ///
    /// Only stream-fatal and buffer-fatal conditions surface here; an
    /// individual entry with a bad type code or an out-of-range payload is
    /// skipped and never fails the decode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TiffFormatError {
        /// The buffer is shorter than the 8-byte TIFF header.
        TruncatedHeader {
            display("stream shorter than the 8-byte TIFF header")
        }
        /// The first two bytes are neither `"II"` nor `"MM"`, and no
        /// embedded TIFF signature could be found.
        InvalidByteOrder(marker: u16) {
            display("invalid byte-order marker {:#06x}", marker)
        }
        /// The magic-number field after the byte-order marker is not 42.
        InvalidMagic {
            display("not a TIFF stream")
        }
        /// A read was attempted past the end of the buffer while walking
        /// the directory structure.
        OutOfBounds {
            display("a field pointed outside the stream")
        }
    }
}

quick_error! {
    /// Tiff error kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TiffError {
        /// The stream is not formatted properly.
        FormatError(err: TiffFormatError) {
            display("format error: {}", err)
            from()
        }
        /// A decoding limit was reached before the walk finished.
        LimitsExceeded {
            display("decoding limit exceeded")
        }
    }
}

/// Result of a metadata decoding process.
pub type TiffResult<T> = Result<T, TiffError>;
