//! Signature scanners for locating a TIFF stream inside a larger buffer.
//!
//! EXIF metadata rides inside a JPEG APP1 segment, where the TIFF
//! structure usually starts a few bytes in, behind an ASCII `"Exif\0\0"`
//! container header. These scanners find the anchor without decoding
//! anything.

/// Returns the offset of the first `"II"` or `"MM"` byte-order marker in
/// `data`, or `None` if the window holds neither.
pub fn find_tiff_start(data: &[u8]) -> Option<usize> {
    if data.len() < 2 {
        return None;
    }
    data.windows(2).position(|w| w == b"II" || w == b"MM")
}

/// Like [`find_tiff_start`], but additionally accepts the 4-byte ASCII
/// marker `"Exif"` (case-insensitive per byte) as an anchor.
pub fn find_exif_start(data: &[u8]) -> Option<usize> {
    if data.len() < 2 {
        return None;
    }
    for i in 0..data.len() - 1 {
        let window = &data[i..];
        if window.starts_with(b"II") || window.starts_with(b"MM") {
            return Some(i);
        }
        if window.len() >= 4 && window[..4].eq_ignore_ascii_case(b"Exif") {
            return Some(i);
        }
    }
    None
}
