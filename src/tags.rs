//! Tag and field-type definitions for the walked metadata space.

macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        #[repr(u16)]
        $vis enum $name {
            $($(#[$ident_attr])* $tag = $val,)*
            $(
                #[$unknown_meta]
                Unknown(u16),
            )*
        }

        impl $name {
            /// Returns the variant corresponding to `val`, if it names a
            /// known value.
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Option<Self> {
                $(
                if val == $val {
                    return Some($name::$tag);
                }
                )*
                None
            }

            $(
            /// Returns the variant corresponding to `val`, falling back to
            /// `Unknown` for values outside the known set.
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                match Self::from_u16($unknown_doc) {
                    Some(v) => v,
                    None => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> u16 {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => $unknown_doc, )*
                }
            }
        }
    };
}

tags! {
/// Tags this decoder dispatches on, plus the baseline tags commonly found
/// in the zeroth IFD of EXIF metadata. Anything else arrives as `Unknown`
/// and is still reported to the entry handler.
pub enum Tag unknown(
    /// A private or extension tag
    unknown
) {
    ImageWidth = 256,
    ImageLength = 257,
    Make = 271,
    Model = 272,
    Orientation = 274,
    XResolution = 282,
    YResolution = 283,
    ResolutionUnit = 296,
    Software = 305,
    DateTime = 306,
    /// Pointer to one or more SubIFDs holding reduced-resolution images.
    SubIfd = 330,
    /// Offset of the embedded thumbnail JPEG.
    JpegInterchangeFormat = 0x201,
    /// Length in bytes of the embedded thumbnail JPEG.
    JpegInterchangeFormatLength = 0x202,
    /// Pointer to the EXIF-private IFD.
    ExifDirectory = 0x8769,
    ExifVersion = 0x9000,
}
}

tags! {
/// The type of an IFD entry (a 2 byte field).
///
/// Only the TIFF 6.0 range is representable; entries carrying any other
/// type code are skipped during decoding.
pub enum Type {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
}
}

impl Type {
    /// Size in bytes of one element of this type.
    pub(crate) fn byte_len(self) -> u8 {
        match self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT => 4,
            Type::RATIONAL | Type::SRATIONAL | Type::DOUBLE => 8,
        }
    }
}
