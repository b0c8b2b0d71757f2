//! Directory entries and typed value extraction.

use tracing::{debug, warn};

use super::stream::TiffBuf;
use crate::tags::{Tag, Type};

/// Size of one directory entry on the wire.
pub(crate) const ENTRY_LEN: u64 = 12;

/// Payloads up to this size are stored inline in the value field.
const INLINE_LEN: u64 = 4;

/// A typed element extracted from an entry payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Byte(u8),
    SignedByte(i8),
    Short(u16),
    SignedShort(i16),
    Long(u32),
    SignedLong(i32),
    Float(f32),
    Double(f64),
    /// Fraction stored as (numerator, denominator).
    Rational(u32, u32),
    /// Signed fraction stored as (numerator, denominator).
    SRational(i32, i32),
}

/// A single decoded 12-byte directory entry: tag, type, element count and
/// the raw 4-byte field that is either the inline value or an offset to
/// the payload. Entries are ephemeral; they are decoded one at a time and
/// never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    tag: Tag,
    type_: Type,
    count: u32,
    offset: u32,
}

impl Entry {
    /// Decodes the entry at `offset`. Entries carrying a type code
    /// outside the TIFF 6.0 range are not representable and yield `None`;
    /// the walker skips them without failing the decode.
    pub(crate) fn decode(buf: &mut TiffBuf<'_>, offset: u64) -> Option<Entry> {
        let tag = Tag::from_u16_exhaustive(buf.u16_at(offset));
        let raw_type = buf.u16_at(offset + 2);
        let count = buf.u32_at(offset + 4);
        let value_offset = buf.u32_at(offset + 8);
        match Type::from_u16(raw_type) {
            Some(type_) => Some(Entry {
                tag,
                type_,
                count,
                offset: value_offset,
            }),
            None => {
                debug!(tag = tag.to_u16(), raw_type, "skipping entry with unsupported type code");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn new(tag: Tag, type_: Type, count: u32, offset: u32) -> Entry {
        Entry {
            tag,
            type_,
            count,
            offset,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn field_type(&self) -> Type {
        self.type_
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// The raw value-or-offset field.
    pub fn offset_field(&self) -> u32 {
        self.offset
    }

    /// Total payload size in bytes.
    pub fn payload_len(&self) -> u64 {
        u64::from(self.type_.byte_len()) * u64::from(self.count)
    }

    /// Resolves where the payload lives, per the TIFF 6.0 rule: a payload
    /// of at most 4 bytes sits inline in the value field at
    /// `entry_offset + 8`, anything larger is indirect through the offset
    /// stored there.
    pub(crate) fn payload_offset(&self, entry_offset: u64) -> u64 {
        if self.payload_len() <= INLINE_LEN {
            entry_offset + 8
        } else {
            u64::from(self.offset)
        }
    }

    /// Extracts the `index`-th element of the payload at `payload`.
    ///
    /// Reads past the end of the buffer set the sticky status flag and
    /// produce zeroed elements.
    pub fn value_at(&self, buf: &mut TiffBuf<'_>, payload: u64, index: u32) -> Value {
        let index = u64::from(index);
        match self.type_ {
            Type::BYTE | Type::ASCII | Type::UNDEFINED => Value::Byte(buf.u8_at(payload + index)),
            Type::SBYTE => Value::SignedByte(buf.u8_at(payload + index) as i8),
            Type::SHORT => Value::Short(buf.u16_at(payload + index * 2)),
            Type::SSHORT => Value::SignedShort(buf.u16_at(payload + index * 2) as i16),
            Type::LONG => Value::Long(buf.u32_at(payload + index * 4)),
            Type::SLONG => Value::SignedLong(buf.u32_at(payload + index * 4) as i32),
            Type::FLOAT => Value::Float(buf.f32_at(payload + index * 4)),
            Type::DOUBLE => Value::Double(buf.f64_at(payload + index * 8)),
            Type::RATIONAL => {
                let at = payload + index * 8;
                Value::Rational(buf.u32_at(at), buf.u32_at(at + 4))
            }
            Type::SRATIONAL => {
                let at = payload + index * 8;
                Value::SRational(buf.u32_at(at) as i32, buf.u32_at(at + 4) as i32)
            }
        }
    }

    /// Coerces the `index`-th element to an unsigned 32-bit integer,
    /// accepting the byte, short and long widths. SubIFD and EXIF pointer
    /// tags always arrive through this representation regardless of their
    /// declared width; other types yield zero.
    pub fn as_u32(&self, buf: &mut TiffBuf<'_>, payload: u64, index: u32) -> u32 {
        let index = u64::from(index);
        match self.type_ {
            Type::BYTE | Type::ASCII | Type::UNDEFINED | Type::SBYTE => {
                u32::from(buf.u8_at(payload + index))
            }
            Type::SHORT => u32::from(buf.u16_at(payload + index * 2)),
            Type::LONG => buf.u32_at(payload + index * 4),
            _ => {
                warn!(
                    tag = self.tag.to_u16(),
                    field_type = self.type_.to_u16(),
                    "unsupported field type for integer coercion"
                );
                0
            }
        }
    }

    /// Coerces the `index`-th element to a double; rationals divide, the
    /// signed variant as signed.
    pub fn as_f64(&self, buf: &mut TiffBuf<'_>, payload: u64, index: u32) -> f64 {
        match self.value_at(buf, payload, index) {
            Value::Byte(v) => f64::from(v),
            Value::SignedByte(v) => f64::from(v),
            Value::Short(v) => f64::from(v),
            Value::SignedShort(v) => f64::from(v),
            Value::Long(v) => f64::from(v),
            Value::SignedLong(v) => f64::from(v),
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
            Value::Rational(n, d) => f64::from(n) / f64::from(d),
            Value::SRational(n, d) => f64::from(n) / f64::from(d),
        }
    }
}
