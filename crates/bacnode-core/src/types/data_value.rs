use crate::encoding::{
    primitives::{
        decode_character_string_content, decode_signed, decode_unsigned, encode_signed,
        encode_unsigned,
    },
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, Date, ObjectId, Time};
use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// A BACnet application data value borrowing its variable-length content
/// from the frame or table it was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue<'a> {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(&'a [u8]),
    CharacterString(&'a str),
    BitString(BitString<'a>),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectId),
    #[cfg(feature = "alloc")]
    Constructed { tag_num: u8, values: Vec<DataValue<'a>> },
}

impl<'a> DataValue<'a> {
    /// Encode this value application-tagged at the writer's position.
    ///
    /// This is what an object table calls to render a property value into
    /// the bounded payload window of a reply.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::Null => app_tag(w, AppTag::Null, 0),
            Self::Boolean(v) => app_tag(w, AppTag::Boolean, u32::from(*v)),
            Self::Unsigned(v) => {
                app_tag(w, AppTag::UnsignedInt, content_len(*v))?;
                encode_unsigned(w, *v).map(|_| ())
            }
            Self::Signed(v) => {
                let mut scratch = [0u8; 4];
                let mut sw = Writer::new(&mut scratch);
                let len = encode_signed(&mut sw, *v)? as u32;
                app_tag(w, AppTag::SignedInt, len)?;
                w.write_all(&scratch[..len as usize])
            }
            Self::Real(v) => {
                app_tag(w, AppTag::Real, 4)?;
                w.write_be_u32(v.to_bits())
            }
            Self::Double(v) => {
                app_tag(w, AppTag::Double, 8)?;
                w.write_all(&v.to_bits().to_be_bytes())
            }
            Self::OctetString(v) => {
                app_tag(w, AppTag::OctetString, content_u32(v.len())?)?;
                w.write_all(v)
            }
            Self::CharacterString(v) => {
                app_tag(w, AppTag::CharacterString, content_u32(v.len() + 1)?)?;
                // Character set octet 0 = ANSI X3.4 / UTF-8 in this baseline.
                w.write_u8(0)?;
                w.write_all(v.as_bytes())
            }
            Self::BitString(v) => {
                if v.unused_bits > 7 {
                    return Err(EncodeError::ValueTooLarge);
                }
                app_tag(w, AppTag::BitString, content_u32(v.data.len() + 1)?)?;
                w.write_u8(v.unused_bits)?;
                w.write_all(v.data)
            }
            Self::Enumerated(v) => {
                app_tag(w, AppTag::Enumerated, content_len(*v))?;
                encode_unsigned(w, *v).map(|_| ())
            }
            Self::Date(v) => {
                app_tag(w, AppTag::Date, 4)?;
                w.write_all(&[v.year_since_1900, v.month, v.day, v.weekday])
            }
            Self::Time(v) => {
                app_tag(w, AppTag::Time, 4)?;
                w.write_all(&[v.hour, v.minute, v.second, v.hundredths])
            }
            Self::ObjectId(v) => {
                app_tag(w, AppTag::ObjectId, 4)?;
                w.write_be_u32(v.raw())
            }
            #[cfg(feature = "alloc")]
            Self::Constructed { tag_num, values } => {
                Tag::Opening { tag_num: *tag_num }.encode(w)?;
                for child in values {
                    child.encode(w)?;
                }
                Tag::Closing { tag_num: *tag_num }.encode(w)
            }
        }
    }

    /// Decode one application-tagged value at the reader's position.
    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let tag = Tag::decode(r)?;
        Self::decode_from_tag(r, tag)
    }

    /// Decode the content of a value whose tag the caller already consumed.
    pub fn decode_from_tag(r: &mut Reader<'a>, tag: Tag) -> Result<Self, DecodeError> {
        let (app, len) = match tag {
            Tag::Application { tag, len } => (tag, len as usize),
            #[cfg(feature = "alloc")]
            Tag::Opening { tag_num } => {
                let mut values = Vec::new();
                loop {
                    let child = Tag::decode(r)?;
                    if child == (Tag::Closing { tag_num }) {
                        break;
                    }
                    values.push(Self::decode_from_tag(r, child)?);
                }
                return Ok(Self::Constructed { tag_num, values });
            }
            _ => return Err(DecodeError::BadTag),
        };

        match (app, len) {
            (AppTag::Null, _) => Ok(Self::Null),
            (AppTag::Boolean, len) => Ok(Self::Boolean(len != 0)),
            (AppTag::UnsignedInt, len) => Ok(Self::Unsigned(decode_unsigned(r, len)?)),
            (AppTag::SignedInt, len) => Ok(Self::Signed(decode_signed(r, len)?)),
            (AppTag::Real, 4) => Ok(Self::Real(f32::from_bits(r.read_be_u32()?))),
            (AppTag::Double, 8) => {
                let b = r.read_exact(8)?;
                Ok(Self::Double(f64::from_bits(u64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))))
            }
            (AppTag::OctetString, len) => Ok(Self::OctetString(r.read_exact(len)?)),
            (AppTag::CharacterString, len) => Ok(Self::CharacterString(
                decode_character_string_content(r, len)?,
            )),
            (AppTag::BitString, len) => {
                if len == 0 {
                    return Err(DecodeError::BadLength);
                }
                let raw = r.read_exact(len)?;
                if raw[0] > 7 {
                    return Err(DecodeError::BadValue);
                }
                Ok(Self::BitString(BitString {
                    unused_bits: raw[0],
                    data: &raw[1..],
                }))
            }
            (AppTag::Enumerated, len) => Ok(Self::Enumerated(decode_unsigned(r, len)?)),
            (AppTag::Date, 4) => {
                let b = r.read_exact(4)?;
                Ok(Self::Date(Date {
                    year_since_1900: b[0],
                    month: b[1],
                    day: b[2],
                    weekday: b[3],
                }))
            }
            (AppTag::Time, 4) => {
                let b = r.read_exact(4)?;
                Ok(Self::Time(Time {
                    hour: b[0],
                    minute: b[1],
                    second: b[2],
                    hundredths: b[3],
                }))
            }
            (AppTag::ObjectId, 4) => Ok(Self::ObjectId(ObjectId::from_raw(r.read_be_u32()?))),
            _ => Err(DecodeError::BadLength),
        }
    }
}

fn app_tag(w: &mut Writer<'_>, tag: AppTag, len: u32) -> Result<(), EncodeError> {
    Tag::Application { tag, len }.encode(w)
}

fn content_len(value: u32) -> u32 {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn content_u32(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::ValueTooLarge)
}
