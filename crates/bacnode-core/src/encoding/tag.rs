use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// Application tag numbers for BACnet primitive data types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl AppTag {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::UnsignedInt,
            3 => Self::SignedInt,
            4 => Self::Real,
            5 => Self::Double,
            6 => Self::OctetString,
            7 => Self::CharacterString,
            8 => Self::BitString,
            9 => Self::Enumerated,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::ObjectId,
            _ => return Err(DecodeError::BadTag),
        })
    }
}

// Length/value/type field values reserved for opening and closing tags.
const LVT_OPENING: u8 = 6;
const LVT_CLOSING: u8 = 7;

/// A BACnet tag: application- or context-class with a content length, or a
/// context-class opening/closing bracket around constructed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Application { tag: AppTag, len: u32 },
    Context { tag_num: u8, len: u32 },
    Opening { tag_num: u8 },
    Closing { tag_num: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => encode_tag(w, tag as u8, false, len),
            Tag::Context { tag_num, len } => encode_tag(w, tag_num, true, len),
            Tag::Opening { tag_num } => encode_bracket(w, tag_num, LVT_OPENING),
            Tag::Closing { tag_num } => encode_bracket(w, tag_num, LVT_CLOSING),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let initial = r.read_u8()?;
        let is_context = (initial & 0b0000_1000) != 0;

        let mut tag_num = initial >> 4;
        if tag_num == 0x0F {
            // Extended tag number in the following octet.
            tag_num = r.read_u8()?;
        }

        let lvt = initial & 0x07;
        if is_context {
            match lvt {
                LVT_OPENING => return Ok(Tag::Opening { tag_num }),
                LVT_CLOSING => return Ok(Tag::Closing { tag_num }),
                _ => {}
            }
        }

        let len = decode_length(r, lvt)?;
        if is_context {
            Ok(Tag::Context { tag_num, len })
        } else {
            Ok(Tag::Application {
                tag: AppTag::from_u8(tag_num)?,
                len,
            })
        }
    }
}

fn encode_tag(w: &mut Writer<'_>, tag_num: u8, is_context: bool, len: u32) -> Result<(), EncodeError> {
    let mut initial: u8 = if is_context { 0b0000_1000 } else { 0 };
    initial |= if tag_num <= 14 { tag_num << 4 } else { 0xF0 };
    initial |= if len <= 4 { len as u8 } else { 5 };
    w.write_u8(initial)?;
    if tag_num > 14 {
        w.write_u8(tag_num)?;
    }
    if len > 4 {
        // Extended length: one octet up to 253, then 16- or 32-bit forms.
        if len <= 253 {
            w.write_u8(len as u8)?;
        } else if len <= u16::MAX as u32 {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)?;
        } else {
            w.write_u8(255)?;
            w.write_be_u32(len)?;
        }
    }
    Ok(())
}

fn encode_bracket(w: &mut Writer<'_>, tag_num: u8, lvt: u8) -> Result<(), EncodeError> {
    let mut initial: u8 = 0b0000_1000 | lvt;
    initial |= if tag_num <= 14 { tag_num << 4 } else { 0xF0 };
    w.write_u8(initial)?;
    if tag_num > 14 {
        w.write_u8(tag_num)?;
    }
    Ok(())
}

fn decode_length(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    match lvt {
        0..=4 => Ok(lvt as u32),
        5 => {
            let first = r.read_u8()?;
            match first {
                0..=253 => Ok(first as u32),
                254 => Ok(r.read_be_u16()? as u32),
                255 => r.read_be_u32(),
            }
        }
        _ => Err(DecodeError::BadLength),
    }
}
