use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::{DecodeError, EncodeError};

/// Encode the content octets of an unsigned value, shortest form first.
/// Returns the number of content octets written.
pub fn encode_unsigned(w: &mut Writer<'_>, value: u32) -> Result<usize, EncodeError> {
    let len = match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };
    for i in (0..len).rev() {
        w.write_u8(((value >> (i * 8)) & 0xFF) as u8)?;
    }
    Ok(len)
}

pub fn decode_unsigned(r: &mut Reader<'_>, len: usize) -> Result<u32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::BadLength);
    }
    let mut value = 0u32;
    for &b in r.read_exact(len)? {
        value = (value << 8) | b as u32;
    }
    Ok(value)
}

/// Encode the content octets of a signed value in two's complement,
/// shortest form that preserves the sign bit.
pub fn encode_signed(w: &mut Writer<'_>, value: i32) -> Result<usize, EncodeError> {
    let len = if (-0x80..=0x7F).contains(&value) {
        1
    } else if (-0x8000..=0x7FFF).contains(&value) {
        2
    } else if (-0x80_0000..=0x7F_FFFF).contains(&value) {
        3
    } else {
        4
    };
    let bytes = value.to_be_bytes();
    w.write_all(&bytes[4 - len..])?;
    Ok(len)
}

pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::BadLength);
    }
    let content = r.read_exact(len)?;
    let mut out = [0u8; 4];
    out[4 - len..].copy_from_slice(content);
    if (content[0] & 0x80) != 0 {
        for b in &mut out[..4 - len] {
            *b = 0xFF;
        }
    }
    Ok(i32::from_be_bytes(out))
}

fn unsigned_content_len(value: u32) -> u32 {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::UnsignedInt,
        len: unsigned_content_len(value),
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Enumerated,
        len: unsigned_content_len(value),
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_app_signed(w: &mut Writer<'_>, value: i32) -> Result<(), EncodeError> {
    let mut scratch = [0u8; 4];
    let mut sw = Writer::new(&mut scratch);
    let len = encode_signed(&mut sw, value)? as u32;
    Tag::Application {
        tag: AppTag::SignedInt,
        len,
    }
    .encode(w)?;
    w.write_all(&scratch[..len as usize])
}

pub fn encode_app_object_id(w: &mut Writer<'_>, object_id_raw: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(object_id_raw)
}

pub fn encode_app_character_string(w: &mut Writer<'_>, value: &str) -> Result<(), EncodeError> {
    let bytes = value.as_bytes();
    let len = u32::try_from(bytes.len() + 1).map_err(|_| EncodeError::ValueTooLarge)?;
    Tag::Application {
        tag: AppTag::CharacterString,
        len,
    }
    .encode(w)?;
    // Character set octet 0 = ANSI X3.4 / UTF-8 in this baseline.
    w.write_u8(0)?;
    w.write_all(bytes)
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::BadTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::BadTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::ObjectId,
            len: 4,
        } => r.read_be_u32(),
        _ => Err(DecodeError::BadTag),
    }
}

pub fn decode_app_character_string<'a>(r: &mut Reader<'a>) -> Result<&'a str, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::CharacterString,
            len,
        } => decode_character_string_content(r, len as usize),
        _ => Err(DecodeError::BadTag),
    }
}

pub fn encode_ctx_unsigned(w: &mut Writer<'_>, tag_num: u8, value: u32) -> Result<(), EncodeError> {
    Tag::Context {
        tag_num,
        len: unsigned_content_len(value),
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_ctx_object_id(
    w: &mut Writer<'_>,
    tag_num: u8,
    object_id_raw: u32,
) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_be_u32(object_id_raw)
}

pub fn encode_ctx_character_string(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: &str,
) -> Result<(), EncodeError> {
    let bytes = value.as_bytes();
    let len = u32::try_from(bytes.len() + 1).map_err(|_| EncodeError::ValueTooLarge)?;
    Tag::Context { tag_num, len }.encode(w)?;
    w.write_u8(0)?;
    w.write_all(bytes)
}

/// Decode character string content octets: one character-set octet (only
/// set 0 is supported) followed by the text.
pub fn decode_character_string_content<'a>(
    r: &mut Reader<'a>,
    len: usize,
) -> Result<&'a str, DecodeError> {
    if len == 0 {
        return Err(DecodeError::BadLength);
    }
    let raw = r.read_exact(len)?;
    if raw[0] != 0 {
        return Err(DecodeError::CharacterSet);
    }
    core::str::from_utf8(&raw[1..]).map_err(|_| DecodeError::BadValue)
}

pub fn encode_opening_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Opening { tag_num }.encode(w)
}

pub fn encode_closing_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Closing { tag_num }.encode(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unsigned_values_use_the_shortest_form() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        assert_eq!(encode_unsigned(&mut w, 0).unwrap(), 1);
        assert_eq!(encode_unsigned(&mut w, 0x1FF).unwrap(), 2);
        assert_eq!(encode_unsigned(&mut w, 0x10_0000).unwrap(), 3);
        assert_eq!(w.as_written(), &[0x00, 0x01, 0xFF, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn character_string_carries_the_charset_octet() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        encode_app_character_string(&mut w, "Temp1").unwrap();
        assert_eq!(w.as_written()[0], 0x75);
        assert_eq!(w.as_written()[1], 6);
        assert_eq!(w.as_written()[2], 0);
        let mut r = Reader::new(w.as_written());
        assert_eq!(decode_app_character_string(&mut r).unwrap(), "Temp1");
    }

    #[test]
    fn non_utf8_charset_is_refused() {
        // Charset octet 4 = UCS-2; not supported here.
        let mut r = Reader::new(&[4, 0x00, 0x41]);
        assert_eq!(
            decode_character_string_content(&mut r, 3).unwrap_err(),
            crate::DecodeError::CharacterSet
        );
    }

    proptest! {
        #[test]
        fn unsigned_roundtrips(value in any::<u32>()) {
            let mut buf = [0u8; 8];
            let mut w = Writer::new(&mut buf);
            let len = encode_unsigned(&mut w, value).unwrap();
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_unsigned(&mut r, len).unwrap(), value);
        }

        #[test]
        fn signed_roundtrips(value in any::<i32>()) {
            let mut buf = [0u8; 8];
            let mut w = Writer::new(&mut buf);
            let len = encode_signed(&mut w, value).unwrap();
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_signed(&mut r, len).unwrap(), value);
        }

        #[test]
        fn app_unsigned_roundtrips(value in any::<u32>()) {
            let mut buf = [0u8; 8];
            let mut w = Writer::new(&mut buf);
            encode_app_unsigned(&mut w, value).unwrap();
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_app_unsigned(&mut r).unwrap(), value);
        }
    }
}
