use crate::encoding::{
    primitives::{decode_unsigned, encode_ctx_object_id, encode_ctx_unsigned},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};

pub const SERVICE_READ_PROPERTY: u8 = 0x0C;

/// Bytes to hold back from the ack payload window for the closing tag that
/// ends the property-value bracket.
pub const ACK_CLOSING_TAG_LEN: usize = 1;

/// Decoded ReadProperty service request: which property of which object, and
/// optionally which array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyData {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
}

impl ReadPropertyData {
    /// Decode the service body that follows a confirmed request header.
    pub fn decode_service_request(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let object_id = match Tag::decode(r)? {
            Tag::Context { tag_num: 0, len: 4 } => ObjectId::from_raw(r.read_be_u32()?),
            _ => return Err(DecodeError::BadTag),
        };
        let property_id = match Tag::decode(r)? {
            Tag::Context { tag_num: 1, len } => {
                PropertyId::from_u32(decode_unsigned(r, len as usize)?)
            }
            _ => return Err(DecodeError::BadTag),
        };
        let array_index = if r.is_empty() {
            None
        } else {
            match Tag::decode(r)? {
                Tag::Context { tag_num: 2, len } => Some(decode_unsigned(r, len as usize)?),
                _ => return Err(DecodeError::BadTag),
            }
        };
        Ok(Self {
            object_id,
            property_id,
            array_index,
        })
    }

    /// Encode the service body (the requesting side of the exchange).
    pub fn encode_service_request(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_ctx_object_id(w, 0, self.object_id.raw())?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        Ok(())
    }

    /// Write the ack body up to where the property value belongs: the echoed
    /// object/property/index fields and the opening bracket. The caller fills
    /// the value in place and finishes with [`encode_ack_epilogue`].
    pub fn encode_ack_prologue(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_ctx_object_id(w, 0, self.object_id.raw())?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        Tag::Opening { tag_num: 3 }.encode(w)
    }
}

/// Close the property-value bracket opened by
/// [`ReadPropertyData::encode_ack_prologue`].
pub fn encode_ack_epilogue(w: &mut Writer<'_>) -> Result<(), EncodeError> {
    Tag::Closing { tag_num: 3 }.encode(w)
}

/// A decoded ReadProperty ack, as the requesting side sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub value: DataValue<'a>,
}

impl<'a> ReadPropertyAck<'a> {
    pub fn decode_after_header(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let object_id = match Tag::decode(r)? {
            Tag::Context { tag_num: 0, len: 4 } => ObjectId::from_raw(r.read_be_u32()?),
            _ => return Err(DecodeError::BadTag),
        };
        let property_id = match Tag::decode(r)? {
            Tag::Context { tag_num: 1, len } => {
                PropertyId::from_u32(decode_unsigned(r, len as usize)?)
            }
            _ => return Err(DecodeError::BadTag),
        };

        let next = Tag::decode(r)?;
        let (array_index, value_open) = match next {
            Tag::Context { tag_num: 2, len } => {
                (Some(decode_unsigned(r, len as usize)?), Tag::decode(r)?)
            }
            other => (None, other),
        };
        if value_open != (Tag::Opening { tag_num: 3 }) {
            return Err(DecodeError::BadTag);
        }

        let value = DataValue::decode(r)?;

        match Tag::decode(r)? {
            Tag::Closing { tag_num: 3 } => {}
            _ => return Err(DecodeError::BadTag),
        }

        Ok(Self {
            object_id,
            property_id,
            array_index,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_ack_epilogue, ReadPropertyAck, ReadPropertyData};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{DataValue, ObjectId, ObjectType, PropertyId};
    use crate::DecodeError;

    #[test]
    fn service_request_roundtrips() {
        let data = ReadPropertyData {
            object_id: ObjectId::new(ObjectType::AnalogInput, 5),
            property_id: PropertyId::PresentValue,
            array_index: Some(2),
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        data.encode_service_request(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        assert_eq!(ReadPropertyData::decode_service_request(&mut r).unwrap(), data);
    }

    #[test]
    fn request_body_matches_known_frame() {
        let data = ReadPropertyData {
            object_id: ObjectId::new(ObjectType::Device, 123),
            property_id: PropertyId::ObjectName,
            array_index: None,
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        data.encode_service_request(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x0C, 0x02, 0x00, 0x00, 0x7B, 0x19, 0x4D]);
    }

    #[test]
    fn truncated_request_is_refused() {
        let mut r = Reader::new(&[0x0C, 0x02, 0x00]);
        assert_eq!(
            ReadPropertyData::decode_service_request(&mut r).unwrap_err(),
            DecodeError::Truncated
        );
    }

    #[test]
    fn ack_body_roundtrips_through_the_requesting_side() {
        let data = ReadPropertyData {
            object_id: ObjectId::new(ObjectType::AnalogInput, 1),
            property_id: PropertyId::PresentValue,
            array_index: None,
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        data.encode_ack_prologue(&mut w).unwrap();
        DataValue::Real(72.5).encode(&mut w).unwrap();
        encode_ack_epilogue(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let ack = ReadPropertyAck::decode_after_header(&mut r).unwrap();
        assert_eq!(ack.object_id, data.object_id);
        assert_eq!(ack.property_id, data.property_id);
        assert_eq!(ack.value, DataValue::Real(72.5));
    }
}
