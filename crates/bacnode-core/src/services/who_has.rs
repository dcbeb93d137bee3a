use crate::apdu::UnconfirmedRequestHeader;
use crate::encoding::{
    primitives::{
        decode_app_character_string, decode_app_object_id, decode_character_string_content,
        decode_unsigned, encode_app_character_string, encode_app_object_id,
        encode_ctx_character_string, encode_ctx_object_id, encode_ctx_unsigned,
    },
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

pub const SERVICE_I_HAVE: u8 = 0x01;
pub const SERVICE_WHO_HAS: u8 = 0x07;

/// The object a Who-Has asks after: by identifier or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhoHasTarget<'a> {
    ObjectId(ObjectId),
    ObjectName(&'a str),
}

/// Decoded Who-Has service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoHasRequest<'a> {
    pub low_limit: Option<u32>,
    pub high_limit: Option<u32>,
    pub target: WhoHasTarget<'a>,
}

impl<'a> WhoHasRequest<'a> {
    /// Decode the service body that follows an unconfirmed request header.
    pub fn decode_service_request(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let mut low_limit = None;
        let mut high_limit = None;

        let mut tag = Tag::decode(r)?;
        if let Tag::Context { tag_num: 0, len } = tag {
            low_limit = Some(decode_unsigned(r, len as usize)?);
            match Tag::decode(r)? {
                Tag::Context { tag_num: 1, len } => {
                    high_limit = Some(decode_unsigned(r, len as usize)?);
                }
                // A low limit without a high limit is not a valid range.
                _ => return Err(DecodeError::BadTag),
            }
            tag = Tag::decode(r)?;
        }

        let target = match tag {
            Tag::Context { tag_num: 2, len: 4 } => {
                WhoHasTarget::ObjectId(ObjectId::from_raw(r.read_be_u32()?))
            }
            Tag::Context { tag_num: 3, len } => {
                WhoHasTarget::ObjectName(decode_character_string_content(r, len as usize)?)
            }
            _ => return Err(DecodeError::BadTag),
        };

        Ok(Self {
            low_limit,
            high_limit,
            target,
        })
    }

    /// Encode the full request including the unconfirmed header (the asking
    /// side of the exchange).
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        UnconfirmedRequestHeader {
            service_choice: SERVICE_WHO_HAS,
        }
        .encode(w)?;

        match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => {
                encode_ctx_unsigned(w, 0, low)?;
                encode_ctx_unsigned(w, 1, high)?;
            }
            (None, None) => {}
            _ => {
                return Err(EncodeError::Message(
                    "device instance limits must be both set or absent",
                ))
            }
        }

        match self.target {
            WhoHasTarget::ObjectId(object_id) => encode_ctx_object_id(w, 2, object_id.raw()),
            WhoHasTarget::ObjectName(name) => encode_ctx_character_string(w, 3, name),
        }
    }

    /// Whether a responder with the given device instance falls inside the
    /// request's optional range. An absent range matches every device.
    pub fn matches_instance(&self, instance: u32) -> bool {
        match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => instance >= low && instance <= high,
            _ => true,
        }
    }
}

/// The I-Have announcement a responder broadcasts when a Who-Has matches one
/// of its objects, or on its own initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IHaveData<'a> {
    pub device_id: ObjectId,
    pub object_id: ObjectId,
    pub object_name: &'a str,
}

impl<'a> IHaveData<'a> {
    /// Encode the full announcement including the unconfirmed header.
    /// All three fields are application-tagged.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        UnconfirmedRequestHeader {
            service_choice: SERVICE_I_HAVE,
        }
        .encode(w)?;
        encode_app_object_id(w, self.device_id.raw())?;
        encode_app_object_id(w, self.object_id.raw())?;
        encode_app_character_string(w, self.object_name)
    }

    pub fn decode_after_header(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            device_id: ObjectId::from_raw(decode_app_object_id(r)?),
            object_id: ObjectId::from_raw(decode_app_object_id(r)?),
            object_name: decode_app_character_string(r)?,
        })
    }
}
