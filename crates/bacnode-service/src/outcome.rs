use bacnode_core::apdu::{AbortPdu, ErrorPdu, RejectPdu};
use bacnode_core::encoding::writer::Writer;
use bacnode_core::types::{AbortReason, ErrorClass, ErrorCode, RejectReason};
use bacnode_core::{DecodeError, EncodeError};

/// Why a confirmed service could not be answered with its ack.
///
/// Exactly one variant is active per request, and each maps to exactly one
/// failure reply PDU. The compiler enforces exhaustive handling where the
/// original protocol stacks multiplex these through negative status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// The exchange cannot be completed, typically because the reply does
    /// not fit in one unsegmented PDU. An accessor that knows the precise
    /// cause states it; `None` is reported on the wire as
    /// segmentation-not-supported, the dominant cause of unclassified
    /// aborts at this layer. That default is a deliberate approximation
    /// carried over from field behavior, not a guarantee about the cause.
    Abort { reason: Option<AbortReason> },
    /// The request was well-formed but cannot be satisfied; the class/code
    /// pair travels back in the Error reply.
    Error { class: ErrorClass, code: ErrorCode },
    /// The request body itself was malformed.
    Reject { reason: RejectReason },
}

impl AccessError {
    /// The reply outgrew the space it was given.
    pub const fn reply_too_large() -> Self {
        Self::Abort { reason: None }
    }

    pub const fn unknown_object() -> Self {
        Self::Error {
            class: ErrorClass::Object,
            code: ErrorCode::UnknownObject,
        }
    }

    pub const fn unknown_property() -> Self {
        Self::Error {
            class: ErrorClass::Property,
            code: ErrorCode::UnknownProperty,
        }
    }
}

impl From<DecodeError> for AccessError {
    /// A request that does not decode is rejected, with the reason derived
    /// from what the decoder tripped over.
    fn from(error: DecodeError) -> Self {
        Self::Reject {
            reason: RejectReason::from_decode_error(error),
        }
    }
}

/// Encode exactly one failure reply APDU at the writer's position and return
/// the bytes written. An error here is terminal for the response: the caller
/// sends nothing and logs the diagnostic.
pub fn encode_failure(
    w: &mut Writer<'_>,
    invoke_id: u8,
    service_choice: u8,
    failure: &AccessError,
) -> Result<usize, EncodeError> {
    let start = w.position();
    match *failure {
        AccessError::Abort { reason } => AbortPdu {
            server: true,
            invoke_id,
            reason: reason.unwrap_or(AbortReason::SegmentationNotSupported),
        }
        .encode(w)?,
        AccessError::Error { class, code } => ErrorPdu {
            invoke_id,
            service_choice,
            error_class: class,
            error_code: code,
        }
        .encode(w)?,
        AccessError::Reject { reason } => RejectPdu { invoke_id, reason }.encode(w)?,
    }
    Ok(w.position() - start)
}
