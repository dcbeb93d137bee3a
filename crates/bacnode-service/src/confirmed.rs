use bacnode_core::apdu::{ComplexAckHeader, ConfirmedRequestHeader};
use bacnode_core::encoding::{reader::Reader, writer::Writer};
use bacnode_core::npdu::{MessagePriority, Npdu};
use bacnode_core::services::read_property::{
    encode_ack_epilogue, ReadPropertyData, ACK_CLOSING_TAG_LEN, SERVICE_READ_PROPERTY,
};
use bacnode_core::types::{AbortReason, MaxApdu};
use bacnode_core::EncodeError;
use bacnode_link::DataLinkAddress;
use log::{debug, error, trace};

use crate::buffer::TransmitBuffer;
use crate::outcome::{encode_failure, AccessError};
use crate::traits::{ApplicationLink, ObjectAccess, Session, TransactionLayer};

/// Metadata of one inbound confirmed request, decoded from its APDU header
/// by the dispatcher and threaded through unchanged to the transaction
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedServiceData {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    pub max_apdu: MaxApdu,
    pub invoke_id: u8,
}

impl ConfirmedServiceData {
    pub const fn from_header(header: &ConfirmedRequestHeader) -> Self {
        Self {
            segmented: header.segmented,
            more_follows: header.more_follows,
            segmented_response_accepted: header.segmented_response_accepted,
            max_apdu: header.max_apdu,
            invoke_id: header.invoke_id,
        }
    }
}

/// The shape every confirmed service handler shares.
///
/// `build_ack` encodes the complete ack APDU into the transmit buffer or
/// classifies why it cannot. On success the APDU goes to the transaction
/// layer, which owns retries from there. On failure the ack attempt is
/// abandoned and the same buffer is re-rendered as NPDU plus exactly one
/// failure reply, sent once directly back to the requester; failure
/// replies are not retried or tracked.
///
/// Exactly one PDU leaves per invocation, through exactly one of the two
/// exits, and nothing propagates to the caller: every failure ends here as
/// a wire reply or a logged diagnostic.
pub fn respond_confirmed<O, T, L>(
    session: &Session<'_, O, T, L>,
    src: DataLinkAddress,
    service_data: &ConfirmedServiceData,
    service_choice: u8,
    build_ack: impl FnOnce(&O, &mut Writer<'_>) -> Result<(), AccessError>,
) where
    O: ObjectAccess,
    T: TransactionLayer,
    L: ApplicationLink,
{
    let reply_npdu = Npdu::application(false, MessagePriority::Normal);
    let mut buffer = TransmitBuffer::new();
    let mut w = buffer.writer();

    let failure = match build_ack(session.objects, &mut w) {
        Ok(()) => {
            let queued = session
                .transactions
                .submit(src, &reply_npdu, service_data, w.as_written());
            if queued == 0 {
                error!(
                    "confirmed service 0x{service_choice:02x}: transaction layer queued \
                     nothing for invoke id {}",
                    service_data.invoke_id
                );
            } else {
                trace!(
                    "confirmed service 0x{service_choice:02x}: {queued} byte ack queued \
                     for invoke id {}",
                    service_data.invoke_id
                );
            }
            return;
        }
        Err(failure) => failure,
    };

    debug!(
        "confirmed service 0x{service_choice:02x}: answering invoke id {} with {failure:?}",
        service_data.invoke_id
    );

    // The abandoned ack attempt is overwritten in place; the failure reply
    // carries its own NPDU since it goes out directly.
    let encoded = w
        .rewind_to(0)
        .and_then(|()| reply_npdu.encode(&mut w))
        .and_then(|()| encode_failure(&mut w, service_data.invoke_id, service_choice, &failure));
    if let Err(e) = encoded {
        error!("confirmed service 0x{service_choice:02x}: failure reply not encodable: {e}");
        return;
    }

    match session.link.send_pdu(src, &reply_npdu, w.as_written()) {
        Ok(sent) if sent > 0 => {}
        Ok(_) => error!("confirmed service 0x{service_choice:02x}: failure reply to {src} not sent"),
        Err(e) => error!("confirmed service 0x{service_choice:02x}: failed to send failure reply to {src}: {e}"),
    }
}

/// Answer a ReadProperty request.
///
/// Decode failures reject the request before the object layer is consulted;
/// a segmented request is aborted outright since nothing here reassembles
/// segments. Otherwise the ack header and echoed request fields are
/// reserved in the buffer, the object layer fills the value into the
/// remaining bounded window, and the closing bracket completes the APDU.
pub fn handle_read_property<O, T, L>(
    session: &Session<'_, O, T, L>,
    service_request: &[u8],
    src: DataLinkAddress,
    service_data: &ConfirmedServiceData,
) where
    O: ObjectAccess,
    T: TransactionLayer,
    L: ApplicationLink,
{
    respond_confirmed(
        session,
        src,
        service_data,
        SERVICE_READ_PROPERTY,
        |objects, w| {
            let mut r = Reader::new(service_request);
            let request = ReadPropertyData::decode_service_request(&mut r)?;

            if service_data.segmented {
                return Err(AccessError::Abort {
                    reason: Some(AbortReason::SegmentationNotSupported),
                });
            }

            ComplexAckHeader::simple(service_data.invoke_id, SERVICE_READ_PROPERTY)
                .encode(w)
                .map_err(overflow)?;
            request.encode_ack_prologue(w).map_err(overflow)?;

            let window_len = payload_window_len(w, service_data.max_apdu);
            let mut window = w.sub_window(window_len).map_err(overflow)?;
            let written = objects.read_property(&request, &mut window)?;
            w.commit(written).map_err(overflow)?;
            encode_ack_epilogue(w).map_err(overflow)?;
            Ok(())
        },
    );
}

/// Space the object layer may fill: what is left in the buffer less the
/// closing tag, and never more than the negotiated maximum APDU size leaves
/// for the value. This cap is what keeps an arbitrarily large property
/// value from overrunning the buffer or forcing a segmented reply.
fn payload_window_len(w: &Writer<'_>, max_apdu: MaxApdu) -> usize {
    let by_buffer = w.remaining().saturating_sub(ACK_CLOSING_TAG_LEN);
    let by_negotiation = max_apdu
        .decoded_len()
        .saturating_sub(w.position() + ACK_CLOSING_TAG_LEN);
    by_buffer.min(by_negotiation)
}

const fn overflow(_: EncodeError) -> AccessError {
    AccessError::reply_too_large()
}
