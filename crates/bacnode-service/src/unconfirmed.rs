use bacnode_core::encoding::reader::Reader;
use bacnode_core::npdu::{MessagePriority, Npdu};
use bacnode_core::services::who_has::{IHaveData, WhoHasRequest, WhoHasTarget};
use bacnode_core::types::{ObjectId, ObjectType};
use log::{debug, error, trace};

use crate::buffer::TransmitBuffer;
use crate::traits::{ApplicationLink, ObjectAccess, Session};

/// Broadcast an I-Have announcement for one object.
///
/// Unconfirmed services have no delivery guarantee: the announcement is
/// encoded and sent at most once, a send failure is a logged diagnostic and
/// nothing more, and while the communication gate is disabled the call is a
/// silent no-op that encodes nothing.
pub fn send_i_have<O, T, L>(
    session: &Session<'_, O, T, L>,
    device_instance: u32,
    object_type: ObjectType,
    object_instance: u32,
    object_name: &str,
) where
    L: ApplicationLink,
{
    if !session.comm.is_enabled() {
        trace!("i-have: communication disabled, suppressing announcement");
        return;
    }

    // Replies to Who-Has go to everyone, not just the asker.
    let dest = session.link.broadcast_address();
    let npdu = Npdu::application(false, MessagePriority::Normal);
    let announcement = IHaveData {
        device_id: ObjectId::device(device_instance),
        object_id: ObjectId::new(object_type, object_instance),
        object_name,
    };

    let mut buffer = TransmitBuffer::new();
    let mut w = buffer.writer();
    if let Err(e) = npdu.encode(&mut w).and_then(|()| announcement.encode(&mut w)) {
        error!("i-have: announcement not encodable: {e}");
        return;
    }

    match session.link.send_pdu(dest, &npdu, w.as_written()) {
        Ok(sent) if sent > 0 => {}
        Ok(_) => error!("i-have: broadcast to {dest} not sent"),
        Err(e) => error!("i-have: failed to send broadcast to {dest}: {e}"),
    }
}

/// Answer a Who-Has request with an I-Have broadcast when this responder
/// has the asked-for object.
///
/// A malformed request, a device-instance range that excludes this node, or
/// an object it does not have all end the call silently: an unconfirmed
/// exchange has no failure reply to send.
pub fn handle_who_has<O, T, L>(session: &Session<'_, O, T, L>, service_request: &[u8])
where
    O: ObjectAccess,
    L: ApplicationLink,
{
    let mut r = Reader::new(service_request);
    let request = match WhoHasRequest::decode_service_request(&mut r) {
        Ok(request) => request,
        Err(e) => {
            debug!("who-has: dropping undecodable request: {e}");
            return;
        }
    };

    let device_instance = session.objects.device_instance();
    if !request.matches_instance(device_instance) {
        return;
    }

    match request.target {
        WhoHasTarget::ObjectId(object_id) => {
            if let Some(name) = session.objects.object_name(object_id) {
                send_i_have(
                    session,
                    device_instance,
                    object_id.object_type(),
                    object_id.instance(),
                    &name,
                );
            }
        }
        WhoHasTarget::ObjectName(name) => {
            if let Some(object_id) = session.objects.object_id_for_name(name) {
                send_i_have(
                    session,
                    device_instance,
                    object_id.object_type(),
                    object_id.instance(),
                    name,
                );
            }
        }
    }
}
