use bacnode_core::encoding::writer::Writer;
use bacnode_core::npdu::Npdu;
use bacnode_core::services::read_property::ReadPropertyData;
use bacnode_core::types::ObjectId;
use bacnode_link::{DataLinkAddress, LinkError};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::confirmed::ConfirmedServiceData;
use crate::outcome::AccessError;

/// The object database a responder answers from.
///
/// `read_property` receives a writer already capped to the space the reply
/// has left; writing past it fails, which is how oversized property values
/// surface as capacity failures instead of buffer overruns.
pub trait ObjectAccess {
    /// Instance number of this responder's device object.
    fn device_instance(&self) -> u32;

    /// Write the application-tagged value of the requested property into
    /// `out` and return the number of bytes written.
    fn read_property(
        &self,
        request: &ReadPropertyData,
        out: &mut Writer<'_>,
    ) -> Result<usize, AccessError>;

    /// Name of the given object, if this responder has it.
    fn object_name(&self, object_id: ObjectId) -> Option<String>;

    /// Identifier of the object with the given name, if this responder has it.
    fn object_id_for_name(&self, name: &str) -> Option<ObjectId>;
}

/// Owns retry, timeout, and invoke-id bookkeeping for confirmed replies.
///
/// The handler hands over a fully encoded ack APDU together with the NPDU
/// metadata and the request metadata the retry logic needs; the call must
/// not block on network I/O. Returns the bytes queued for transmission;
/// zero means the reply was dropped.
pub trait TransactionLayer {
    fn submit(
        &self,
        dest: DataLinkAddress,
        npdu: &Npdu,
        service_data: &ConfirmedServiceData,
        apdu: &[u8],
    ) -> usize;
}

/// The data link as the service layer sees it: synchronous, non-blocking,
/// one frame per call.
///
/// `npdu` restates the metadata already encoded at the front of `pdu`; links
/// that queue by priority read it, others ignore it.
pub trait ApplicationLink {
    /// Send a full NPDU+APDU frame directly, bypassing transaction tracking.
    /// Returns the bytes handed to the link.
    fn send_pdu(
        &self,
        dest: DataLinkAddress,
        npdu: &Npdu,
        pdu: &[u8],
    ) -> Result<usize, LinkError>;

    /// Where unconfirmed broadcasts go.
    fn broadcast_address(&self) -> DataLinkAddress;

    /// This node's own address.
    fn local_address(&self) -> DataLinkAddress;
}

/// Process-wide communication-enable gate.
///
/// Read by every sender before encoding anything; flipped only by the
/// device-communication-control machinery outside this layer. While
/// disabled, senders suppress their traffic silently.
#[derive(Debug)]
pub struct CommunicationControl {
    enabled: AtomicBool,
}

impl CommunicationControl {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for CommunicationControl {
    fn default() -> Self {
        Self::new()
    }
}

/// The collaborators one handler invocation borrows.
///
/// Nothing here is owned: the session is assembled by the dispatcher from
/// process-wide state and lives for the duration of one call.
pub struct Session<'a, O, T, L> {
    pub objects: &'a O,
    pub transactions: &'a T,
    pub link: &'a L,
    pub comm: &'a CommunicationControl,
}

impl<'a, O, T, L> Session<'a, O, T, L> {
    pub fn new(
        objects: &'a O,
        transactions: &'a T,
        link: &'a L,
        comm: &'a CommunicationControl,
    ) -> Self {
        Self {
            objects,
            transactions,
            link,
            comm,
        }
    }
}

impl<O, T, L> Clone for Session<'_, O, T, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T, L> Copy for Session<'_, O, T, L> {}
