use bacnode_core::encoding::writer::Writer;

/// Largest frame one handler invocation will transmit: the biggest BACnet/IP
/// APDU plus NPDU headroom.
pub const MAX_PDU: usize = 1500;

/// Transmit buffer for one outgoing message.
///
/// Stack-scoped to a single handler invocation and never shared: a handler
/// builds either its ack or its failure reply here, hands the written bytes
/// to the transmission path, and lets the buffer die with the call.
#[derive(Debug)]
pub struct TransmitBuffer {
    bytes: [u8; MAX_PDU],
}

impl TransmitBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_PDU],
        }
    }

    /// A fresh cursor over the whole buffer. Taking a new writer restarts at
    /// offset zero; the previous contents are dead.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer::new(&mut self.bytes)
    }
}

impl Default for TransmitBuffer {
    fn default() -> Self {
        Self::new()
    }
}
