/// BACnet Virtual Link Control framing for BACnet/IP.
pub mod bvlc;
/// UDP transport implementing [`DataLink`](crate::DataLink).
pub mod transport;
