use crate::DataLinkAddress;
use thiserror::Error;

/// Errors that can occur at the data-link layer.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("unsupported BVLC function 0x{0:02x}")]
    UnsupportedBvlcFunction(u8),
    #[error("send would block")]
    WouldBlock,
}

/// Async trait for moving raw BACnet frames over a physical link.
///
/// [`BipTransport`](crate::BipTransport) implements this for BACnet/IP over
/// UDP; a receive loop drives `recv` and hands decoded frames to the service
/// layer.
pub trait DataLink: Send + Sync {
    /// Sends `payload` (a full NPDU + APDU frame) to `address`.
    async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), LinkError>;

    /// Receives a frame into `buf`, returning `(bytes_read, source_address)`.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), LinkError>;
}
