use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_HEADER_LEN};
use crate::{DataLink, DataLinkAddress, LinkError};
use bacnode_core::encoding::{reader::Reader, writer::Writer};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

const MAX_BIP_FRAME_LEN: usize = 1600;

/// BACnet/IP transport over a UDP socket.
///
/// Wraps outbound NPDU frames in BVLC Original-Unicast / Original-Broadcast
/// headers and unwraps the inbound forms, including Forwarded-NPDU frames
/// relayed by a BBMD elsewhere on the internetwork.
#[derive(Debug, Clone)]
pub struct BipTransport {
    socket: Arc<UdpSocket>,
    broadcast: SocketAddr,
}

impl BipTransport {
    /// Bind to `bind_addr`, broadcasting to the limited broadcast address on
    /// the same port.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, LinkError> {
        let broadcast = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), bind_addr.port());
        Self::bind_with_broadcast(bind_addr, broadcast).await
    }

    /// Bind to `bind_addr` with an explicit (e.g. subnet-directed) broadcast
    /// address.
    pub async fn bind_with_broadcast(
        bind_addr: SocketAddr,
        broadcast: SocketAddr,
    ) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket: Arc::new(socket),
            broadcast,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        self.socket.local_addr().map_err(LinkError::Io)
    }

    /// The address outbound broadcasts are sent to.
    pub fn broadcast_address(&self) -> DataLinkAddress {
        DataLinkAddress::Ip(self.broadcast)
    }

    fn frame_into<'f>(
        frame: &'f mut [u8],
        function: BvlcFunction,
        payload: &[u8],
    ) -> Result<&'f [u8], LinkError> {
        let total_len = BVLC_HEADER_LEN
            .checked_add(payload.len())
            .ok_or(LinkError::FrameTooLarge)?;
        if total_len > frame.len() || total_len > usize::from(u16::MAX) {
            return Err(LinkError::FrameTooLarge);
        }
        let mut w = Writer::new(&mut *frame);
        BvlcHeader {
            function,
            length: total_len as u16,
        }
        .encode(&mut w)
        .map_err(|_| LinkError::InvalidFrame)?;
        w.write_all(payload).map_err(|_| LinkError::FrameTooLarge)?;
        Ok(&frame[..total_len])
    }

    fn bvlc_function_for(&self, address: DataLinkAddress) -> (BvlcFunction, SocketAddr) {
        if address.is_broadcast() {
            (BvlcFunction::OriginalBroadcastNpdu, address.as_socket_addr())
        } else {
            (BvlcFunction::OriginalUnicastNpdu, address.as_socket_addr())
        }
    }

    /// Synchronous, non-blocking send of a full NPDU frame.
    ///
    /// UDP sends complete without waiting, so service handlers that must not
    /// suspend use this for their direct replies. Returns the payload bytes
    /// handed to the link.
    pub fn try_send_frame(
        &self,
        address: DataLinkAddress,
        payload: &[u8],
    ) -> Result<usize, LinkError> {
        let (function, target) = self.bvlc_function_for(address);
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let framed = Self::frame_into(&mut frame, function, payload)?;
        match self.socket.try_send_to(framed, target) {
            Ok(sent) => Ok(sent.saturating_sub(BVLC_HEADER_LEN)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(LinkError::WouldBlock),
            Err(e) => Err(LinkError::Io(e)),
        }
    }
}

impl DataLink for BipTransport {
    async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), LinkError> {
        let (function, target) = self.bvlc_function_for(address);
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let framed = Self::frame_into(&mut frame, function, payload)?;
        self.socket.send_to(framed, target).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), LinkError> {
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let (n, src) = self.socket.recv_from(&mut frame).await?;
        let mut r = Reader::new(&frame[..n]);
        let header = BvlcHeader::decode(&mut r).map_err(|_| LinkError::InvalidFrame)?;
        let content_len = header.length as usize - BVLC_HEADER_LEN;

        match header.function {
            BvlcFunction::OriginalUnicastNpdu
            | BvlcFunction::OriginalBroadcastNpdu
            | BvlcFunction::DistributeBroadcastToNetwork => {
                let payload = r
                    .read_exact(content_len)
                    .map_err(|_| LinkError::InvalidFrame)?;
                if payload.len() > buf.len() {
                    return Err(LinkError::FrameTooLarge);
                }
                buf[..payload.len()].copy_from_slice(payload);
                Ok((payload.len(), DataLinkAddress::Ip(src)))
            }
            BvlcFunction::ForwardedNpdu => {
                // Six octets of originating address precede the NPDU.
                let forwarded = r
                    .read_exact(content_len)
                    .map_err(|_| LinkError::InvalidFrame)?;
                if forwarded.len() < 6 {
                    return Err(LinkError::InvalidFrame);
                }
                let origin_ip =
                    Ipv4Addr::new(forwarded[0], forwarded[1], forwarded[2], forwarded[3]);
                let origin_port = u16::from_be_bytes([forwarded[4], forwarded[5]]);
                let payload = &forwarded[6..];
                if payload.len() > buf.len() {
                    return Err(LinkError::FrameTooLarge);
                }
                buf[..payload.len()].copy_from_slice(payload);
                Ok((
                    payload.len(),
                    DataLinkAddress::Ip(SocketAddr::new(IpAddr::V4(origin_ip), origin_port)),
                ))
            }
            BvlcFunction::Unknown(v) => Err(LinkError::UnsupportedBvlcFunction(v)),
            _ => Err(LinkError::InvalidFrame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BipTransport;
    use crate::bip::bvlc::{BvlcFunction, BvlcHeader};
    use crate::{DataLink, DataLinkAddress};
    use bacnode_core::encoding::writer::Writer;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::net::UdpSocket;

    fn localhost_any() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn unicast_frames_roundtrip_between_transports() {
        let a = BipTransport::bind(localhost_any()).await.unwrap();
        let b = BipTransport::bind(localhost_any()).await.unwrap();

        let b_addr = DataLinkAddress::Ip(b.local_addr().unwrap());
        a.send(b_addr, &[0x01, 0x00, 0x10, 0x08]).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, src) = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x00, 0x10, 0x08]);
        assert_eq!(src, DataLinkAddress::Ip(a.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn try_send_frame_reaches_the_peer() {
        let a = BipTransport::bind(localhost_any()).await.unwrap();
        let b = BipTransport::bind(localhost_any()).await.unwrap();

        let sent = a
            .try_send_frame(DataLinkAddress::Ip(b.local_addr().unwrap()), &[1, 2, 3])
            .unwrap();
        assert_eq!(sent, 3);

        let mut buf = [0u8; 16];
        let (n, _) = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn forwarded_npdu_reports_the_original_source() {
        let transport = BipTransport::bind(localhost_any()).await.unwrap();
        let sender = UdpSocket::bind(localhost_any()).await.unwrap();

        let mut frame = [0u8; 64];
        let mut w = Writer::new(&mut frame);
        BvlcHeader {
            function: BvlcFunction::ForwardedNpdu,
            length: 4 + 6 + 3,
        }
        .encode(&mut w)
        .unwrap();
        w.write_all(&[10, 1, 2, 3]).unwrap();
        w.write_be_u16(47808).unwrap();
        w.write_all(&[1, 2, 3]).unwrap();

        sender
            .send_to(w.as_written(), transport.local_addr().unwrap())
            .await
            .unwrap();

        let mut out = [0u8; 16];
        let (n, src) = transport.recv(&mut out).await.unwrap();
        assert_eq!(&out[..n], &[1, 2, 3]);
        assert_eq!(
            src,
            DataLinkAddress::Ip(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
                47808
            ))
        );
    }
}
