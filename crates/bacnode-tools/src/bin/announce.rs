//! One-shot I-Have broadcast: announce a single object to the local network.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use bacnode_core::npdu::Npdu;
use bacnode_link::{BipTransport, DataLinkAddress, LinkError};
use bacnode_service::unconfirmed::send_i_have;
use bacnode_service::{ApplicationLink, CommunicationControl, Session};
use bacnode_tools::ObjectTypeArg;

#[derive(Parser, Debug)]
#[command(name = "bacnode-announce")]
struct Args {
    /// Announcing device's instance number.
    #[arg(long)]
    instance: u32,
    /// Type of the announced object.
    #[arg(long, value_enum)]
    object_type: ObjectTypeArg,
    /// Instance of the announced object.
    #[arg(long)]
    object_instance: u32,
    /// Name of the announced object.
    #[arg(long)]
    object_name: String,
    /// UDP address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: SocketAddr,
    /// Destination port for the broadcast.
    #[arg(long, default_value_t = DataLinkAddress::BACNET_IP_DEFAULT_PORT)]
    port: u16,
}

struct BroadcastLink<'t> {
    transport: &'t BipTransport,
    local: DataLinkAddress,
}

impl ApplicationLink for BroadcastLink<'_> {
    fn send_pdu(
        &self,
        dest: DataLinkAddress,
        _npdu: &Npdu,
        pdu: &[u8],
    ) -> Result<usize, LinkError> {
        self.transport.try_send_frame(dest, pdu)
    }

    fn broadcast_address(&self) -> DataLinkAddress {
        self.transport.broadcast_address()
    }

    fn local_address(&self) -> DataLinkAddress {
        self.local
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let broadcast = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), args.port);
    let transport = BipTransport::bind_with_broadcast(args.bind, broadcast).await?;
    let link = BroadcastLink {
        transport: &transport,
        local: DataLinkAddress::Ip(transport.local_addr()?),
    };
    let comm = CommunicationControl::new();
    let session = Session::new(&(), &(), &link, &comm);

    let object_type = args.object_type.clone().into_object_type();
    send_i_have(
        &session,
        args.instance,
        object_type,
        args.object_instance,
        &args.object_name,
    );
    println!(
        "announced {object_type:?},{} \"{}\" as device {}",
        args.object_instance, args.object_name, args.instance
    );
    Ok(())
}
