//! A BACnet responder device: answers ReadProperty and Who-Has from an
//! in-memory object table.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use bacnode_core::apdu::{ApduType, ConfirmedRequestHeader, UnconfirmedRequestHeader};
use bacnode_core::encoding::{reader::Reader, writer::Writer};
use bacnode_core::npdu::{MessagePriority, Npdu};
use bacnode_core::services::read_property::{ReadPropertyData, SERVICE_READ_PROPERTY};
use bacnode_core::services::who_has::SERVICE_WHO_HAS;
use bacnode_core::types::{DataValue, ObjectId, PropertyId, RejectReason};
use bacnode_link::{BipTransport, DataLink, DataLinkAddress, LinkError};
use bacnode_service::confirmed::{handle_read_property, ConfirmedServiceData};
use bacnode_service::outcome::encode_failure;
use bacnode_service::unconfirmed::handle_who_has;
use bacnode_service::{
    AccessError, ApplicationLink, CommunicationControl, ObjectAccess, Session, TransactionLayer,
    MAX_PDU,
};
use bacnode_tools::{parse_object_type, parse_property_name, OwnedValue};

#[derive(Parser, Debug)]
#[command(name = "bacnode-respond")]
struct Args {
    /// Device object instance number.
    #[arg(long)]
    instance: u32,
    /// Device object name.
    #[arg(long, default_value = "bacnode")]
    name: String,
    /// UDP address to bind.
    #[arg(long, default_value = "0.0.0.0:47808")]
    bind: SocketAddr,
    /// JSON object table to serve (see `demos/objects.json`).
    #[arg(long)]
    objects: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    #[serde(rename = "type")]
    object_type: String,
    instance: u32,
    name: String,
    #[serde(default)]
    properties: HashMap<String, OwnedValue>,
}

struct ObjectRecord {
    name: String,
    properties: HashMap<PropertyId, OwnedValue>,
}

struct ObjectTable {
    device_id: ObjectId,
    objects: HashMap<ObjectId, ObjectRecord>,
}

impl ObjectTable {
    fn new(instance: u32, device_name: String) -> Self {
        let device_id = ObjectId::device(instance);
        let mut objects = HashMap::new();
        objects.insert(
            device_id,
            ObjectRecord {
                name: device_name,
                properties: HashMap::new(),
            },
        );
        Self { device_id, objects }
    }

    fn load_entries(&mut self, entries: Vec<ObjectEntry>) -> Result<(), String> {
        for entry in entries {
            let object_type = parse_object_type(&entry.object_type)
                .ok_or_else(|| format!("unknown object type '{}'", entry.object_type))?;
            let mut properties = HashMap::new();
            for (key, value) in entry.properties {
                let property_id = parse_property_name(&key)
                    .ok_or_else(|| format!("unknown property '{key}'"))?;
                properties.insert(property_id, value);
            }
            self.objects.insert(
                ObjectId::new(object_type, entry.instance),
                ObjectRecord {
                    name: entry.name,
                    properties,
                },
            );
        }
        Ok(())
    }
}

impl ObjectAccess for ObjectTable {
    fn device_instance(&self) -> u32 {
        self.device_id.instance()
    }

    fn read_property(
        &self,
        request: &ReadPropertyData,
        out: &mut Writer<'_>,
    ) -> Result<usize, AccessError> {
        let record = self
            .objects
            .get(&request.object_id)
            .ok_or_else(AccessError::unknown_object)?;

        // The table holds scalar properties only.
        if request.array_index.is_some() {
            return Err(AccessError::Error {
                class: bacnode_core::types::ErrorClass::Property,
                code: bacnode_core::types::ErrorCode::InvalidArrayIndex,
            });
        }

        let value = match request.property_id {
            PropertyId::ObjectIdentifier => DataValue::ObjectId(request.object_id),
            PropertyId::ObjectName => DataValue::CharacterString(&record.name),
            PropertyId::ObjectType => {
                DataValue::Enumerated(request.object_id.object_type().to_u16() as u32)
            }
            other => record
                .properties
                .get(&other)
                .map(OwnedValue::as_data_value)
                .ok_or_else(AccessError::unknown_property)?,
        };

        value.encode(out).map_err(|_| AccessError::reply_too_large())?;
        Ok(out.position())
    }

    fn object_name(&self, object_id: ObjectId) -> Option<String> {
        self.objects.get(&object_id).map(|r| r.name.clone())
    }

    fn object_id_for_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(id, _)| *id)
    }
}

/// Single-attempt submit: encode the NPDU in front of the ack APDU and hand
/// the frame to the link once. Retry and invoke-id bookkeeping belong to a
/// full transaction state machine outside this tool.
struct DirectTransactions<'t> {
    transport: &'t BipTransport,
}

impl TransactionLayer for DirectTransactions<'_> {
    fn submit(
        &self,
        dest: DataLinkAddress,
        npdu: &Npdu,
        service_data: &ConfirmedServiceData,
        apdu: &[u8],
    ) -> usize {
        let mut buf = [0u8; MAX_PDU];
        let mut w = Writer::new(&mut buf);
        if npdu.encode(&mut w).and_then(|()| w.write_all(apdu)).is_err() {
            return 0;
        }
        match self.transport.try_send_frame(dest, w.as_written()) {
            Ok(sent) => sent,
            Err(e) => {
                log::warn!(
                    "submit of invoke id {} to {dest} failed: {e}",
                    service_data.invoke_id
                );
                0
            }
        }
    }
}

struct LinkAdapter<'t> {
    transport: &'t BipTransport,
    local: DataLinkAddress,
}

impl ApplicationLink for LinkAdapter<'_> {
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

fn dispatch_frame<O, T, L>(
    session: &Session<'_, O, T, L>,
    frame: &[u8],
    source: DataLinkAddress,
) where
    O: ObjectAccess,
    T: TransactionLayer,
    L: ApplicationLink,
{
    let mut r = Reader::new(frame);
    let npdu = match Npdu::decode(&mut r) {
        Ok(npdu) => npdu,
        Err(e) => {
            log::debug!("dropping frame from {source} with bad NPDU: {e}");
            return;
        }
    };
    if npdu.is_network_message() || r.is_empty() {
        return;
    }

    let apdu_type = match r.peek_u8().ok().and_then(|b| ApduType::from_u8(b >> 4)) {
        Some(t) => t,
        None => return,
    };

    match apdu_type {
        ApduType::ConfirmedRequest => {
            let header = match ConfirmedRequestHeader::decode(&mut r) {
                Ok(header) => header,
                Err(e) => {
                    log::debug!("dropping confirmed request from {source}: {e}");
                    return;
                }
            };
            let service_data = ConfirmedServiceData::from_header(&header);
            match header.service_choice {
                SERVICE_READ_PROPERTY => {
                    handle_read_property(session, r.take_rest(), source, &service_data);
                }
                other => {
                    log::debug!("rejecting unsupported confirmed service 0x{other:02x}");
                    reject_unrecognized(session, source, header.invoke_id);
                }
            }
        }
        ApduType::UnconfirmedRequest => {
            let header = match UnconfirmedRequestHeader::decode(&mut r) {
                Ok(header) => header,
                Err(_) => return,
            };
            if header.service_choice == SERVICE_WHO_HAS {
                handle_who_has(session, r.take_rest());
            }
        }
        // Replies and segment traffic belong to a client; a responder
        // ignores them.
        _ => {}
    }
}

fn reject_unrecognized<O, T, L>(
    session: &Session<'_, O, T, L>,
    source: DataLinkAddress,
    invoke_id: u8,
) where
    L: ApplicationLink,
{
    let npdu = Npdu::application(false, MessagePriority::Normal);
    let mut buf = [0u8; 32];
    let mut w = Writer::new(&mut buf);
    let reject = AccessError::Reject {
        reason: RejectReason::UnrecognizedService,
    };
    if npdu
        .encode(&mut w)
        .and_then(|()| encode_failure(&mut w, invoke_id, 0, &reject))
        .is_err()
    {
        return;
    }
    if let Err(e) = session.link.send_pdu(source, &npdu, w.as_written()) {
        log::warn!("reject to {source} failed: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut table = ObjectTable::new(args.instance, args.name);
    if let Some(path) = &args.objects {
        let entries: Vec<ObjectEntry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        table.load_entries(entries).map_err(std::io::Error::other)?;
    }
    log::info!(
        "serving {} object(s) as device {}",
        table.objects.len(),
        table.device_id.instance()
    );

    let transport = BipTransport::bind(args.bind).await?;
    let local = DataLinkAddress::Ip(transport.local_addr()?);
    let transactions = DirectTransactions {
        transport: &transport,
    };
    let link = LinkAdapter {
        transport: &transport,
        local,
    };
    let comm = CommunicationControl::new();
    let session = Session::new(&table, &transactions, &link, &comm);
    log::info!(
        "listening on {}, broadcasting to {}",
        session.link.local_address(),
        session.link.broadcast_address()
    );

    let mut buf = [0u8; MAX_PDU];
    loop {
        match transport.recv(&mut buf).await {
            Ok((n, source)) => dispatch_frame(&session, &buf[..n], source),
            Err(e) => log::debug!("receive error: {e}"),
        }
    }
}
