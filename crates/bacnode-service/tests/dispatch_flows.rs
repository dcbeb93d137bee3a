//! End-to-end handler flows against recording fakes: one inbound request in,
//! at most one PDU out, through exactly one of the two transmission paths.

use std::cell::{Cell, RefCell};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bacnode_core::apdu::{AbortPdu, ComplexAckHeader, ErrorPdu, RejectPdu, UnconfirmedRequestHeader};
use bacnode_core::encoding::{reader::Reader, writer::Writer};
use bacnode_core::npdu::Npdu;
use bacnode_core::services::read_property::{ReadPropertyAck, ReadPropertyData, SERVICE_READ_PROPERTY};
use bacnode_core::services::who_has::{IHaveData, WhoHasRequest, WhoHasTarget, SERVICE_I_HAVE};
use bacnode_core::types::{
    AbortReason, DataValue, ErrorClass, ErrorCode, MaxApdu, ObjectId, ObjectType, PropertyId,
    RejectReason,
};
use bacnode_link::{DataLinkAddress, LinkError};
use bacnode_service::confirmed::{handle_read_property, ConfirmedServiceData};
use bacnode_service::unconfirmed::{handle_who_has, send_i_have};
use bacnode_service::{
    AccessError, ApplicationLink, CommunicationControl, ObjectAccess, Session, TransactionLayer,
};

enum FakeRead {
    Value(DataValue<'static>),
    Oversized(usize),
    Fail(AccessError),
}

struct FakeObjects {
    instance: u32,
    read: FakeRead,
    read_calls: Cell<usize>,
    window_caps: RefCell<Vec<usize>>,
    named_object: Option<(ObjectId, &'static str)>,
}

impl FakeObjects {
    fn answering(read: FakeRead) -> Self {
        Self {
            instance: 1001,
            read,
            read_calls: Cell::new(0),
            window_caps: RefCell::new(Vec::new()),
            named_object: Some((ObjectId::new(ObjectType::AnalogInput, 5), "Temp1")),
        }
    }
}

impl ObjectAccess for FakeObjects {
    fn device_instance(&self) -> u32 {
        self.instance
    }

    fn read_property(
        &self,
        _request: &ReadPropertyData,
        out: &mut Writer<'_>,
    ) -> Result<usize, AccessError> {
        self.read_calls.set(self.read_calls.get() + 1);
        self.window_caps.borrow_mut().push(out.capacity());
        match &self.read {
            FakeRead::Value(value) => {
                value
                    .encode(out)
                    .map_err(|_| AccessError::reply_too_large())?;
                Ok(out.position())
            }
            FakeRead::Oversized(len) => {
                for _ in 0..*len {
                    out.write_u8(0xAB).map_err(|_| AccessError::reply_too_large())?;
                }
                Ok(out.position())
            }
            FakeRead::Fail(failure) => Err(*failure),
        }
    }

    fn object_name(&self, object_id: ObjectId) -> Option<String> {
        self.named_object
            .filter(|(id, _)| *id == object_id)
            .map(|(_, name)| name.to_string())
    }

    fn object_id_for_name(&self, name: &str) -> Option<ObjectId> {
        self.named_object
            .filter(|(_, n)| *n == name)
            .map(|(id, _)| id)
    }
}

#[derive(Default)]
struct FakeTransactions {
    submitted: RefCell<Vec<(DataLinkAddress, ConfirmedServiceData, Vec<u8>)>>,
}

impl TransactionLayer for FakeTransactions {
    fn submit(
        &self,
        dest: DataLinkAddress,
        _npdu: &Npdu,
        service_data: &ConfirmedServiceData,
        apdu: &[u8],
    ) -> usize {
        self.submitted
            .borrow_mut()
            .push((dest, *service_data, apdu.to_vec()));
        apdu.len()
    }
}

#[derive(Default)]
struct FakeLink {
    sent: RefCell<Vec<(DataLinkAddress, Vec<u8>)>>,
}

impl ApplicationLink for FakeLink {
    fn send_pdu(
        &self,
        dest: DataLinkAddress,
        _npdu: &Npdu,
        pdu: &[u8],
    ) -> Result<usize, LinkError> {
        self.sent.borrow_mut().push((dest, pdu.to_vec()));
        Ok(pdu.len())
    }

    fn broadcast_address(&self) -> DataLinkAddress {
        DataLinkAddress::local_broadcast(DataLinkAddress::BACNET_IP_DEFAULT_PORT)
    }

    fn local_address(&self) -> DataLinkAddress {
        DataLinkAddress::Ip(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            DataLinkAddress::BACNET_IP_DEFAULT_PORT,
        ))
    }
}

fn requester() -> DataLinkAddress {
    DataLinkAddress::Ip(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 77)),
        DataLinkAddress::BACNET_IP_DEFAULT_PORT,
    ))
}

fn service_data(invoke_id: u8, max_apdu: MaxApdu) -> ConfirmedServiceData {
    ConfirmedServiceData {
        segmented: false,
        more_follows: false,
        segmented_response_accepted: false,
        max_apdu,
        invoke_id,
    }
}

fn encode_read_request(object_id: ObjectId, property_id: PropertyId) -> Vec<u8> {
    let mut buf = [0u8; 32];
    let mut w = Writer::new(&mut buf);
    ReadPropertyData {
        object_id,
        property_id,
        array_index: None,
    }
    .encode_service_request(&mut w)
    .unwrap();
    w.as_written().to_vec()
}

#[test]
fn success_submits_exactly_one_complex_ack_to_the_transaction_layer() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Real(72.5)));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::PresentValue,
    );
    handle_read_property(&session, &request, requester(), &service_data(7, MaxApdu::UpTo1476));

    let submitted = transactions.submitted.borrow();
    assert_eq!(submitted.len(), 1);
    assert!(link.sent.borrow().is_empty());
    assert_eq!(objects.read_calls.get(), 1);

    let (dest, data, apdu) = &submitted[0];
    assert_eq!(*dest, requester());
    assert_eq!(data.invoke_id, 7);

    // The ack decodes back into what the object layer produced; its length
    // is the header plus prologue plus payload plus the closing tag.
    let mut r = Reader::new(apdu);
    let header = ComplexAckHeader::decode(&mut r).unwrap();
    assert_eq!(header.invoke_id, 7);
    assert_eq!(header.service_choice, SERVICE_READ_PROPERTY);
    let ack = ReadPropertyAck::decode_after_header(&mut r).unwrap();
    assert_eq!(ack.value, DataValue::Real(72.5));
    assert!(r.is_empty());
    // header 3 + object id 5 + property id 2 + opening 1 + real 5 + closing 1
    assert_eq!(apdu.len(), 17);
}

#[test]
fn undecodable_request_rejects_without_consulting_the_object_layer() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    // An application tag where a context tag is required.
    handle_read_property(
        &session,
        &[0x91, 0x00],
        requester(),
        &service_data(3, MaxApdu::UpTo1476),
    );

    assert_eq!(objects.read_calls.get(), 0);
    assert!(transactions.submitted.borrow().is_empty());

    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    let (dest, pdu) = &sent[0];
    assert_eq!(*dest, requester());
    let mut r = Reader::new(pdu);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let reject = RejectPdu::decode(&mut r).unwrap();
    assert_eq!(reject.invoke_id, 3);
    assert_eq!(reject.reason, RejectReason::InvalidTag);
    assert!(r.is_empty());
}

#[test]
fn object_layer_abort_goes_directly_out_as_segmentation_not_supported() {
    let objects = FakeObjects::answering(FakeRead::Fail(AccessError::reply_too_large()));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::PresentValue,
    );
    handle_read_property(&session, &request, requester(), &service_data(9, MaxApdu::UpTo1476));

    assert!(transactions.submitted.borrow().is_empty());
    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);

    let mut r = Reader::new(&sent[0].1);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let abort = AbortPdu::decode(&mut r).unwrap();
    assert!(abort.server);
    assert_eq!(abort.invoke_id, 9);
    assert_eq!(abort.reason, AbortReason::SegmentationNotSupported);
}

#[test]
fn object_layer_error_carries_its_class_and_code_back() {
    let objects = FakeObjects::answering(FakeRead::Fail(AccessError::Error {
        class: ErrorClass::Property,
        code: ErrorCode::UnknownProperty,
    }));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::Proprietary(999),
    );
    handle_read_property(&session, &request, requester(), &service_data(4, MaxApdu::UpTo1476));

    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert!(transactions.submitted.borrow().is_empty());

    let mut r = Reader::new(&sent[0].1);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let error = ErrorPdu::decode(&mut r).unwrap();
    assert_eq!(error.invoke_id, 4);
    assert_eq!(error.service_choice, SERVICE_READ_PROPERTY);
    assert_eq!(error.error_class, ErrorClass::Property);
    assert_eq!(error.error_code, ErrorCode::UnknownProperty);
}

#[test]
fn segmented_request_is_aborted_before_object_access() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::PresentValue,
    );
    let mut data = service_data(5, MaxApdu::UpTo1476);
    data.segmented = true;
    handle_read_property(&session, &request, requester(), &data);

    assert_eq!(objects.read_calls.get(), 0);
    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    let mut r = Reader::new(&sent[0].1);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let abort = AbortPdu::decode(&mut r).unwrap();
    assert_eq!(abort.reason, AbortReason::SegmentationNotSupported);
}

#[test]
fn payload_window_respects_the_negotiated_maximum() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Unsigned(1)));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::PresentValue,
    );
    handle_read_property(&session, &request, requester(), &service_data(1, MaxApdu::UpTo50));

    // Ack header (3) plus echoed object id (5) and property id (2) plus the
    // opening tag (1) leaves 50 - 11 - 1 bytes for the value.
    assert_eq!(objects.window_caps.borrow().as_slice(), &[38]);
}

#[test]
fn value_larger_than_the_window_aborts_instead_of_overflowing() {
    let objects = FakeObjects::answering(FakeRead::Oversized(100));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let request = encode_read_request(
        ObjectId::new(ObjectType::AnalogInput, 5),
        PropertyId::PresentValue,
    );
    handle_read_property(&session, &request, requester(), &service_data(2, MaxApdu::UpTo50));

    assert!(transactions.submitted.borrow().is_empty());
    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    let mut r = Reader::new(&sent[0].1);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let abort = AbortPdu::decode(&mut r).unwrap();
    assert_eq!(abort.reason, AbortReason::SegmentationNotSupported);
}

#[test]
fn i_have_broadcasts_exactly_once_with_all_four_fields() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    send_i_have(&session, 1001, ObjectType::AnalogInput, 5, "Temp1");

    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    let (dest, pdu) = &sent[0];
    assert_eq!(*dest, link.broadcast_address());

    let mut r = Reader::new(pdu);
    let npdu = Npdu::decode(&mut r).unwrap();
    assert!(!npdu.expecting_reply());
    let header = UnconfirmedRequestHeader::decode(&mut r).unwrap();
    assert_eq!(header.service_choice, SERVICE_I_HAVE);
    let announcement = IHaveData::decode_after_header(&mut r).unwrap();
    assert_eq!(announcement.device_id, ObjectId::device(1001));
    assert_eq!(announcement.object_id, ObjectId::new(ObjectType::AnalogInput, 5));
    assert_eq!(announcement.object_name, "Temp1");
}

#[test]
fn disabled_communication_gate_suppresses_the_announcement() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    comm.set_enabled(false);
    let session = Session::new(&objects, &transactions, &link, &comm);

    send_i_have(&session, 1001, ObjectType::AnalogInput, 5, "Temp1");

    assert!(link.sent.borrow().is_empty());
}

#[test]
fn ack_encoding_at_an_offset_leaves_earlier_bytes_untouched() {
    use bacnode_core::services::read_property::encode_ack_epilogue;

    let mut buf = [0xEEu8; 50];
    let mut w = Writer::new(&mut buf);
    // Bytes 0..10 belong to an earlier layer of the frame.
    w.commit(10).unwrap();
    let start = w.position();

    ComplexAckHeader::simple(1, SERVICE_READ_PROPERTY)
        .encode(&mut w)
        .unwrap();
    let header_len = w.position() - start;

    let mut window = w.sub_window(4).unwrap();
    window.write_all(&[1, 2, 3, 4]).unwrap();
    let written = window.position();
    w.commit(written).unwrap();
    encode_ack_epilogue(&mut w).unwrap();

    assert_eq!(w.position() - start, header_len + 4 + 1);
    assert!(w.as_written()[..10].iter().all(|&b| b == 0xEE));
}

fn encode_who_has_body(request: &WhoHasRequest<'_>) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let mut w = Writer::new(&mut buf);
    request.encode(&mut w).unwrap();
    // Strip the unconfirmed header; handlers receive the service body.
    w.as_written()[2..].to_vec()
}

#[test]
fn who_has_by_name_answers_with_i_have() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let body = encode_who_has_body(&WhoHasRequest {
        low_limit: None,
        high_limit: None,
        target: WhoHasTarget::ObjectName("Temp1"),
    });
    handle_who_has(&session, &body);

    let sent = link.sent.borrow();
    assert_eq!(sent.len(), 1);
    let mut r = Reader::new(&sent[0].1);
    let _npdu = Npdu::decode(&mut r).unwrap();
    let _header = UnconfirmedRequestHeader::decode(&mut r).unwrap();
    let announcement = IHaveData::decode_after_header(&mut r).unwrap();
    assert_eq!(announcement.object_name, "Temp1");
}

#[test]
fn who_has_outside_the_instance_range_stays_silent() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let body = encode_who_has_body(&WhoHasRequest {
        low_limit: Some(1),
        high_limit: Some(100),
        target: WhoHasTarget::ObjectName("Temp1"),
    });
    handle_who_has(&session, &body);

    assert!(link.sent.borrow().is_empty());
}

#[test]
fn who_has_for_an_unknown_object_stays_silent() {
    let objects = FakeObjects::answering(FakeRead::Value(DataValue::Null));
    let transactions = FakeTransactions::default();
    let link = FakeLink::default();
    let comm = CommunicationControl::new();
    let session = Session::new(&objects, &transactions, &link, &comm);

    let body = encode_who_has_body(&WhoHasRequest {
        low_limit: None,
        high_limit: None,
        target: WhoHasTarget::ObjectName("NoSuchPoint"),
    });
    handle_who_has(&session, &body);

    assert!(link.sent.borrow().is_empty());
}
