//! Service handler framework for BACnet responder devices.
//!
//! Every service a responder answers follows the same shape: decode a
//! tag-encoded request, ask the object layer to satisfy it, encode exactly
//! one outcome PDU (ComplexAck, Error, Reject, or Abort) inside the
//! negotiated size limits, and hand it off for transmission. Confirmed acks
//! go to a [`TransactionLayer`] that owns retries and invoke-id matching;
//! failure replies and unconfirmed broadcasts go straight to the
//! [`ApplicationLink`].
//!
//! [`confirmed::handle_read_property`] and [`unconfirmed::send_i_have`] are
//! the two ends of that framework: a confirmed request/reply exchange and a
//! fire-and-forget broadcast. Handlers never return errors to their caller;
//! every failure is resolved into a wire reply or a logged diagnostic.

/// The per-call transmit buffer.
pub mod buffer;
/// Confirmed service handling: request metadata and the ack/failure split.
pub mod confirmed;
/// The outcome model: failure classification and failure-PDU encoding.
pub mod outcome;
/// Contracts for the collaborators a handler borrows per call.
pub mod traits;
/// Unconfirmed service sending and the Who-Has responder.
pub mod unconfirmed;

pub use buffer::{TransmitBuffer, MAX_PDU};
pub use confirmed::ConfirmedServiceData;
pub use outcome::AccessError;
pub use traits::{ApplicationLink, CommunicationControl, ObjectAccess, Session, TransactionLayer};
