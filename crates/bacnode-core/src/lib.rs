//! BACnet protocol encoding and decoding for responder devices, in pure Rust.
//!
//! `bacnode-core` provides zero-copy, `no_std`-compatible codecs for BACnet
//! NPDUs, APDU headers, and the service payloads a responding device decodes
//! and answers. It is the foundation of the bacnode crate family and can be
//! used standalone in embedded or constrained environments.
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`alloc`** (default) — enables decoders that allocate (constructed values).
//! - **`serde`** — derives `Serialize`/`Deserialize` on core types.
//! - **`defmt`** — derives `defmt::Format` for embedded logging.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// APDU (Application Protocol Data Unit) header codecs for requests and replies.
pub mod apdu;
/// Binary encoding primitives, the tag system, and the buffer cursors.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// NPDU (Network Protocol Data Unit) encoding and decoding.
pub mod npdu;
/// BACnet service request and reply codecs.
pub mod services;
/// Core BACnet data types: identifiers, data values, and status enums.
pub mod types;

pub use error::{DecodeError, EncodeError};
