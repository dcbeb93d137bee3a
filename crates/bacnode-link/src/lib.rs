#![allow(async_fn_in_trait)]

pub mod address;
pub mod bip;
pub mod traits;

pub use address::DataLinkAddress;
pub use bip::transport::BipTransport;
pub use traits::{DataLink, LinkError};
