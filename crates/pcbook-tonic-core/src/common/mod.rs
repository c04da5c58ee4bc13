//! Shared protocol types used by the `pcbook` server and its clients.
//!
//! - [`proto`] - generated messages, service traits and the descriptor set.
//! - [`convert`] - wire <-> domain conversions.
//! - [`error`] - service error type and `tonic::Status` mapping.
//! - [`types`] - protocol constants.

pub mod convert;
pub mod error;
pub mod types;

pub mod proto {
    tonic::include_proto!("pcbook");
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("pcbook_descriptor");
}

pub use error::{Error, Result};
