//! Error types for the laptop service.
//!
//! This module defines the central `Error` enum covering every reportable
//! failure of a call, and implements `From<Error>` for `tonic::Status` so
//! handlers can propagate with `?`.
//!
//! ## Error Cases
//! - `Store`: A domain error from the inventory, rating or blob stores.
//! - `ChannelError`: An internal communication failure between the tasks
//!   serving one call (e.g. the response stream was dropped).
//! - `InvalidRequest`: The client request was malformed.
//! - `Transport`: Receiving from the client's inbound stream failed.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use pcbook::ErrorKind;
use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the laptop service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] pcbook::Error),

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The client request was malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The inbound stream yielded an error status.
    #[error("Cannot receive stream request: {0}")]
    Transport(Status),

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(e) => {
                let message = e.to_string();
                match e.kind() {
                    // Oversize uploads share INVALID_ARGUMENT with other
                    // validation failures on the wire.
                    ErrorKind::Validation | ErrorKind::ResourceLimit => {
                        Status::invalid_argument(message)
                    }
                    ErrorKind::Conflict => Status::already_exists(message),
                    ErrorKind::NotFound => Status::not_found(message),
                    ErrorKind::Cancelled => Status::cancelled(message),
                    ErrorKind::DeadlineExceeded => Status::deadline_exceeded(message),
                    ErrorKind::Internal => Status::internal(message),
                }
            }
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::Transport(status) => Status::unknown(format!(
                "Cannot receive stream request: {}",
                status.message()
            )),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
