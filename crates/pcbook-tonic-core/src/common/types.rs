//! Protocol-level constants shared by client and server.

/// Largest image payload accepted by `UploadImage`, in bytes.
pub const MAX_IMAGE_SIZE: usize = 1 << 20;

/// Request header carrying the caller's deadline as a gRPC timeout.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";
