/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors produced by the inventory, rating and blob stores.
///
/// Each variant belongs to exactly one [`ErrorKind`], which is what protocol
/// layers use to pick a status code.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A caller-supplied laptop ID is not a well-formed UUID.
    #[error("laptop ID {id:?} is not a valid UUID: {reason}")]
    InvalidId { id: String, reason: String },

    /// An operation referenced a laptop that must already exist but doesn't.
    #[error("laptop {id} doesn't exist")]
    UnknownLaptop { id: String },

    /// A laptop with the same ID is already stored.
    #[error("laptop {id} already exists")]
    AlreadyExists { id: String },

    /// An uploaded payload grew past the configured ceiling.
    #[error("image is too large: {size} > {limit}")]
    TooLarge { size: usize, limit: usize },

    /// A rating referenced a laptop that isn't in the store.
    #[error("laptop {id} is not found")]
    NotFound { id: String },

    /// The caller cancelled the call.
    #[error("request is cancelled")]
    Cancelled,

    /// The caller's deadline passed before the call finished.
    #[error("deadline is exceeded")]
    DeadlineExceeded,

    /// Persistence or I/O failed.
    #[error("storage error: {context}")]
    Storage { context: String },
}

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    ResourceLimit,
    NotFound,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidId { .. } | Self::UnknownLaptop { .. } => ErrorKind::Validation,
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::TooLarge { .. } => ErrorKind::ResourceLimit,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Storage { .. } => ErrorKind::Internal,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            context: err.to_string(),
        }
    }
}
