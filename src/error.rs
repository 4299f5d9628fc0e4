//! Error types surfaced by the codec and session layers.

use std::io;

use thiserror::Error;

/// Every way a PDU build, encode, decode, or transport call can fail.
///
/// No variant here is recovered internally: every error reaches the caller
/// with the session's buffers left in a well-defined state (see the
/// invariants documented on [`crate::session::Session`]).
#[derive(Debug, Error)]
pub enum AgentXError {
    /// The caller supplied a parameter this crate cannot represent on the
    /// wire: an out-of-range flag bit, an OID longer than
    /// [`crate::oid::OID_MAX_LEN`], or similar.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A PDU builder or `transmit` was called while another builder's bytes
    /// were still staged.
    #[error("a PDU build is already in progress")]
    AlreadyInProgress,

    /// Non-blocking I/O made no progress; retry once the stream is ready.
    #[error("operation would block")]
    WouldBlock,

    /// The peer closed its end of the stream.
    #[error("connection reset by peer")]
    ConnectionReset,

    /// An inbound PDU violated the wire format.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A buffer or collection could not be grown to the size the wire data
    /// demanded.
    #[error("out of memory")]
    OutOfMemory,

    /// Any other underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AgentXError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        AgentXError::ProtocolError(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AgentXError::InvalidArgument(msg.into())
    }

    /// Maps a raw I/O result from a non-blocking stream, translating
    /// `ErrorKind::WouldBlock` into [`AgentXError::WouldBlock`] and a
    /// zero-byte read into [`AgentXError::ConnectionReset`] is handled by
    /// the caller, since only the caller knows whether `n == 0` means EOF.
    pub(crate) fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::WouldBlock {
            AgentXError::WouldBlock
        } else {
            AgentXError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentXError>;
