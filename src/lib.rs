//! Client-side codec and transport helper for the AgentX subagent protocol
//! (RFC 2741): a binary, session-oriented protocol by which a subagent
//! registers MIB subtrees with a master SNMP agent and answers
//! Get/GetNext/GetBulk/Set requests.
//!
//! This crate covers the wire codec and the non-blocking, single-threaded
//! [`Session`](session::Session) state machine around it. It does not open
//! sockets, run an event loop, or maintain a MIB object registry — callers
//! hand it an already-connected `Read + Write` stream and drive
//! [`Session::receive`](session::Session::receive) /
//! [`Session::transmit`](session::Session::transmit) from their own
//! readiness loop.

pub mod codec;
pub mod diag;
pub mod error;
pub mod oid;
pub mod pdu;
pub mod session;
pub mod types;

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{AgentXError, Result};
pub use oid::Oid;
pub use session::Session;
