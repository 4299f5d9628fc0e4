//! Structured bodies for the PDU types whose payload isn't a varbind list
//! or search-range list (RFC 2741 §§6.1-6.2).

use crate::codec::{self, ByteOrder, decode_u32, decode_u8, encode_u32};
use crate::error::{AgentXError, Result};
use crate::oid::Oid;
use crate::pdu::CloseReason;

/// Open PDU body: a requested timeout plus the subagent's self-identifying
/// OID and description (RFC 2741 §6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBody {
    pub timeout: u8,
    pub id: Oid,
    pub descr: Vec<u8>,
}

impl OpenBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        buf.push(self.timeout);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        codec::encode_oid(buf, &self.id, false, order)?;
        codec::encode_octet_string(buf, &self.descr, order)?;
        Ok(())
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        let timeout = decode_u8(data, &mut pos)?;
        pos += 3;
        let id = codec::decode_oid(data, &mut pos, order)?;
        let descr = codec::decode_octet_string(data, &mut pos, order)?
            .as_bytes()
            .to_vec();
        Ok(Self { timeout, id, descr })
    }
}

/// Close PDU body: just the reason code (RFC 2741 §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseBody {
    pub reason: CloseReason,
}

impl CloseBody {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.reason as u8);
        buf.extend_from_slice(&[0, 0, 0]);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(AgentXError::protocol("Close PDU body is empty"));
        }
        let reason = CloseReason::try_from(data[0])
            .map_err(|v| AgentXError::protocol(format!("unknown close reason: {v}")))?;
        Ok(Self { reason })
    }
}

/// Register PDU body (RFC 2741 §6.3). `range_subid` and `upper_bound`
/// implement the "single MIB subtree with a varying last sub-identifier"
/// shorthand so a whole table column can be registered with one PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBody {
    pub timeout: u8,
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
}

impl RegisterBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        buf.push(self.timeout);
        buf.push(self.priority);
        buf.push(self.range_subid);
        buf.push(0);
        codec::encode_oid(buf, &self.subtree, false, order)?;
        if self.range_subid != 0 {
            let bound = self
                .upper_bound
                .ok_or_else(|| AgentXError::invalid("range_subid set but upper_bound missing"))?;
            encode_u32(buf, bound, order);
        }
        Ok(())
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        let timeout = decode_u8(data, &mut pos)?;
        let priority = decode_u8(data, &mut pos)?;
        let range_subid = decode_u8(data, &mut pos)?;
        pos += 1;
        let subtree = codec::decode_oid(data, &mut pos, order)?;
        let upper_bound = if range_subid != 0 {
            Some(decode_u32(data, &mut pos, order)?)
        } else {
            None
        };
        Ok(Self {
            timeout,
            priority,
            range_subid,
            subtree,
            upper_bound,
        })
    }
}

/// Unregister PDU body (RFC 2741 §6.4): same shape as register, minus the
/// timeout (unregistration has nothing to time out).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterBody {
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
}

impl UnregisterBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        buf.push(0);
        buf.push(self.priority);
        buf.push(self.range_subid);
        buf.push(0);
        codec::encode_oid(buf, &self.subtree, false, order)?;
        if self.range_subid != 0 {
            let bound = self
                .upper_bound
                .ok_or_else(|| AgentXError::invalid("range_subid set but upper_bound missing"))?;
            encode_u32(buf, bound, order);
        }
        Ok(())
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        pos += 1;
        let priority = decode_u8(data, &mut pos)?;
        let range_subid = decode_u8(data, &mut pos)?;
        pos += 1;
        let subtree = codec::decode_oid(data, &mut pos, order)?;
        let upper_bound = if range_subid != 0 {
            Some(decode_u32(data, &mut pos, order)?)
        } else {
            None
        };
        Ok(Self {
            priority,
            range_subid,
            subtree,
            upper_bound,
        })
    }
}

/// IndexAllocate / IndexDeallocate PDU body (RFC 2741 §§6.5-6.6): a plain
/// varbind list naming the index values to (de)allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBody {
    pub varbinds: Vec<crate::pdu::VarBind>,
}

impl IndexBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        for vb in &self.varbinds {
            vb.encode(buf, order)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        let end = data.len();
        let mut varbinds = Vec::new();
        while pos < end {
            varbinds.push(crate::pdu::VarBind::decode(data, &mut pos, order)?);
        }
        Ok(Self { varbinds })
    }
}

/// AddAgentCapabilities / RemoveAgentCapabilities PDU body (RFC 2741 §§6.7-6.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCapsBody {
    pub id: Oid,
    pub descr: Vec<u8>,
}

impl AgentCapsBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        codec::encode_oid(buf, &self.id, false, order)?;
        codec::encode_octet_string(buf, &self.descr, order)?;
        Ok(())
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        let id = codec::decode_oid(data, &mut pos, order)?;
        let descr = codec::decode_octet_string(data, &mut pos, order)?
            .as_bytes()
            .to_vec();
        Ok(Self { id, descr })
    }
}

/// RemoveAgentCapabilities carries only the OID; no description (RFC 2741
/// §6.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveAgentCapsBody {
    pub id: Oid,
}

impl RemoveAgentCapsBody {
    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        codec::encode_oid(buf, &self.id, false, order)
    }

    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        let mut pos = 0;
        let id = codec::decode_oid(data, &mut pos, order)?;
        Ok(Self { id })
    }
}
