//! PDU framing: the fixed 20-byte header, flags, varbinds, search ranges,
//! and the tagged-union decoded PDU body.

pub mod bodies;

use crate::codec::{
    self, ByteOrder, OctetString, decode_oid, decode_u16, decode_u32, decode_u64, encode_oid,
    encode_u16, encode_u32,
};
use crate::error::{AgentXError, Result};
use crate::oid::Oid;
use crate::types::{Value, ValueType};

pub const HEADER_SIZE: usize = 20;
pub const AGENTX_VERSION: u8 = 1;

bitflags::bitflags! {
    /// Header byte 2 (RFC 2741 §7.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const INSTANCE_REGISTRATION = 0x01;
        const NEW_INDEX             = 0x02;
        const ANY_INDEX             = 0x04;
        const NON_DEFAULT_CONTEXT   = 0x08;
        const NETWORK_BYTE_ORDER    = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    Open = 1,
    Close = 2,
    Register = 3,
    Unregister = 4,
    Get = 5,
    GetNext = 6,
    GetBulk = 7,
    TestSet = 8,
    CommitSet = 9,
    UndoSet = 10,
    CleanupSet = 11,
    Notify = 12,
    Ping = 13,
    IndexAllocate = 14,
    IndexDeallocate = 15,
    AddAgentCaps = 16,
    RemoveAgentCaps = 17,
    Response = 18,
}

impl TryFrom<u8> for PduType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        Ok(match value {
            1 => PduType::Open,
            2 => PduType::Close,
            3 => PduType::Register,
            4 => PduType::Unregister,
            5 => PduType::Get,
            6 => PduType::GetNext,
            7 => PduType::GetBulk,
            8 => PduType::TestSet,
            9 => PduType::CommitSet,
            10 => PduType::UndoSet,
            11 => PduType::CleanupSet,
            12 => PduType::Notify,
            13 => PduType::Ping,
            14 => PduType::IndexAllocate,
            15 => PduType::IndexDeallocate,
            16 => PduType::AddAgentCaps,
            17 => PduType::RemoveAgentCaps,
            18 => PduType::Response,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CloseReason {
    Other = 1,
    ParseError = 2,
    ProtocolError = 3,
    Timeouts = 4,
    Shutdown = 5,
    ByManager = 6,
}

impl TryFrom<u8> for CloseReason {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        Ok(match value {
            1 => CloseReason::Other,
            2 => CloseReason::ParseError,
            3 => CloseReason::ProtocolError,
            4 => CloseReason::Timeouts,
            5 => CloseReason::Shutdown,
            6 => CloseReason::ByManager,
            other => return Err(other),
        })
    }
}

/// A Response PDU's error code (RFC 2741 §7.2.5). `Other` preserves any code
/// this crate doesn't have a name for, since RFC 2741 reserves room for
/// vendor extension and a codec must stay parseable for any wire-valid
/// frame even when it can't name every code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    NoError,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    NotWritable,
    InconsistentName,
    OpenFailed,
    NotOpen,
    IndexWrongType,
    IndexAlreadyAllocated,
    IndexNoneAvailable,
    IndexNotAllocated,
    UnsupportedContext,
    DuplicateRegistration,
    UnknownRegistration,
    UnknownAgentCaps,
    ParseError,
    RequestDenied,
    ProcessingError,
    Other(u16),
}

impl ResponseError {
    pub fn as_u16(self) -> u16 {
        match self {
            ResponseError::NoError => 0,
            ResponseError::GenErr => 5,
            ResponseError::NoAccess => 6,
            ResponseError::WrongType => 7,
            ResponseError::WrongLength => 8,
            ResponseError::WrongEncoding => 9,
            ResponseError::WrongValue => 10,
            ResponseError::NoCreation => 11,
            ResponseError::InconsistentValue => 12,
            ResponseError::ResourceUnavailable => 13,
            ResponseError::CommitFailed => 14,
            ResponseError::UndoFailed => 15,
            ResponseError::NotWritable => 16,
            ResponseError::InconsistentName => 17,
            ResponseError::OpenFailed => 256,
            ResponseError::NotOpen => 257,
            ResponseError::IndexWrongType => 258,
            ResponseError::IndexAlreadyAllocated => 259,
            ResponseError::IndexNoneAvailable => 260,
            ResponseError::IndexNotAllocated => 261,
            ResponseError::UnsupportedContext => 262,
            ResponseError::DuplicateRegistration => 263,
            ResponseError::UnknownRegistration => 264,
            ResponseError::UnknownAgentCaps => 265,
            ResponseError::ParseError => 266,
            ResponseError::RequestDenied => 267,
            ResponseError::ProcessingError => 268,
            ResponseError::Other(v) => v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => ResponseError::NoError,
            5 => ResponseError::GenErr,
            6 => ResponseError::NoAccess,
            7 => ResponseError::WrongType,
            8 => ResponseError::WrongLength,
            9 => ResponseError::WrongEncoding,
            10 => ResponseError::WrongValue,
            11 => ResponseError::NoCreation,
            12 => ResponseError::InconsistentValue,
            13 => ResponseError::ResourceUnavailable,
            14 => ResponseError::CommitFailed,
            15 => ResponseError::UndoFailed,
            16 => ResponseError::NotWritable,
            17 => ResponseError::InconsistentName,
            256 => ResponseError::OpenFailed,
            257 => ResponseError::NotOpen,
            258 => ResponseError::IndexWrongType,
            259 => ResponseError::IndexAlreadyAllocated,
            260 => ResponseError::IndexNoneAvailable,
            261 => ResponseError::IndexNotAllocated,
            262 => ResponseError::UnsupportedContext,
            263 => ResponseError::DuplicateRegistration,
            264 => ResponseError::UnknownRegistration,
            265 => ResponseError::UnknownAgentCaps,
            266 => ResponseError::ParseError,
            267 => ResponseError::RequestDenied,
            268 => ResponseError::ProcessingError,
            other => ResponseError::Other(other),
        }
    }
}

/// The fixed 20-byte PDU header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub pdu_type: PduType,
    pub flags: Flags,
    pub session_id: u32,
    pub transaction_id: u32,
    pub packet_id: u32,
    pub payload_length: u32,
}

impl Header {
    pub fn new(pdu_type: PduType, flags: Flags, session_id: u32, transaction_id: u32, packet_id: u32) -> Self {
        Self {
            version: AGENTX_VERSION,
            pdu_type,
            flags,
            session_id,
            transaction_id,
            packet_id,
            payload_length: 0,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::from_network_flag(self.flags.contains(Flags::NETWORK_BYTE_ORDER))
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        let order = self.byte_order();
        buf.push(self.version);
        buf.push(self.pdu_type as u8);
        buf.push(self.flags.bits());
        buf.push(0);
        encode_u32(buf, self.session_id, order);
        encode_u32(buf, self.transaction_id, order);
        encode_u32(buf, self.packet_id, order);
        encode_u32(buf, self.payload_length, order);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(AgentXError::protocol("header shorter than 20 bytes"));
        }
        let version = data[0];
        let pdu_type = PduType::try_from(data[1])
            .map_err(|v| AgentXError::protocol(format!("unknown PDU type: {v}")))?;
        let flags = Flags::from_bits_truncate(data[2]);
        let order = ByteOrder::from_network_flag(flags.contains(Flags::NETWORK_BYTE_ORDER));

        let mut pos = 4;
        let session_id = decode_u32(data, &mut pos, order)?;
        let transaction_id = decode_u32(data, &mut pos, order)?;
        let packet_id = decode_u32(data, &mut pos, order)?;
        let payload_length = decode_u32(data, &mut pos, order)?;

        Ok(Self {
            version,
            pdu_type,
            flags,
            session_id,
            transaction_id,
            packet_id,
            payload_length,
        })
    }
}

/// A (start, stop) OID pair used by Get/GetNext/GetBulk (RFC 2741 §5.2).
///
/// The `include` flag of `start` is preserved through encode/decode;
/// `end` is always encoded with `include=false`, since RFC 2741 never
/// gives the stop OID's include bit meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRange {
    pub start: Oid,
    pub end: Oid,
}

impl SearchRange {
    pub fn new(start: Oid, end: Oid) -> Self {
        Self { start, end }
    }

    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        encode_oid(buf, &self.start, self.start.include, order)?;
        encode_oid(buf, &self.end, false, order)?;
        Ok(())
    }

    pub fn decode(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<Self> {
        let start = decode_oid(data, pos, order)?;
        let end = decode_oid(data, pos, order)?;
        Ok(Self { start, end })
    }
}

/// An OID/value pair (RFC 2741 §5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    pub fn encode(&self, buf: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        encode_u16(buf, self.value.value_type() as u16, order);
        buf.push(0);
        buf.push(0);
        encode_oid(buf, &self.oid, false, order)?;
        match &self.value {
            Value::Integer32(v) | Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
                encode_u32(buf, *v, order);
            }
            Value::Counter64(v) => codec::encode_u64(buf, *v, order),
            Value::OctetString(v) | Value::Opaque(v) => {
                codec::encode_octet_string(buf, v, order)?;
            }
            Value::IpAddress(bytes) => {
                codec::encode_octet_string(buf, bytes, order)?;
            }
            Value::ObjectIdentifier(oid) => encode_oid(buf, oid, oid.include, order)?,
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
        }
        Ok(())
    }

    pub fn decode(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<Self> {
        let type_code = decode_u16(data, pos, order)?;
        *pos += 2; // reserved
        let oid = decode_oid(data, pos, order)?;
        let value_type = ValueType::try_from(type_code)
            .map_err(|v| AgentXError::protocol(format!("unknown varbind type: {v}")))?;
        let value = match value_type {
            ValueType::Integer32 => Value::Integer32(decode_u32(data, pos, order)?),
            ValueType::Counter32 => Value::Counter32(decode_u32(data, pos, order)?),
            ValueType::Gauge32 => Value::Gauge32(decode_u32(data, pos, order)?),
            ValueType::TimeTicks => Value::TimeTicks(decode_u32(data, pos, order)?),
            ValueType::Counter64 => Value::Counter64(decode_u64(data, pos, order)?),
            ValueType::OctetString => {
                Value::OctetString(codec::decode_octet_string(data, pos, order)?.as_bytes().to_vec())
            }
            ValueType::Opaque => {
                Value::Opaque(codec::decode_octet_string(data, pos, order)?.as_bytes().to_vec())
            }
            ValueType::IpAddress => {
                let s = codec::decode_octet_string(data, pos, order)?;
                let bytes = s.as_bytes();
                if bytes.len() != 4 {
                    return Err(AgentXError::protocol(format!(
                        "ip address must be 4 bytes, got {}",
                        bytes.len()
                    )));
                }
                Value::IpAddress([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            ValueType::ObjectIdentifier => Value::ObjectIdentifier(decode_oid(data, pos, order)?),
            ValueType::Null => Value::Null,
            ValueType::NoSuchObject => Value::NoSuchObject,
            ValueType::NoSuchInstance => Value::NoSuchInstance,
            ValueType::EndOfMibView => Value::EndOfMibView,
        };
        Ok(Self { oid, value })
    }
}

fn decode_varbind_list(data: &[u8], pos: &mut usize, end: usize, order: ByteOrder) -> Result<Vec<VarBind>> {
    let mut varbinds = Vec::new();
    while *pos < end {
        varbinds.push(VarBind::decode(data, pos, order)?);
        if *pos > end {
            return Err(AgentXError::protocol("varbind overran declared payload length"));
        }
    }
    Ok(varbinds)
}

fn decode_search_range_list(
    data: &[u8],
    pos: &mut usize,
    end: usize,
    order: ByteOrder,
) -> Result<Vec<SearchRange>> {
    let mut ranges = Vec::new();
    while *pos < end {
        ranges.push(SearchRange::decode(data, pos, order)?);
        if *pos > end {
            return Err(AgentXError::protocol(
                "search range overran declared payload length",
            ));
        }
    }
    Ok(ranges)
}

/// The type-discriminated payload of a decoded PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    SearchRanges(Vec<SearchRange>),
    GetBulk {
        non_repeaters: u16,
        max_repetitions: u16,
        ranges: Vec<SearchRange>,
    },
    VarBinds(Vec<VarBind>),
    Response {
        sys_uptime: u32,
        error: ResponseError,
        index: u16,
        varbinds: Vec<VarBind>,
    },
    Empty,
    Raw(Vec<u8>),
}

/// A fully decoded inbound PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPdu {
    pub header: Header,
    pub context: Option<OctetString>,
    pub payload: Payload,
}

impl DecodedPdu {
    /// Parses the body following a just-decoded header. `body` is exactly
    /// `header.payload_length` bytes (the caller has already ensured the
    /// full frame is buffered; see [`crate::session::Session::receive`]).
    pub fn decode_body(header: Header, body: &[u8]) -> Result<Self> {
        let order = header.byte_order();
        let mut pos = 0;
        let end = body.len();

        let context = if header.flags.contains(Flags::NON_DEFAULT_CONTEXT) {
            Some(codec::decode_octet_string(body, &mut pos, order)?)
        } else {
            None
        };

        let payload = match header.pdu_type {
            PduType::Get | PduType::GetNext => {
                Payload::SearchRanges(decode_search_range_list(body, &mut pos, end, order)?)
            }
            PduType::GetBulk => {
                let non_repeaters = decode_u16(body, &mut pos, order)?;
                let max_repetitions = decode_u16(body, &mut pos, order)?;
                let ranges = decode_search_range_list(body, &mut pos, end, order)?;
                Payload::GetBulk {
                    non_repeaters,
                    max_repetitions,
                    ranges,
                }
            }
            PduType::TestSet => {
                Payload::VarBinds(decode_varbind_list(body, &mut pos, end, order)?)
            }
            PduType::CommitSet | PduType::UndoSet | PduType::CleanupSet => {
                if pos != end {
                    return Err(AgentXError::protocol(format!(
                        "{:?} PDU must have an empty body, found {} residual bytes",
                        header.pdu_type,
                        end - pos
                    )));
                }
                Payload::Empty
            }
            PduType::Response => {
                if end - pos < 8 {
                    return Err(AgentXError::protocol("Response PDU shorter than 8 bytes"));
                }
                let sys_uptime = decode_u32(body, &mut pos, order)?;
                let error = ResponseError::from_u16(decode_u16(body, &mut pos, order)?);
                let index = decode_u16(body, &mut pos, order)?;
                let varbinds = decode_varbind_list(body, &mut pos, end, order)?;
                Payload::Response {
                    sys_uptime,
                    error,
                    index,
                    varbinds,
                }
            }
            PduType::Open
            | PduType::Close
            | PduType::Register
            | PduType::Unregister
            | PduType::IndexAllocate
            | PduType::IndexDeallocate
            | PduType::AddAgentCaps
            | PduType::RemoveAgentCaps
            | PduType::Notify
            | PduType::Ping => Payload::Raw(body[pos..].to_vec()),
        };

        Ok(Self {
            header,
            context,
            payload,
        })
    }
}
