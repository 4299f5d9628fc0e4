//! Human-readable renderings of OIDs, varbinds, and protocol enums for
//! logging. Output format is not a protocol contract: callers must not
//! parse these strings.

use std::fmt::Write as _;

use crate::oid::Oid;
use crate::pdu::{CloseReason, PduType, ResponseError};
use crate::types::Value;

const BUDGET: usize = 1024;

fn truncate(mut s: String) -> String {
    if s.len() > BUDGET {
        s.truncate(BUDGET - 3);
        s.push_str("...");
    }
    s
}

/// `1.3.6.1.2.1.1.0`.
pub fn oid_to_string(oid: &Oid) -> String {
    oid_range_to_string(oid, 0, 0)
}

/// Like [`oid_to_string`], but renders sub-identifier `range_subid - 1` as
/// `[x-upperbound]` when `range_subid != 0` (the "varying last index" shape
/// a table-column Register PDU produces).
pub fn oid_range_to_string(oid: &Oid, range_subid: u8, upper_bound: u32) -> String {
    let mut out = String::new();
    for (i, part) in oid.parts().iter().enumerate() {
        if range_subid != 0 && range_subid as usize - 1 == i {
            let _ = write!(out, ".[{part}-{upper_bound}]");
        } else {
            let _ = write!(out, ".{part}");
        }
        if out.len() > BUDGET {
            break;
        }
    }
    truncate(out)
}

fn is_printable(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| (0x20..0x7f).contains(&b))
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for b in bytes {
        let _ = write!(out, " {b:02X}");
        if out.len() > BUDGET {
            break;
        }
    }
    truncate(out)
}

/// `1.3.6.1.2.1.1.0: (string)hello` or `...: (hex-string) DE AD BE EF`.
pub fn varbind_to_string(oid: &Oid, value: &Value) -> String {
    let name = oid_to_string(oid);
    let rendered = match value {
        Value::Integer32(v) => format!("(int){v}"),
        Value::Counter32(v) => format!("(counter32){v}"),
        Value::Gauge32(v) => format!("(gauge32){v}"),
        Value::TimeTicks(v) => format!("(timeticks){v}"),
        Value::Counter64(v) => format!("(counter64){v}"),
        Value::OctetString(bytes) => {
            if is_printable(bytes) {
                format!("(string){}", String::from_utf8_lossy(bytes))
            } else {
                format!("(hex-string){}", hex_dump(bytes))
            }
        }
        Value::Opaque(bytes) => format!("(opaque){}", hex_dump(bytes)),
        Value::IpAddress(bytes) => format!("(ipaddress){}", ip_address_to_string(bytes)),
        Value::ObjectIdentifier(oid) => format!("(oid){}", oid_to_string(oid)),
        Value::Null => "<null>".to_string(),
        Value::NoSuchObject => "<noSuchObject>".to_string(),
        Value::NoSuchInstance => "<noSuchInstance>".to_string(),
        Value::EndOfMibView => "<endOfMibView>".to_string(),
    };
    truncate(format!("{name}: {rendered}"))
}

/// `10.0.0.1`, or `<invalid>` if `bytes` isn't exactly 4 long.
pub fn ip_address_to_string(bytes: &[u8]) -> String {
    match <[u8; 4]>::try_from(bytes) {
        Ok([a, b, c, d]) => format!("{a}.{b}.{c}.{d}"),
        Err(_) => "<invalid>".to_string(),
    }
}

pub fn pdu_type_name(pdu_type: PduType) -> &'static str {
    match pdu_type {
        PduType::Open => "agentx-Open-PDU",
        PduType::Close => "agentx-Close-PDU",
        PduType::Register => "agentx-Register-PDU",
        PduType::Unregister => "agentx-Unregister-PDU",
        PduType::Get => "agentx-Get-PDU",
        PduType::GetNext => "agentx-GetNext-PDU",
        PduType::GetBulk => "agentx-GetBulk-PDU",
        PduType::TestSet => "agentx-TestSet-PDU",
        PduType::CommitSet => "agentx-CommitSet-PDU",
        PduType::UndoSet => "agentx-UndoSet-PDU",
        PduType::CleanupSet => "agentx-CleanupSet-PDU",
        PduType::Notify => "agentx-Notify-PDU",
        PduType::Ping => "agentx-Ping-PDU",
        PduType::IndexAllocate => "agentx-IndexAllocate-PDU",
        PduType::IndexDeallocate => "agentx-IndexDeallocate-PDU",
        PduType::AddAgentCaps => "agentx-AddAgentCaps-PDU",
        PduType::RemoveAgentCaps => "agentx-RemoveAgentCaps-PDU",
        PduType::Response => "agentx-Response-PDU",
    }
}

pub fn close_reason_name(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::Other => "undefined reason",
        CloseReason::ParseError => "too many AgentX parse errors from peer",
        CloseReason::ProtocolError => "too many AgentX protocol errors from peer",
        CloseReason::Timeouts => "too many timeouts waiting for peer",
        CloseReason::Shutdown => "shutting down",
        CloseReason::ByManager => "manager shuts down",
    }
}

pub fn error_name(error: ResponseError) -> String {
    let s = match error {
        ResponseError::NoError => "no error",
        ResponseError::GenErr => "generic error",
        ResponseError::NoAccess => "no access",
        ResponseError::WrongType => "wrong type",
        ResponseError::WrongLength => "wrong length",
        ResponseError::WrongEncoding => "wrong encoding",
        ResponseError::WrongValue => "wrong value",
        ResponseError::NoCreation => "no creation",
        ResponseError::InconsistentValue => "inconsistent value",
        ResponseError::ResourceUnavailable => "resource unavailable",
        ResponseError::CommitFailed => "commit failed",
        ResponseError::UndoFailed => "undo failed",
        ResponseError::NotWritable => "not writable",
        ResponseError::InconsistentName => "inconsistent name",
        ResponseError::OpenFailed => "open failed",
        ResponseError::NotOpen => "not open",
        ResponseError::IndexWrongType => "index has wrong type",
        ResponseError::IndexAlreadyAllocated => "index already allocated",
        ResponseError::IndexNoneAvailable => "no index available",
        ResponseError::IndexNotAllocated => "index not allocated",
        ResponseError::UnsupportedContext => "context not supported",
        ResponseError::DuplicateRegistration => "duplicate registration",
        ResponseError::UnknownRegistration => "unknown registration",
        ResponseError::UnknownAgentCaps => "unknown agent capabilities",
        ResponseError::ParseError => "parse error",
        ResponseError::RequestDenied => "request denied",
        ResponseError::ProcessingError => "processing error",
        ResponseError::Other(code) => return format!("unknown error: {code}"),
    };
    s.to_string()
}
