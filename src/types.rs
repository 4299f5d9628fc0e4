//! The typed value half of a varbind (RFC 2741 §5.4).

use crate::oid::Oid;

/// Wire type tag for each [`Value`] variant (RFC 2741 §5.4, table 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ValueType {
    Integer32 = 2,
    OctetString = 4,
    Null = 5,
    ObjectIdentifier = 6,
    IpAddress = 64,
    Counter32 = 65,
    Gauge32 = 66,
    TimeTicks = 67,
    Opaque = 68,
    Counter64 = 70,
    NoSuchObject = 128,
    NoSuchInstance = 129,
    EndOfMibView = 130,
}

impl TryFrom<u16> for ValueType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            2 => ValueType::Integer32,
            4 => ValueType::OctetString,
            5 => ValueType::Null,
            6 => ValueType::ObjectIdentifier,
            64 => ValueType::IpAddress,
            65 => ValueType::Counter32,
            66 => ValueType::Gauge32,
            67 => ValueType::TimeTicks,
            68 => ValueType::Opaque,
            70 => ValueType::Counter64,
            128 => ValueType::NoSuchObject,
            129 => ValueType::NoSuchInstance,
            130 => ValueType::EndOfMibView,
            other => return Err(other),
        })
    }
}

/// The value carried by a varbind. All 32-bit numeric kinds are unsigned,
/// matching their SNMP SMI base types (RFC 2741 §5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer32(u32),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    OctetString(Vec<u8>),
    IpAddress([u8; 4]),
    Opaque(Vec<u8>),
    ObjectIdentifier(Oid),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer32(_) => ValueType::Integer32,
            Value::Counter32(_) => ValueType::Counter32,
            Value::Gauge32(_) => ValueType::Gauge32,
            Value::TimeTicks(_) => ValueType::TimeTicks,
            Value::Counter64(_) => ValueType::Counter64,
            Value::OctetString(_) => ValueType::OctetString,
            Value::IpAddress(_) => ValueType::IpAddress,
            Value::Opaque(_) => ValueType::Opaque,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::Null => ValueType::Null,
            Value::NoSuchObject => ValueType::NoSuchObject,
            Value::NoSuchInstance => ValueType::NoSuchInstance,
            Value::EndOfMibView => ValueType::EndOfMibView,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_roundtrips_through_tag() {
        let values = [
            Value::Integer32(1),
            Value::Counter32(2),
            Value::Gauge32(3),
            Value::TimeTicks(4),
            Value::Counter64(5),
            Value::OctetString(vec![1, 2]),
            Value::IpAddress([127, 0, 0, 1]),
            Value::Opaque(vec![9]),
            Value::ObjectIdentifier(Oid::new(vec![1, 3, 6]).unwrap()),
            Value::Null,
            Value::NoSuchObject,
            Value::NoSuchInstance,
            Value::EndOfMibView,
        ];
        for v in values {
            let tag = v.value_type() as u16;
            assert_eq!(ValueType::try_from(tag).unwrap() as u16, tag);
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(ValueType::try_from(3).is_err());
    }
}
