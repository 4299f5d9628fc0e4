//! Primitive wire codec: integers, octet strings, and OIDs.
//!
//! Every function here is endianness-parameterised rather than fixed to
//! one byte order, because a session may receive frames from a
//! network-byte-order master while sending in its own native order (RFC
//! 2741 §7.1.3: byte order is chosen per-PDU by the sender and flagged
//! in the header). Decoders never assume the session's own byte order:
//! they take the order carried in the frame's own header.

use crate::error::{AgentXError, Result};
use crate::oid::{Oid, OID_MAX_LEN};

/// Byte order for a single PDU: the session's own choice when encoding,
/// or whatever the `NETWORK_BYTE_ORDER` flag says when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    pub fn from_network_flag(network_byte_order: bool) -> Self {
        if network_byte_order {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn is_network(self) -> bool {
        matches!(self, ByteOrder::Big)
    }
}

fn need(data: &[u8], pos: usize, n: usize) -> Result<()> {
    if data.len().saturating_sub(pos) < n {
        return Err(AgentXError::protocol(format!(
            "truncated field: need {n} bytes at offset {pos}, have {}",
            data.len().saturating_sub(pos)
        )));
    }
    Ok(())
}

pub fn encode_u16(buf: &mut Vec<u8>, v: u16, order: ByteOrder) {
    buf.extend_from_slice(&match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    });
}

pub fn encode_u32(buf: &mut Vec<u8>, v: u32, order: ByteOrder) {
    buf.extend_from_slice(&match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    });
}

pub fn encode_u64(buf: &mut Vec<u8>, v: u64, order: ByteOrder) {
    buf.extend_from_slice(&match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    });
}

pub fn decode_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    need(data, *pos, 1)?;
    let v = data[*pos];
    *pos += 1;
    Ok(v)
}

pub fn decode_u16(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<u16> {
    need(data, *pos, 2)?;
    let b = [data[*pos], data[*pos + 1]];
    *pos += 2;
    Ok(match order {
        ByteOrder::Big => u16::from_be_bytes(b),
        ByteOrder::Little => u16::from_le_bytes(b),
    })
}

pub fn decode_u32(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<u32> {
    need(data, *pos, 4)?;
    let b = [data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]];
    *pos += 4;
    Ok(match order {
        ByteOrder::Big => u32::from_be_bytes(b),
        ByteOrder::Little => u32::from_le_bytes(b),
    })
}

pub fn decode_u64(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<u64> {
    need(data, *pos, 8)?;
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[*pos..*pos + 8]);
    *pos += 8;
    Ok(match order {
        ByteOrder::Big => u64::from_be_bytes(b),
        ByteOrder::Little => u64::from_le_bytes(b),
    })
}

fn pad_len(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// A decoded octet string. Carries one byte beyond its reported `len()`:
/// a NUL the wire format never transmits, added purely to ease downstream
/// handling of textual values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString(Vec<u8>);

impl OctetString {
    pub fn from_content(bytes: &[u8]) -> Self {
        let mut v = Vec::with_capacity(bytes.len() + 1);
        v.extend_from_slice(bytes);
        v.push(0);
        OctetString(v)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw buffer including the trailing NUL, for callers that want
    /// to hand it to a C-string-style API without copying.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for OctetString {
    fn from(bytes: &[u8]) -> Self {
        OctetString::from_content(bytes)
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(bytes: Vec<u8>) -> Self {
        OctetString::from_content(&bytes)
    }
}

impl From<&str> for OctetString {
    fn from(s: &str) -> Self {
        OctetString::from_content(s.as_bytes())
    }
}

pub fn encode_octet_string(buf: &mut Vec<u8>, data: &[u8], order: ByteOrder) -> Result<()> {
    let len: u32 = data
        .len()
        .try_into()
        .map_err(|_| AgentXError::invalid("octet string too large to encode"))?;
    encode_u32(buf, len, order);
    buf.extend_from_slice(data);
    buf.resize(buf.len() + pad_len(data.len()), 0);
    Ok(())
}

pub fn decode_octet_string(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<OctetString> {
    let len = decode_u32(data, pos, order)? as usize;
    need(data, *pos, len)?;
    let content = &data[*pos..*pos + len];
    let result = OctetString::from_content(content);
    *pos += len;
    *pos += pad_len(len);
    Ok(result)
}

/// Encodes an OID, applying the `1.3.6.1.x` prefix-compression optimisation
/// (RFC 2741 §5.1) whenever the first five sub-identifiers allow it.
/// `include` overrides the OID's own `include` flag (used by
/// [`crate::pdu::SearchRange`], whose stop OID is always emitted with
/// `include=false` regardless of what the `Oid` value carries).
pub fn encode_oid(buf: &mut Vec<u8>, oid: &Oid, include: bool, order: ByteOrder) -> Result<()> {
    let parts = oid.parts();

    let (prefix, start_idx) = if parts.len() >= 5
        && parts[0] == 1
        && parts[1] == 3
        && parts[2] == 6
        && parts[3] == 1
        && parts[4] <= u8::MAX as u32
    {
        (parts[4] as u8, 5)
    } else {
        (0u8, 0)
    };

    let n_subid = parts.len() - start_idx;
    let n_subid: u8 = n_subid
        .try_into()
        .map_err(|_| AgentXError::invalid(format!("oid has {n_subid} wire sub-identifiers, max is 255")))?;

    buf.push(n_subid);
    buf.push(prefix);
    buf.push(include as u8);
    buf.push(0);

    for &part in &parts[start_idx..] {
        encode_u32(buf, part, order);
    }

    Ok(())
}

pub fn decode_oid(data: &[u8], pos: &mut usize, order: ByteOrder) -> Result<Oid> {
    need(data, *pos, 4)?;
    let n_subid = data[*pos] as usize;
    let prefix = data[*pos + 1];
    let include = data[*pos + 2] != 0;
    *pos += 4;

    let mut ids = Vec::with_capacity(n_subid + 5);
    if prefix != 0 {
        ids.extend_from_slice(&[1, 3, 6, 1, prefix as u32]);
    }
    for _ in 0..n_subid {
        ids.push(decode_u32(data, pos, order)?);
    }

    if ids.len() > OID_MAX_LEN {
        return Err(AgentXError::protocol(format!(
            "decoded oid has {} sub-identifiers, max is {OID_MAX_LEN}",
            ids.len()
        )));
    }

    Ok(Oid::from_parts_unchecked(ids, include))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_roundtrip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut buf = Vec::new();
            encode_u16(&mut buf, 0x1234, order);
            encode_u32(&mut buf, 0xdead_beef, order);
            encode_u64(&mut buf, 0x0102_0304_0506_0708, order);

            let mut pos = 0;
            assert_eq!(decode_u16(&buf, &mut pos, order).unwrap(), 0x1234);
            assert_eq!(decode_u32(&buf, &mut pos, order).unwrap(), 0xdead_beef);
            assert_eq!(
                decode_u64(&buf, &mut pos, order).unwrap(),
                0x0102_0304_0506_0708
            );
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn octet_string_padding_and_nul() {
        let mut buf = Vec::new();
        encode_octet_string(&mut buf, b"hello", ByteOrder::Big).unwrap();
        // 4 (len) + 5 (data) + 3 (pad) = 12
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[4..9], b"hello");
        assert_eq!(&buf[9..12], &[0, 0, 0]);

        let mut pos = 0;
        let decoded = decode_octet_string(&buf, &mut pos, ByteOrder::Big).unwrap();
        assert_eq!(decoded.as_bytes(), b"hello");
        assert_eq!(decoded.len(), 5);
        assert_eq!(decoded.as_bytes_with_nul().last(), Some(&0));
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn octet_string_already_aligned_has_no_padding() {
        let mut buf = Vec::new();
        encode_octet_string(&mut buf, b"abcd", ByteOrder::Big).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn octet_string_truncated_is_protocol_error() {
        let buf = [0, 0, 0, 10, b'h', b'i'];
        let mut pos = 0;
        assert!(matches!(
            decode_octet_string(&buf, &mut pos, ByteOrder::Big),
            Err(AgentXError::ProtocolError(_))
        ));
    }

    #[test]
    fn oid_prefix_compression() {
        let oid: Oid = "1.3.6.1.4.1.12345".parse().unwrap();
        let mut buf = Vec::new();
        encode_oid(&mut buf, &oid, false, ByteOrder::Big).unwrap();
        assert_eq!(buf[0], 2); // n_subid: .1.12345
        assert_eq!(buf[1], 4); // prefix
        assert_eq!(buf[2], 0); // include
    }

    #[test]
    fn oid_without_compressible_prefix_emitted_verbatim() {
        let oid: Oid = "2.1.1".parse().unwrap();
        let mut buf = Vec::new();
        encode_oid(&mut buf, &oid, false, ByteOrder::Big).unwrap();
        assert_eq!(buf[0], 3);
        assert_eq!(buf[1], 0);
    }

    #[test]
    fn oid_roundtrip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let oid: Oid = "1.3.6.1.4.1.12345.1.2".parse().unwrap();
            let mut buf = Vec::new();
            encode_oid(&mut buf, &oid, true, order).unwrap();
            let mut pos = 0;
            let decoded = decode_oid(&buf, &mut pos, order).unwrap();
            assert_eq!(decoded.parts(), oid.parts());
            assert!(decoded.include);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn prefix_and_noncompressed_oid_decode_to_same_sequence() {
        // Compressed and non-compressed encodings must decode identically.
        let oid: Oid = "1.3.6.1.4.1.12345".parse().unwrap();
        let mut compressed = Vec::new();
        encode_oid(&mut compressed, &oid, false, ByteOrder::Big).unwrap();

        // Hand-encode the same OID verbatim (prefix=0).
        let mut verbatim = vec![oid.len() as u8, 0, 0, 0];
        for &p in oid.parts() {
            encode_u32(&mut verbatim, p, ByteOrder::Big);
        }

        let mut pos_a = 0;
        let mut pos_b = 0;
        let a = decode_oid(&compressed, &mut pos_a, ByteOrder::Big).unwrap();
        let b = decode_oid(&verbatim, &mut pos_b, ByteOrder::Big).unwrap();
        assert_eq!(a.parts(), b.parts());
    }
}
