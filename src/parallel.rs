//! Batch-encode helpers for large varbind/search-range/OID lists, gated
//! behind the `parallel` feature. Ordinary single-builder PDU encoding
//! never needs these; they exist for callers assembling very large
//! GetBulk responses or bulk Register sweeps who want to pre-render
//! many items across threads before handing the concatenated bytes to a
//! [`crate::session::Session`] builder body.

use rayon::prelude::*;

use crate::codec::{self, ByteOrder};
use crate::error::Result;
use crate::oid::Oid;
use crate::pdu::{SearchRange, VarBind};
use crate::types::Value;

pub fn encode_varbinds_batch(varbinds: &[VarBind], order: ByteOrder) -> Result<Vec<Vec<u8>>> {
    varbinds
        .par_iter()
        .map(|vb| {
            let mut buf = Vec::new();
            vb.encode(&mut buf, order)?;
            Ok(buf)
        })
        .collect()
}

pub fn encode_search_ranges_batch(ranges: &[SearchRange], order: ByteOrder) -> Result<Vec<Vec<u8>>> {
    ranges
        .par_iter()
        .map(|r| {
            let mut buf = Vec::new();
            r.encode(&mut buf, order)?;
            Ok(buf)
        })
        .collect()
}

pub fn encode_oids_batch(oids: &[Oid], include: bool, order: ByteOrder) -> Result<Vec<Vec<u8>>> {
    oids.par_iter()
        .map(|oid| {
            let mut buf = Vec::new();
            codec::encode_oid(&mut buf, oid, include, order)?;
            Ok(buf)
        })
        .collect()
}

pub fn encode_values_batch(values: &[Value], order: ByteOrder) -> Result<Vec<Vec<u8>>> {
    values
        .par_iter()
        .map(|v| {
            let mut buf = Vec::new();
            match v {
                Value::Integer32(n) | Value::Counter32(n) | Value::Gauge32(n) | Value::TimeTicks(n) => {
                    codec::encode_u32(&mut buf, *n, order)
                }
                Value::Counter64(n) => codec::encode_u64(&mut buf, *n, order),
                Value::OctetString(bytes) | Value::Opaque(bytes) => {
                    codec::encode_octet_string(&mut buf, bytes, order)?
                }
                Value::IpAddress(bytes) => codec::encode_octet_string(&mut buf, bytes, order)?,
                Value::ObjectIdentifier(oid) => codec::encode_oid(&mut buf, oid, oid.include, order)?,
                Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
            }
            Ok(buf)
        })
        .collect()
}

pub fn concat_buffers(buffers: Vec<Vec<u8>>) -> Vec<u8> {
    let total_len: usize = buffers.iter().map(|b| b.len()).sum();
    let mut result = Vec::with_capacity(total_len);
    for buf in buffers {
        result.extend(buf);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_varbinds_batch_preserves_count() {
        let varbinds: Vec<VarBind> = (0..100)
            .map(|i| {
                let oid: Oid = format!("1.3.6.1.2.1.1.{i}").parse().unwrap();
                VarBind::new(oid, Value::Integer32(i as u32))
            })
            .collect();

        let encoded = encode_varbinds_batch(&varbinds, ByteOrder::Big).unwrap();
        assert_eq!(encoded.len(), 100);
        for buf in &encoded {
            assert!(!buf.is_empty());
        }
    }

    #[test]
    fn encode_search_ranges_batch_preserves_count() {
        let ranges: Vec<SearchRange> = (0..100)
            .map(|i| {
                let start: Oid = format!("1.3.6.1.2.1.{i}").parse().unwrap();
                let end: Oid = format!("1.3.6.1.2.1.{}", i + 1).parse().unwrap();
                SearchRange::new(start, end)
            })
            .collect();

        let encoded = encode_search_ranges_batch(&ranges, ByteOrder::Big).unwrap();
        assert_eq!(encoded.len(), 100);
    }

    #[test]
    fn encode_oids_batch_preserves_count() {
        let oids: Vec<Oid> = (0..100)
            .map(|i| format!("1.3.6.1.4.1.{i}").parse().unwrap())
            .collect();

        let encoded = encode_oids_batch(&oids, false, ByteOrder::Big).unwrap();
        assert_eq!(encoded.len(), 100);
    }

    #[test]
    fn encode_values_batch_preserves_count() {
        let values: Vec<Value> = (0..100).map(Value::Integer32).collect();
        let encoded = encode_values_batch(&values, ByteOrder::Big).unwrap();
        assert_eq!(encoded.len(), 100);
    }

    #[test]
    fn concat_buffers_joins_in_order() {
        let buffers = vec![vec![1, 2, 3], vec![4, 5], vec![6, 7, 8, 9]];
        let result = concat_buffers(buffers);
        assert_eq!(result, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}
