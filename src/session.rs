//! Session: the non-blocking transport state machine tying the PDU codec
//! to a connected byte stream.

use std::io::{Read, Write};

use rand::Rng;

use crate::codec::{self, ByteOrder};
use crate::error::{AgentXError, Result};
use crate::oid::Oid;
use crate::pdu::bodies::{AgentCapsBody, CloseBody, IndexBody, OpenBody, RegisterBody, RemoveAgentCapsBody, UnregisterBody};
use crate::pdu::{CloseReason, DecodedPdu, Flags, Header, PduType, ResponseError, SearchRange, VarBind, AGENTX_VERSION, HEADER_SIZE};

const READ_GROWTH: usize = 512;
const PACKET_ID_CHUNK: usize = 25;

/// Single-owner, single-threaded AgentX session over a generic non-blocking
/// stream. `Send`, not `Sync`: no internal locking, no true blocking.
pub struct Session<S> {
    stream: S,
    own_order: ByteOrder,
    session_id: u32,

    write_buf: Vec<u8>,
    committed: usize,

    read_buf: Vec<u8>,
    read_len: usize,

    packet_ids: Vec<u32>,
}

impl<S> Session<S>
where
    S: Read + Write,
{
    pub fn new(stream: S, own_order: ByteOrder) -> Self {
        Self {
            stream,
            own_order,
            session_id: 0,
            write_buf: Vec::new(),
            committed: 0,
            read_buf: Vec::new(),
            read_len: 0,
            packet_ids: Vec::with_capacity(PACKET_ID_CHUNK),
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Set after a master's Response to `open` has assigned one.
    pub fn set_session_id(&mut self, session_id: u32) {
        self.session_id = session_id;
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.own_order
    }

    /// Outstanding request packet ids, for tests and diagnostics.
    pub fn outstanding_packet_ids(&self) -> &[u32] {
        &self.packet_ids
    }

    pub fn inner(&self) -> &S {
        &self.stream
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    // ---- packet id registry -------------------------------------------

    fn reserve_packet_id(&mut self) -> u32 {
        if self.packet_ids.capacity() < self.packet_ids.len() + 1 {
            self.packet_ids.reserve(PACKET_ID_CHUNK);
        }
        loop {
            let candidate: u32 = rand::rng().random();
            if candidate == 0 {
                continue;
            }
            if self.packet_ids.contains(&candidate) {
                continue;
            }
            self.packet_ids.push(candidate);
            tracing::trace!(packet_id = candidate, "reserved packet id");
            return candidate;
        }
    }

    fn release_packet_id(&mut self, id: u32) {
        if let Some(pos) = self.packet_ids.iter().position(|&x| x == id) {
            self.packet_ids.swap_remove(pos);
            tracing::trace!(packet_id = id, "released packet id");
        }
    }

    // ---- PDU staging contract -------------------------------------------

    fn begin_build(&mut self) -> Result<()> {
        if self.committed != self.write_buf.len() {
            return Err(AgentXError::AlreadyInProgress);
        }
        Ok(())
    }

    fn abort_build(&mut self) {
        self.write_buf.truncate(self.committed);
    }

    fn commit_build(&mut self, header_pos: usize) {
        let payload_len = (self.write_buf.len() - header_pos - HEADER_SIZE) as u32;
        let bytes = match self.own_order {
            ByteOrder::Big => payload_len.to_be_bytes(),
            ByteOrder::Little => payload_len.to_le_bytes(),
        };
        self.write_buf[header_pos + 16..header_pos + 20].copy_from_slice(&bytes);
        self.committed = self.write_buf.len();
    }

    fn header_flags(&self, extra: Flags, context: Option<&[u8]>) -> Flags {
        let mut flags = extra;
        if context.is_some() {
            flags |= Flags::NON_DEFAULT_CONTEXT;
        }
        if self.own_order.is_network() {
            flags |= Flags::NETWORK_BYTE_ORDER;
        }
        flags
    }

    fn stage<F>(
        &mut self,
        pdu_type: PduType,
        flags: Flags,
        transaction_id: u32,
        packet_id: u32,
        context: Option<&[u8]>,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>, ByteOrder) -> Result<()>,
    {
        let header_pos = self.write_buf.len();
        let flags = self.header_flags(flags, context);
        let header = Header::new(pdu_type, flags, self.session_id, transaction_id, packet_id);
        header.encode(&mut self.write_buf);
        if let Some(ctx) = context {
            codec::encode_octet_string(&mut self.write_buf, ctx, self.own_order)?;
        }
        body(&mut self.write_buf, self.own_order)?;
        self.commit_build(header_pos);
        tracing::debug!(?pdu_type, packet_id, "staged pdu");
        Ok(())
    }

    /// Stages a PDU that originates a request: a fresh packet id is drawn
    /// and reserved, and rolled back if staging fails partway through.
    fn build_request<F>(
        &mut self,
        pdu_type: PduType,
        flags: Flags,
        transaction_id: u32,
        context: Option<&[u8]>,
        body: F,
    ) -> Result<u32>
    where
        F: FnOnce(&mut Vec<u8>, ByteOrder) -> Result<()>,
    {
        self.begin_build()?;
        let packet_id = self.reserve_packet_id();
        match self.stage(pdu_type, flags, transaction_id, packet_id, context, body) {
            Ok(()) => Ok(packet_id),
            Err(e) => {
                self.abort_build();
                self.release_packet_id(packet_id);
                Err(e)
            }
        }
    }

    /// Stages a PDU correlated to an existing transaction (CommitSet,
    /// UndoSet, CleanupSet, Response): the packet id is caller-supplied,
    /// no registry entry is drawn or released.
    fn build_correlated<F>(
        &mut self,
        pdu_type: PduType,
        flags: Flags,
        transaction_id: u32,
        packet_id: u32,
        context: Option<&[u8]>,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>, ByteOrder) -> Result<()>,
    {
        self.begin_build()?;
        match self.stage(pdu_type, flags, transaction_id, packet_id, context, body) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.abort_build();
                Err(e)
            }
        }
    }

    // ---- builders --------------------------------------------------------

    pub fn open(&mut self, transaction_id: u32, timeout: u8, id: Oid, descr: Vec<u8>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::Open, Flags::empty(), transaction_id, context, move |buf, order| {
            OpenBody { timeout, id, descr }.encode(buf, order)
        })
    }

    pub fn close(&mut self, transaction_id: u32, reason: CloseReason, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::Close, Flags::empty(), transaction_id, context, move |buf, _order| {
            CloseBody { reason }.encode(buf);
            Ok(())
        })
    }

    pub fn register(
        &mut self,
        transaction_id: u32,
        flags: Flags,
        timeout: u8,
        priority: u8,
        range_subid: u8,
        subtree: Oid,
        upper_bound: Option<u32>,
        context: Option<&[u8]>,
    ) -> Result<u32> {
        if !Flags::INSTANCE_REGISTRATION.contains(flags) {
            return Err(AgentXError::invalid(
                "register accepts only the INSTANCE_REGISTRATION flag",
            ));
        }
        self.build_request(PduType::Register, flags, transaction_id, context, move |buf, order| {
            RegisterBody {
                timeout,
                priority,
                range_subid,
                subtree,
                upper_bound,
            }
            .encode(buf, order)
        })
    }

    pub fn unregister(
        &mut self,
        transaction_id: u32,
        priority: u8,
        range_subid: u8,
        subtree: Oid,
        upper_bound: Option<u32>,
        context: Option<&[u8]>,
    ) -> Result<u32> {
        self.build_request(PduType::Unregister, Flags::empty(), transaction_id, context, move |buf, order| {
            UnregisterBody {
                priority,
                range_subid,
                subtree,
                upper_bound,
            }
            .encode(buf, order)
        })
    }

    pub fn index_allocate(
        &mut self,
        transaction_id: u32,
        flags: Flags,
        varbinds: Vec<VarBind>,
        context: Option<&[u8]>,
    ) -> Result<u32> {
        let allowed = Flags::NEW_INDEX | Flags::ANY_INDEX;
        if !allowed.contains(flags) {
            return Err(AgentXError::invalid(
                "index-allocate accepts only NEW_INDEX and ANY_INDEX flags",
            ));
        }
        self.build_request(PduType::IndexAllocate, flags, transaction_id, context, move |buf, order| {
            IndexBody { varbinds }.encode(buf, order)
        })
    }

    pub fn index_deallocate(
        &mut self,
        transaction_id: u32,
        varbinds: Vec<VarBind>,
        context: Option<&[u8]>,
    ) -> Result<u32> {
        self.build_request(PduType::IndexDeallocate, Flags::empty(), transaction_id, context, move |buf, order| {
            IndexBody { varbinds }.encode(buf, order)
        })
    }

    pub fn add_agent_caps(&mut self, transaction_id: u32, id: Oid, descr: Vec<u8>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::AddAgentCaps, Flags::empty(), transaction_id, context, move |buf, order| {
            AgentCapsBody { id, descr }.encode(buf, order)
        })
    }

    pub fn remove_agent_caps(&mut self, transaction_id: u32, id: Oid, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::RemoveAgentCaps, Flags::empty(), transaction_id, context, move |buf, order| {
            RemoveAgentCapsBody { id }.encode(buf, order)
        })
    }

    pub fn get(&mut self, transaction_id: u32, ranges: Vec<SearchRange>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::Get, Flags::empty(), transaction_id, context, move |buf, order| {
            for r in &ranges {
                r.encode(buf, order)?;
            }
            Ok(())
        })
    }

    pub fn get_next(&mut self, transaction_id: u32, ranges: Vec<SearchRange>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::GetNext, Flags::empty(), transaction_id, context, move |buf, order| {
            for r in &ranges {
                r.encode(buf, order)?;
            }
            Ok(())
        })
    }

    pub fn get_bulk(
        &mut self,
        transaction_id: u32,
        non_repeaters: u16,
        max_repetitions: u16,
        ranges: Vec<SearchRange>,
        context: Option<&[u8]>,
    ) -> Result<u32> {
        self.build_request(PduType::GetBulk, Flags::empty(), transaction_id, context, move |buf, order| {
            codec::encode_u16(buf, non_repeaters, order);
            codec::encode_u16(buf, max_repetitions, order);
            for r in &ranges {
                r.encode(buf, order)?;
            }
            Ok(())
        })
    }

    pub fn test_set(&mut self, transaction_id: u32, varbinds: Vec<VarBind>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::TestSet, Flags::empty(), transaction_id, context, move |buf, order| {
            for vb in &varbinds {
                vb.encode(buf, order)?;
            }
            Ok(())
        })
    }

    pub fn commit_set(&mut self, transaction_id: u32, packet_id: u32, context: Option<&[u8]>) -> Result<()> {
        self.build_correlated(PduType::CommitSet, Flags::empty(), transaction_id, packet_id, context, |_buf, _order| Ok(()))
    }

    pub fn undo_set(&mut self, transaction_id: u32, packet_id: u32, context: Option<&[u8]>) -> Result<()> {
        self.build_correlated(PduType::UndoSet, Flags::empty(), transaction_id, packet_id, context, |_buf, _order| Ok(()))
    }

    pub fn cleanup_set(&mut self, transaction_id: u32, packet_id: u32, context: Option<&[u8]>) -> Result<()> {
        self.build_correlated(PduType::CleanupSet, Flags::empty(), transaction_id, packet_id, context, |_buf, _order| Ok(()))
    }

    pub fn notify(&mut self, transaction_id: u32, varbinds: Vec<VarBind>, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::Notify, Flags::empty(), transaction_id, context, move |buf, order| {
            for vb in &varbinds {
                vb.encode(buf, order)?;
            }
            Ok(())
        })
    }

    pub fn ping(&mut self, transaction_id: u32, context: Option<&[u8]>) -> Result<u32> {
        self.build_request(PduType::Ping, Flags::empty(), transaction_id, context, |_buf, _order| Ok(()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn response(
        &mut self,
        transaction_id: u32,
        packet_id: u32,
        sys_uptime: u32,
        error: ResponseError,
        index: u16,
        varbinds: Vec<VarBind>,
        context: Option<&[u8]>,
    ) -> Result<()> {
        self.build_correlated(PduType::Response, Flags::empty(), transaction_id, packet_id, context, move |buf, order| {
            codec::encode_u32(buf, sys_uptime, order);
            codec::encode_u16(buf, error.as_u16(), order);
            codec::encode_u16(buf, index, order);
            for vb in &varbinds {
                vb.encode(buf, order)?;
            }
            Ok(())
        })
    }

    // ---- send path --------------------------------------------------------

    /// Writes as much of the committed region as the stream accepts in one
    /// non-blocking call, returning the number of unsent bytes remaining.
    pub fn transmit(&mut self) -> Result<usize> {
        if self.committed != self.write_buf.len() {
            return Err(AgentXError::AlreadyInProgress);
        }
        if self.write_buf.is_empty() {
            return Ok(0);
        }
        match self.stream.write(&self.write_buf) {
            Ok(n) => {
                self.write_buf.drain(0..n);
                self.committed = self.write_buf.len();
                tracing::trace!(sent = n, remaining = self.write_buf.len(), "transmit");
                Ok(self.write_buf.len())
            }
            Err(e) => Err(AgentXError::from_io(e)),
        }
    }

    // ---- receive path -------------------------------------------------

    fn grow_read_buf(&mut self, needed: usize) {
        if self.read_buf.len() < needed {
            let mut new_len = self.read_buf.len().max(READ_GROWTH);
            while new_len < needed {
                new_len += READ_GROWTH;
            }
            self.read_buf.resize(new_len, 0);
        }
    }

    fn attempt_one_read(&mut self) -> Result<()> {
        match self.stream.read(&mut self.read_buf[self.read_len..]) {
            Ok(0) => Err(AgentXError::ConnectionReset),
            Ok(n) => {
                self.read_len += n;
                Ok(())
            }
            Err(e) => Err(AgentXError::from_io(e)),
        }
    }

    /// Reads and decodes at most one PDU. Reads at most once per call; if
    /// a full frame isn't yet buffered, returns [`AgentXError::WouldBlock`]
    /// and leaves buffered bytes untouched for the next call.
    pub fn receive(&mut self) -> Result<DecodedPdu> {
        let needed = if self.read_len >= HEADER_SIZE {
            let header = Header::decode(&self.read_buf[..HEADER_SIZE])?;
            HEADER_SIZE + header.payload_length as usize
        } else {
            HEADER_SIZE
        };

        if self.read_len < needed {
            self.grow_read_buf(needed);
            self.attempt_one_read()?;
        }

        if self.read_len < HEADER_SIZE {
            return Err(AgentXError::WouldBlock);
        }

        let header = Header::decode(&self.read_buf[..HEADER_SIZE])?;
        if header.version != AGENTX_VERSION {
            return Err(AgentXError::protocol(format!(
                "unsupported AgentX version: {}",
                header.version
            )));
        }

        let total = HEADER_SIZE + header.payload_length as usize;
        if self.read_len < total {
            return Err(AgentXError::WouldBlock);
        }

        let pdu = DecodedPdu::decode_body(header.clone(), &self.read_buf[HEADER_SIZE..total])?;

        if header.pdu_type == PduType::Response {
            match self.packet_ids.iter().position(|&x| x == header.packet_id) {
                Some(pos) => {
                    self.packet_ids.swap_remove(pos);
                }
                None => {
                    return Err(AgentXError::protocol(format!(
                        "response packet id {} is not outstanding",
                        header.packet_id
                    )));
                }
            }
        }

        self.read_buf.drain(0..total);
        self.read_len -= total;
        tracing::debug!(pdu_type = ?header.pdu_type, packet_id = header.packet_id, "received pdu");
        Ok(pdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::Payload;
    use crate::testutil::TestStream;

    fn session() -> Session<TestStream> {
        Session::new(TestStream::new(), ByteOrder::Big)
    }

    #[test]
    fn open_then_transmit_roundtrip_through_receive() {
        let mut sender = session();
        let pid = sender
            .open(1, 5, "1.3.6.1.4.1.32473".parse().unwrap(), b"ex".to_vec(), None)
            .unwrap();
        sender.transmit().unwrap();

        let mut receiver = session();
        receiver.inner_mut().push_inbound(sender.inner().outbound());
        let pdu = receiver.receive().unwrap();
        assert_eq!(pdu.header.pdu_type, PduType::Open);
        assert_eq!(pdu.header.packet_id, pid);
        match pdu.payload {
            Payload::Raw(bytes) => {
                let body = crate::pdu::bodies::OpenBody::decode(&bytes, ByteOrder::Big).unwrap();
                assert_eq!(body.descr, b"ex");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn response_matches_and_drains_packet_id_registry() {
        let mut s = session();
        let pid = s.register(1, Flags::INSTANCE_REGISTRATION, 0, 127, 0, "1.3.6.1.2.1.1".parse().unwrap(), None, None).unwrap();
        assert_eq!(s.outstanding_packet_ids(), &[pid]);

        // Build a response addressed to `pid` directly into a peer session
        // sharing the same wire, to exercise the receive-side correlation.
        let mut peer = Session::new(TestStream::new(), ByteOrder::Big);
        peer.set_session_id(s.session_id());
        peer.build_correlated(PduType::Response, Flags::empty(), 1, pid, None, |buf, order| {
            codec::encode_u32(buf, 0, order);
            codec::encode_u16(buf, ResponseError::NoError.as_u16(), order);
            codec::encode_u16(buf, 0, order);
            Ok(())
        })
        .unwrap();
        peer.transmit().unwrap();

        s.inner_mut().push_inbound(peer.inner().outbound());
        let pdu = s.receive().unwrap();
        assert_eq!(pdu.header.pdu_type, PduType::Response);
        assert!(s.outstanding_packet_ids().is_empty());
    }

    #[test]
    fn unmatched_response_packet_id_is_protocol_error_and_keeps_registry() {
        let mut s = session();
        let pid = s.ping(1, None).unwrap();

        let mut peer = Session::new(TestStream::new(), ByteOrder::Big);
        peer.build_correlated(PduType::Response, Flags::empty(), 1, pid.wrapping_add(1), None, |buf, order| {
            codec::encode_u32(buf, 0, order);
            codec::encode_u16(buf, 0, order);
            codec::encode_u16(buf, 0, order);
            Ok(())
        })
        .unwrap();
        peer.transmit().unwrap();

        s.inner_mut().push_inbound(peer.inner().outbound());
        assert!(s.receive().is_err());
        assert_eq!(s.outstanding_packet_ids(), &[pid]);
    }

    #[test]
    fn register_rejects_bad_flags_without_reserving_packet_id() {
        let mut s = session();
        let before = s.write_buf.len();
        let err = s.register(1, Flags::NEW_INDEX, 0, 127, 0, "1.3.6.1.2.1.1".parse().unwrap(), None, None);
        assert!(err.is_err());
        assert!(s.outstanding_packet_ids().is_empty());
        assert_eq!(s.write_buf.len(), before);
    }

    #[test]
    fn second_builder_while_staged_fails_with_already_in_progress() {
        let mut s = session();
        s.begin_build().unwrap();
        let header_pos = s.write_buf.len();
        let header = Header::new(PduType::Ping, Flags::empty(), 0, 0, 1);
        header.encode(&mut s.write_buf);
        // committed has not advanced yet: simulate a build left mid-flight.
        let committed_before = s.committed;
        assert_ne!(committed_before, s.write_buf.len());

        let err = s.ping(2, None);
        assert!(matches!(err, Err(AgentXError::AlreadyInProgress)));
        assert_eq!(s.committed, committed_before);
        let _ = header_pos;
    }

    #[test]
    fn partial_reads_one_byte_at_a_time_still_decode() {
        let mut sender = session();
        sender.ping(1, None).unwrap();
        sender.transmit().unwrap();
        let bytes = sender.inner().outbound().to_vec();

        let mut receiver = session();
        receiver.inner_mut().set_read_chunk(1);
        for i in 0..bytes.len() {
            receiver.inner_mut().push_inbound(&bytes[i..i + 1]);
            let result = receiver.receive();
            if i + 1 < bytes.len() {
                assert!(matches!(result, Err(AgentXError::WouldBlock)));
            } else {
                assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn transmit_partial_write_keeps_residue_for_next_call() {
        let mut s = session();
        s.ping(1, None).unwrap();
        s.inner_mut().set_write_chunk(3);
        let total = s.write_buf.len();
        let remaining = s.transmit().unwrap();
        assert_eq!(remaining, total - 3);
        let remaining2 = s.transmit().unwrap();
        assert_eq!(remaining2, total - 6);
    }

    #[test]
    fn truncated_payload_then_completion() {
        let mut sender = session();
        sender
            .add_agent_caps(1, "1.3.6.1.4.1.99.1".parse().unwrap(), b"caps-description".to_vec(), None)
            .unwrap();
        sender.transmit().unwrap();
        let bytes = sender.inner().outbound().to_vec();

        let mut receiver = session();
        receiver.inner_mut().push_inbound(&bytes[..HEADER_SIZE + 2]);
        assert!(matches!(receiver.receive(), Err(AgentXError::WouldBlock)));

        receiver.inner_mut().push_inbound(&bytes[HEADER_SIZE + 2..]);
        let pdu = receiver.receive().unwrap();
        assert_eq!(pdu.header.pdu_type, PduType::AddAgentCaps);
    }

    #[test]
    fn bad_version_is_protocol_error() {
        let mut sender = session();
        sender.ping(1, None).unwrap();
        sender.write_buf[0] = 2;
        sender.committed = sender.write_buf.len();
        sender.transmit().unwrap();

        let mut receiver = session();
        receiver.inner_mut().push_inbound(sender.inner().outbound());
        assert!(receiver.receive().is_err());
    }

    #[test]
    fn ping_with_context_roundtrips() {
        let mut sender = session();
        sender.ping(1, Some(b"vrf1")).unwrap();
        sender.transmit().unwrap();

        let mut receiver = session();
        receiver.inner_mut().push_inbound(sender.inner().outbound());
        let pdu = receiver.receive().unwrap();
        assert_eq!(pdu.context.unwrap().as_bytes(), b"vrf1");
        assert_eq!(pdu.payload, Payload::Raw(Vec::new()));
    }
}
