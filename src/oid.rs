//! Object Identifiers (OIDs): the hierarchical dotted-integer names AgentX
//! uses to address MIB objects.

use std::fmt;
use std::str::FromStr;

use crate::error::AgentXError;

/// Maximum number of sub-identifiers an [`Oid`] may carry (RFC 2741 §5.1).
pub const OID_MAX_LEN: usize = 128;

/// An ordered sequence of unsigned 32-bit sub-identifiers, plus the
/// `include` flag used when the OID is the start of a search range.
///
/// `include` has no meaning outside a [`crate::pdu::SearchRange`]; it rides
/// along on the type because that's where the wire format places it (the
/// `include` byte sits inside the OID's own encoding, not the range's).
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Oid {
    ids: Vec<u32>,
    pub include: bool,
}

/// The five-valued result of comparing two OIDs.
///
/// Plain lexicographic ordering collapses "a is an ancestor of b" into
/// "a < b", which loses information callers of a MIB tree walk need: being
/// told `b` is strictly below `a` in the tree is a different fact from `b`
/// merely sorting after `a`. AgentX subagents routinely need both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidOrdering {
    /// `self` is a strict prefix of `other` (self is an ancestor).
    LeftPrefix,
    /// `self < other` at the first differing sub-identifier.
    Less,
    /// `self == other`.
    Equal,
    /// `self > other` at the first differing sub-identifier.
    Greater,
    /// `other` is a strict prefix of `self` (other is an ancestor).
    RightPrefix,
}

impl OidOrdering {
    /// Mirrors `agentx_oid_cmp`'s five-valued result: -2/-1/0/+1/+2.
    pub fn as_i8(self) -> i8 {
        match self {
            OidOrdering::LeftPrefix => -2,
            OidOrdering::Less => -1,
            OidOrdering::Equal => 0,
            OidOrdering::Greater => 1,
            OidOrdering::RightPrefix => 2,
        }
    }
}

impl Oid {
    pub fn new(ids: Vec<u32>) -> crate::error::Result<Self> {
        Self::with_include(ids, false)
    }

    pub fn with_include(ids: Vec<u32>, include: bool) -> crate::error::Result<Self> {
        if ids.len() > OID_MAX_LEN {
            return Err(AgentXError::invalid(format!(
                "oid has {} sub-identifiers, max is {OID_MAX_LEN}",
                ids.len()
            )));
        }
        Ok(Self { ids, include })
    }

    /// Builds an OID without checking `OID_MAX_LEN`, for callers (the
    /// decoder) that have already bounded `n_subid` to a single byte plus
    /// at most 5 prefix-expanded sub-identifiers, i.e. at most 260, and
    /// want to surface the overflow as a protocol error with more context
    /// than a generic invalid-argument.
    pub(crate) fn from_parts_unchecked(ids: Vec<u32>, include: bool) -> Self {
        Self { ids, include }
    }

    pub fn parts(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns a copy of `self` with one more trailing sub-identifier.
    /// Used to build a GetNext/GetBulk search range's exclusive upper
    /// bound from a single OID (`oid.0` as the classic "append a zero"
    /// null terminator).
    pub fn child(&self, sub_id: u32) -> Self {
        let mut ids = self.ids.clone();
        ids.push(sub_id);
        Self {
            ids,
            include: false,
        }
    }

    /// Five-valued comparison; see [`OidOrdering`].
    pub fn compare(&self, other: &Oid) -> OidOrdering {
        let min = self.ids.len().min(other.ids.len());
        for i in 0..min {
            if self.ids[i] < other.ids[i] {
                return OidOrdering::Less;
            }
            if self.ids[i] > other.ids[i] {
                return OidOrdering::Greater;
            }
        }
        match self.ids.len().cmp(&other.ids.len()) {
            std::cmp::Ordering::Less => OidOrdering::LeftPrefix,
            std::cmp::Ordering::Greater => OidOrdering::RightPrefix,
            std::cmp::Ordering::Equal => OidOrdering::Equal,
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.ids {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = AgentXError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.');
        if s.is_empty() {
            return Oid::new(Vec::new());
        }
        let ids = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| AgentXError::invalid(format!("not a valid OID: {s:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Oid::new(ids)
    }
}
