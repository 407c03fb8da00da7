//! Links: typed directed edges between an output slot and an input slot.
//!
//! Links are owned by the graph's link table; nodes only hold link *ids*.
//! On the wire a link is a positional array
//! `[id, origin_id, origin_slot, target_id, target_slot, type]` for
//! compactness, but the object form is accepted on load for compatibility
//! with hand-written graph files.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Unique identifier of a link within one graph.
pub type LinkId = u64;

/// A directed edge from `(origin_id, origin_slot)` (an output) to
/// `(target_id, target_slot)` (an input).
///
/// `ty` is copied from the origin output's slot type at creation time so
/// the renderer can color links without chasing the origin node.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
    pub ty: String,
}

impl Link {
    pub fn new(
        id: LinkId,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
        ty: impl Into<String>,
    ) -> Self {
        Self {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            ty: ty.into(),
        }
    }
}

/// Whether an output of type `from` may be connected to an input of type
/// `to`.
///
/// Rules: the empty string and `"*"` are wildcards that accept anything;
/// otherwise the comparison is case-insensitive string equality.
pub fn is_valid_connection(from: &str, to: &str) -> bool {
    if from.is_empty() || from == "*" || to.is_empty() || to == "*" {
        return true;
    }
    from.eq_ignore_ascii_case(to)
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(6))?;
        seq.serialize_element(&self.id)?;
        seq.serialize_element(&self.origin_id)?;
        seq.serialize_element(&self.origin_slot)?;
        seq.serialize_element(&self.target_id)?;
        seq.serialize_element(&self.target_slot)?;
        seq.serialize_element(&self.ty)?;
        seq.end()
    }
}

/// Accepts both serialized forms: the compact positional array and the
/// verbose object.
#[derive(Deserialize)]
#[serde(untagged)]
enum LinkRepr {
    Packed(LinkId, NodeId, usize, NodeId, usize, String),
    Object {
        id: LinkId,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
        #[serde(default, rename = "type")]
        ty: String,
    },
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = LinkRepr::deserialize(deserializer)
            .map_err(|_| de::Error::custom("link must be a 6-element array or an object"))?;
        Ok(match repr {
            LinkRepr::Packed(id, origin_id, origin_slot, target_id, target_slot, ty) => {
                Link::new(id, origin_id, origin_slot, target_id, target_slot, ty)
            }
            LinkRepr::Object {
                id,
                origin_id,
                origin_slot,
                target_id,
                target_slot,
                ty,
            } => Link::new(id, origin_id, origin_slot, target_id, target_slot, ty),
        })
    }
}
