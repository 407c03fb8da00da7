//! Graph persistence: the serialized format and `serialize`/`configure`.
//!
//! The format matches the shape consumers expect from node-graph
//! editors: verbose node objects, positional link arrays, group records
//! and the id counters. Unknown fields on a node survive a load/save
//! round trip via a flattened catch-all map, and unknown node *types*
//! are replaced by error-flagged placeholders that keep their original
//! payload — one bad node never aborts a load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slint::Color;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, GraphConfig};
use crate::group::Group;
use crate::link::{Link, LinkId};
use crate::node::{InputSlot, Node, NodeId, NodeMode, OutputSlot};
use crate::registry::NodeRegistry;

/// Version stamp written into serialized graphs.
pub const FORMAT_VERSION: u32 = 1;

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// `#RRGGBB` (or shorthand `#RGB`) to a Slint color.
pub fn parse_color(text: &str) -> Option<Color> {
    let hex = text.strip_prefix('#')?;
    let (r, g, b) = match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
            (
                digit(0)? * 17, // 0xF -> 0xFF
                digit(1)? * 17,
                digit(2)? * 17,
            )
        }
        6 => (
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ),
        _ => return None,
    };
    Some(Color::from_rgb_u8(r, g, b))
}

/// Slint color to `#RRGGBB`.
pub fn color_to_hex(color: Color) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red(), color.green(), color.blue())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedInput {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub link: Option<LinkId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub links: Vec<LinkId>,
}

/// One node on the wire. `extra` flattens unrecognized fields so foreign
/// payloads survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub title: String,
    pub pos: [f32; 2],
    pub size: [f32; 2],
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub order: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pinned: bool,
    #[serde(default)]
    pub inputs: Vec<SerializedInput>,
    #[serde(default)]
    pub outputs: Vec<SerializedOutput>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widgets_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgcolor: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SerializedNode {
    /// Snapshot a live node. Placeholder nodes re-emit their retained
    /// payload verbatim so nothing is lost across load/save.
    pub fn from_node(node: &Node) -> Self {
        if let Some(stored) = &node.stored {
            if let Ok(mut payload) = serde_json::from_value::<SerializedNode>(stored.clone()) {
                payload.pos = [node.pos.0, node.pos.1];
                return payload;
            }
        }
        SerializedNode {
            id: node.id,
            type_name: node.type_name.clone(),
            title: node.title.clone(),
            pos: [node.pos.0, node.pos.1],
            size: [node.size.0, node.size.1],
            mode: node.mode,
            order: node.order,
            collapsed: node.collapsed,
            pinned: node.pinned,
            inputs: node
                .inputs
                .iter()
                .map(|slot| SerializedInput {
                    name: slot.name.clone(),
                    ty: slot.ty.clone(),
                    link: slot.link,
                })
                .collect(),
            outputs: node
                .outputs
                .iter()
                .map(|slot| SerializedOutput {
                    name: slot.name.clone(),
                    ty: slot.ty.clone(),
                    links: slot.links.clone(),
                })
                .collect(),
            properties: node.properties.clone(),
            widgets_values: node.widgets.iter().map(|w| w.value.clone()).collect(),
            color: node.color.map(color_to_hex),
            bgcolor: node.bgcolor.map(color_to_hex),
            extra: serde_json::Map::new(),
        }
    }

    /// Build a live node from this record, resolving the type through
    /// the registry. Unknown types produce an error-flagged placeholder
    /// keeping the full payload; the `bool` reports that substitution.
    pub fn instantiate(&self, registry: &NodeRegistry) -> (Node, bool) {
        let (mut node, missing) = match registry.create(&self.type_name) {
            Some(node) => (node, false),
            None => {
                log::warn!("unknown node type '{}', substituting placeholder", self.type_name);
                let payload = serde_json::to_value(self).unwrap_or(Value::Null);
                (registry.create_placeholder(&self.type_name, payload), true)
            }
        };

        node.id = self.id;
        node.pos = (self.pos[0], self.pos[1]);
        node.size = (self.size[0], self.size[1]);
        node.mode = self.mode;
        node.order = self.order;
        node.collapsed = self.collapsed;
        node.pinned = self.pinned;
        if !self.title.is_empty() {
            node.title = self.title.clone();
        }
        if !self.properties.is_empty() {
            for (key, value) in &self.properties {
                node.properties.insert(key.clone(), value.clone());
            }
        }
        for (widget, value) in node.widgets.iter_mut().zip(&self.widgets_values) {
            widget.value = value.clone();
        }
        if !self.inputs.is_empty() || !self.outputs.is_empty() {
            node.inputs = self
                .inputs
                .iter()
                .map(|slot| InputSlot {
                    name: slot.name.clone(),
                    ty: slot.ty.clone(),
                    link: slot.link,
                })
                .collect();
            node.outputs = self
                .outputs
                .iter()
                .map(|slot| OutputSlot {
                    name: slot.name.clone(),
                    ty: slot.ty.clone(),
                    links: slot.links.clone(),
                })
                .collect();
        }
        if let Some(color) = self.color.as_deref().and_then(parse_color) {
            node.color = Some(color);
        }
        if let Some(color) = self.bgcolor.as_deref().and_then(parse_color) {
            node.bgcolor = Some(color);
        }
        (node, missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGroup {
    pub title: String,
    /// `[x, y, width, height]`, rounded to whole units.
    pub bounding: [f32; 4],
    pub color: String,
    pub font_size: f32,
}

impl SerializedGroup {
    pub fn from_group(group: &Group) -> Self {
        let b = group.bounding;
        Self {
            title: group.title.clone(),
            bounding: [b.x.round(), b.y.round(), b.width.round(), b.height.round()],
            color: color_to_hex(group.color),
            font_size: group.font_size,
        }
    }

    pub fn to_group(&self) -> Group {
        let mut group = Group::new(self.title.clone());
        group.bounding = crate::geometry::Rect::new(
            self.bounding[0],
            self.bounding[1],
            self.bounding[2],
            self.bounding[3],
        );
        if let Some(color) = parse_color(&self.color) {
            group.color = color;
        }
        group.font_size = self.font_size;
        group
    }
}

/// The whole graph on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    /// Positional arrays, see [`Link`]'s serde impl.
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub groups: Vec<SerializedGroup>,
    #[serde(default)]
    pub config: GraphConfig,
    #[serde(default)]
    pub extra: Value,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub last_node_id: NodeId,
    #[serde(default)]
    pub last_link_id: LinkId,
}

impl Graph {
    /// Snapshot the graph into its serializable form.
    pub fn serialize(&self) -> SerializedGraph {
        let mut links: Vec<Link> = self.links().cloned().collect();
        links.sort_by_key(|l| l.id);

        SerializedGraph {
            nodes: self.nodes().map(SerializedNode::from_node).collect(),
            links,
            groups: self.groups().iter().map(SerializedGroup::from_group).collect(),
            config: self.config.clone(),
            extra: self.extra.clone(),
            version: FORMAT_VERSION,
            last_node_id: self.last_node_id(),
            last_link_id: self.last_link_id(),
        }
    }

    /// Rebuild this graph from serialized data, resolving node types
    /// through `registry`.
    ///
    /// Returns `true` when anything had to be recovered (unknown node
    /// type, link with dangling endpoints); the graph still loads.
    pub fn configure(&mut self, data: &SerializedGraph, registry: &NodeRegistry) -> bool {
        self.clear();
        self.config = data.config.clone();
        self.extra = data.extra.clone();
        let mut recovered = false;

        for record in &data.nodes {
            let (node, missing) = record.instantiate(registry);
            recovered |= missing;
            if let Err(err) = self.add_node_internal(node, true) {
                log::error!("node {} dropped during configure: {err}", record.id);
                recovered = true;
            }
        }

        for link in &data.links {
            if self.resolves(link) {
                self.insert_link_raw(link.clone());
            } else {
                log::warn!("serialized link {} has dangling endpoints, skipping", link.id);
                recovered = true;
            }
        }
        self.rebuild_slot_refs();

        for group in &data.groups {
            self.add_group(group.to_group());
        }

        self.set_id_counters(
            data.last_node_id.max(self.last_node_id()),
            data.last_link_id.max(self.last_link_id()),
        );
        self.update_execution_order();
        recovered
    }

    /// Whether a serialized link's endpoints resolve to live slots.
    fn resolves(&self, link: &Link) -> bool {
        let origin_ok = self
            .node(link.origin_id)
            .is_some_and(|n| link.origin_slot < n.outputs.len());
        let target_ok = self
            .node(link.target_id)
            .is_some_and(|n| link.target_slot < n.inputs.len());
        origin_ok && target_ok
    }

    /// Make every slot's link references agree with the link table:
    /// stale ids are dropped, table entries are (re)attached.
    fn rebuild_slot_refs(&mut self) {
        let links: Vec<Link> = self.links().cloned().collect();
        let ids: Vec<NodeId> = self.z_order().to_vec();
        for id in ids {
            if let Some(node) = self.node_mut(id) {
                for input in &mut node.inputs {
                    input.link = None;
                }
                for output in &mut node.outputs {
                    output.links.clear();
                }
            }
        }
        for link in links {
            if let Some(origin) = self.node_mut(link.origin_id) {
                origin.outputs[link.origin_slot].links.push(link.id);
            }
            if let Some(target) = self.node_mut(link.target_id) {
                target.inputs[link.target_slot].link = Some(link.id);
            }
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    /// Configure from a JSON string.
    pub fn configure_from_json(&mut self, json: &str, registry: &NodeRegistry) -> Result<bool> {
        let data: SerializedGraph =
            serde_json::from_str(json).map_err(GraphError::Serialization)?;
        Ok(self.configure(&data, registry))
    }
}
