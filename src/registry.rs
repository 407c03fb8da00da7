//! Node type registry: maps type name strings to node templates.
//!
//! The registry is the only place nodes are built. `configure()` resolves
//! serialized type names through it, and substitutes an error-flagged
//! placeholder (preserving the original payload) when a type is unknown,
//! so loading never silently drops a node.
//!
//! # Example
//!
//! ```ignore
//! use slint_graph_canvas::{NodeRegistry, NodeTemplate};
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(
//!     NodeTemplate::new("math/sum", "Sum")
//!         .with_input("a", "number")
//!         .with_input("b", "number")
//!         .with_output("out", "number"),
//! );
//!
//! let node = registry.create("math/sum").unwrap();
//! assert_eq!(node.inputs.len(), 2);
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::node::{Node, NodeBehavior, Widget};

/// Blueprint for one node type: slots, defaults and an optional shared
/// behavior object.
#[derive(Clone)]
pub struct NodeTemplate {
    pub type_name: String,
    pub title: String,
    pub inputs: Vec<(String, String)>,
    pub outputs: Vec<(String, String)>,
    pub size: Option<(f32, f32)>,
    pub properties: serde_json::Map<String, Value>,
    pub widgets: Vec<Widget>,
    pub priority: i32,
    pub behavior: Option<Rc<dyn NodeBehavior>>,
}

impl NodeTemplate {
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            title: title.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            size: None,
            properties: serde_json::Map::new(),
            widgets: Vec::new(),
            priority: 0,
            behavior: None,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.inputs.push((name.into(), ty.into()));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.outputs.push((name.into(), ty.into()));
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_behavior(mut self, behavior: Rc<dyn NodeBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }
}

/// Registry of node templates keyed by type name.
///
/// A default behavior may be installed once and is consulted at
/// construction time for every template that does not bring its own; this
/// is how shared capabilities reach all existing and future types without
/// mutating registered templates.
#[derive(Default)]
pub struct NodeRegistry {
    templates: HashMap<String, NodeTemplate>,
    default_behavior: Option<Rc<dyn NodeBehavior>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a template.
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.type_name.clone(), template);
    }

    /// Remove a template. Returns whether it existed.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.templates.remove(type_name).is_some()
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.templates.contains_key(type_name)
    }

    /// Registered type names, unordered.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Behavior applied to every node whose template has none of its own.
    pub fn set_default_behavior(&mut self, behavior: Rc<dyn NodeBehavior>) {
        self.default_behavior = Some(behavior);
    }

    /// Instantiate a node of the given type, or `None` for unknown types.
    pub fn create(&self, type_name: &str) -> Option<Node> {
        let template = self.templates.get(type_name)?;
        let mut node = Node::new(&template.type_name, &template.title);
        for (name, ty) in &template.inputs {
            node.add_input(name.clone(), ty.clone());
        }
        for (name, ty) in &template.outputs {
            node.add_output(name.clone(), ty.clone());
        }
        node.properties = template.properties.clone();
        node.widgets = template.widgets.clone();
        node.priority = template.priority;
        node.behavior = template
            .behavior
            .clone()
            .or_else(|| self.default_behavior.clone());
        node.size = template.size.unwrap_or_else(|| node.compute_size());
        Some(node)
    }

    /// Build the error-flagged stand-in for a node whose type is missing,
    /// keeping the serialized payload so a later save loses nothing.
    pub fn create_placeholder(&self, type_name: &str, payload: Value) -> Node {
        let mut node = Node::new(type_name, format!("{} (missing)", type_name));
        node.has_errors = true;
        node.stored = Some(payload);
        node
    }
}
