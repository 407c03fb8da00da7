use slint_graph_canvas::{
    Graph, InputController, Key, Modifiers, NodeId, NodeRegistry, NodeTemplate, PointerEvent,
    RenderPipeline, UiRequest, Viewport, Widget, WidgetKind,
};

/// A full editor stack with a synthetic clock and a small registry of
/// standard node types.
pub struct EditorHarness {
    pub graph: Graph,
    pub viewport: Viewport,
    pub pipeline: RenderPipeline,
    pub controller: InputController,
    pub registry: NodeRegistry,
    clock_ms: f64,
}

impl Default for EditorHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorHarness {
    pub fn new() -> Self {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeTemplate::new("source/const", "Const").with_output("value", "number"),
        );
        registry.register(
            NodeTemplate::new("math/sum", "Sum")
                .with_input("a", "number")
                .with_input("b", "number")
                .with_output("out", "number"),
        );
        registry.register(
            NodeTemplate::new("filter/relay", "Relay")
                .with_input("in", "number")
                .with_output("out", "number"),
        );
        registry.register(NodeTemplate::new("sink/preview", "Preview").with_input("in", "number"));
        registry.register(
            NodeTemplate::new("image/blur", "Blur")
                .with_input("image", "image")
                .with_output("image", "image"),
        );
        registry.register(
            NodeTemplate::new("ui/switch", "Switch").with_widget(Widget::new(
                "enabled",
                WidgetKind::Toggle,
                serde_json::json!(false),
            )),
        );

        let mut viewport = Viewport::new();
        viewport.set_canvas_size(1600.0, 1200.0);

        Self {
            graph: Graph::new(),
            viewport,
            pipeline: RenderPipeline::new(),
            controller: InputController::new(),
            registry,
            clock_ms: 0.0,
        }
    }

    /// Instantiate a registered type at a graph position.
    pub fn add(&mut self, type_name: &str, pos: (f32, f32)) -> NodeId {
        let mut node = self
            .registry
            .create(type_name)
            .unwrap_or_else(|| panic!("type {type_name} not registered"));
        node.pos = pos;
        self.graph.add_node(node).expect("node capacity")
    }

    pub fn advance(&mut self, ms: f64) {
        self.clock_ms += ms;
    }

    pub fn now(&self) -> f64 {
        self.clock_ms
    }

    fn screen(&self, graph_pos: (f32, f32)) -> (f32, f32) {
        self.viewport.convert_offset_to_canvas(graph_pos)
    }

    fn event(&self, graph_pos: (f32, f32), modifiers: Modifiers) -> PointerEvent {
        PointerEvent::new(self.screen(graph_pos), self.clock_ms).with_modifiers(modifiers)
    }

    // ========================================================================
    // Gesture helpers (graph-space coordinates)
    // ========================================================================

    pub fn pointer_down(&mut self, pos: (f32, f32)) {
        self.pointer_down_mod(pos, Modifiers::default());
    }

    pub fn pointer_down_mod(&mut self, pos: (f32, f32), modifiers: Modifiers) {
        let event = self.event(pos, modifiers);
        self.controller
            .pointer_down(event, &mut self.graph, &self.viewport, &mut self.pipeline);
    }

    pub fn pointer_move(&mut self, pos: (f32, f32)) {
        self.advance(16.0);
        let event = self.event(pos, Modifiers::default());
        self.controller.pointer_move(
            event,
            &mut self.graph,
            &mut self.viewport,
            &mut self.pipeline,
        );
    }

    pub fn pointer_up(&mut self, pos: (f32, f32)) {
        self.pointer_up_mod(pos, Modifiers::default());
    }

    pub fn pointer_up_mod(&mut self, pos: (f32, f32), modifiers: Modifiers) {
        self.advance(16.0);
        let event = self.event(pos, modifiers);
        self.controller
            .pointer_up(event, &mut self.graph, &self.viewport, &mut self.pipeline);
    }

    /// A clean, isolated click (never merges into a double-click).
    pub fn click(&mut self, pos: (f32, f32)) {
        self.click_mod(pos, Modifiers::default());
    }

    pub fn click_mod(&mut self, pos: (f32, f32), modifiers: Modifiers) {
        self.advance(500.0);
        self.pointer_down_mod(pos, modifiers);
        self.advance(40.0);
        let event = self.event(pos, modifiers);
        self.controller
            .pointer_up(event, &mut self.graph, &self.viewport, &mut self.pipeline);
    }

    /// Two clicks inside the double-click window.
    pub fn double_click(&mut self, pos: (f32, f32)) {
        self.click(pos);
        self.advance(100.0);
        self.pointer_down(pos);
        self.advance(40.0);
        self.pointer_up_mod(pos, Modifiers::default());
    }

    /// Press, move through `via`, release at `to`.
    pub fn drag(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.drag_mod(from, to, Modifiers::default());
    }

    pub fn drag_mod(&mut self, from: (f32, f32), to: (f32, f32), modifiers: Modifiers) {
        self.advance(500.0);
        self.pointer_down_mod(from, modifiers);
        let mid = ((from.0 + to.0) * 0.5, (from.1 + to.1) * 0.5);
        self.pointer_move(mid);
        self.pointer_move(to);
        self.pointer_up_mod(to, modifiers);
    }

    pub fn key(&mut self, key: Key) {
        self.key_mod(key, Modifiers::default());
    }

    pub fn key_mod(&mut self, key: Key, modifiers: Modifiers) {
        self.controller
            .key_down(key, modifiers, &mut self.graph, &mut self.pipeline);
    }

    pub fn wheel(&mut self, delta: f32, pos: (f32, f32)) {
        let screen = self.screen(pos);
        self.controller
            .wheel(delta, screen, &mut self.viewport, &mut self.pipeline);
    }

    /// Render a frame; returns whether any layer was rebuilt.
    pub fn draw(&mut self) -> bool {
        self.pipeline
            .draw_frame(&self.graph, &self.viewport, &self.controller.overlay)
    }

    pub fn requests(&mut self) -> Vec<UiRequest> {
        self.controller.take_requests()
    }

    // ========================================================================
    // Inspection helpers
    // ========================================================================

    pub fn node_pos(&self, id: NodeId) -> (f32, f32) {
        self.graph.node(id).expect("node exists").pos
    }

    pub fn output_anchor(&self, id: NodeId, slot: usize) -> (f32, f32) {
        self.graph
            .node(id)
            .expect("node exists")
            .connection_pos(false, slot)
    }

    pub fn input_anchor(&self, id: NodeId, slot: usize) -> (f32, f32) {
        self.graph
            .node(id)
            .expect("node exists")
            .connection_pos(true, slot)
    }

    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.controller.selection.sorted()
    }
}
