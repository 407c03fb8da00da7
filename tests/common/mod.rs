//! Shared test infrastructure for the integration test suite.
//!
//! The harness wires a graph, viewport, render pipeline and input
//! controller together the way a host application would, and exposes
//! gesture helpers that speak graph coordinates (tests think in graph
//! space; the harness converts to screen space per event).

pub mod harness;
