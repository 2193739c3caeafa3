/*
 * This module defines the device-level graph format used by the GUI.
 * It also provides the reconciliation logic that keeps the rendered
 * graph converged with each scan snapshot.
 */

pub mod device;
pub mod edge;
pub mod network_graph;
pub mod style;
