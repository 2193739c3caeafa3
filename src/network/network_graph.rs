use std::collections::{HashMap, HashSet};

use egui::Pos2;
use egui_graphs::Graph;
use petgraph::stable_graph::EdgeIndex;
use petgraph::{Directed, csr::DefaultIx, graph::NodeIndex, prelude::StableGraph};
use rand::Rng;

use crate::{
    gui::{app, edge_anim, edge_shape::LinkShape, node_shape::DeviceNodeShape},
    network::{
        device::{DeviceNode, DeviceRecord, GATEWAY_SENTINEL, NetworkStats},
        edge::{Link, edge_id},
        style,
    },
};

/// The router anchor stays here; the layout may not move it.
pub const ROUTER_POSITION: Pos2 = Pos2::ZERO;

/// New nodes spawn inside this jitter radius around the anchor so the layout
/// can pull them out without a visible jump from the far corners.
const SPAWN_JITTER: f32 = 100.0;

/// The rendered topology held by the layout engine, plus the identity maps
/// that make incremental reconciliation possible.
///
/// `node_indices` and `edge_ids` mirror the engine's live collections, keyed
/// by device ip (edges by `"<from>-<to>"`). `records` carries the full device
/// records for detail lookups; the engine keeps node payloads fixed after
/// creation, so the mutable side lives here instead.
pub struct TopologyGraph {
    pub graph: Graph<DeviceNode, Link, Directed, DefaultIx, DeviceNodeShape, LinkShape>,
    node_indices: HashMap<String, NodeIndex>,
    edge_ids: HashSet<String>,
    records: HashMap<String, DeviceRecord>,
    router_id: Option<String>,
}

impl Default for TopologyGraph {
    fn default() -> Self {
        let graph: Graph<DeviceNode, Link, Directed, DefaultIx, DeviceNodeShape, LinkShape> =
            egui_graphs::to_graph(&StableGraph::new());
        Self {
            graph,
            node_indices: HashMap::new(),
            edge_ids: HashSet::new(),
            records: HashMap::new(),
            router_id: None,
        }
    }
}

/// Outcome of one reconciliation pass: the converged identity sets plus the
/// stats the caller publishes to the side panel.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub node_ids: HashSet<String>,
    pub edge_ids: HashSet<String>,
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub stats: NetworkStats,
}

impl TopologyGraph {
    pub fn router_id(&self) -> Option<&str> {
        self.router_id.as_deref()
    }

    /// Latest record seen for a rendered node, kept fresh by `reconcile`.
    pub fn record(&self, id: &str) -> Option<&DeviceRecord> {
        self.records.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.node_indices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_ids.len()
    }

    pub fn node_id(&self, idx: NodeIndex) -> Option<String> {
        self.graph.node(idx).map(|n| n.payload().id.clone())
    }

    pub fn node_position(&self, id: &str) -> Option<Pos2> {
        let idx = self.node_indices.get(id)?;
        self.graph.node(*idx).map(|n| n.props().location())
    }

    /// Re-anchor the router every frame. Only a node created as the anchor
    /// is pinned; a regular device later promoted to router identity keeps
    /// its settled position.
    pub fn pin_router(&mut self) {
        let Some(id) = self.router_id.clone() else {
            return;
        };
        if let Some(&idx) = self.node_indices.get(&id) {
            if let Some(node) = self.graph.node_mut(idx) {
                if node.payload().is_router {
                    node.set_location(ROUTER_POSITION);
                }
            }
        }
    }

    /// Reconcile the rendered graph in place against a fresh snapshot.
    ///
    /// - keeps positions for nodes that survive
    /// - adds new nodes with a jittered position near the anchor
    /// - removes vanished nodes and their edges (edges first)
    /// - never touches the router's styling once it exists
    ///
    /// Records without an address are skipped; duplicate addresses are
    /// last-write-wins. The snapshot itself is never mutated.
    pub fn reconcile(
        &mut self,
        snapshot: &[DeviceRecord],
        local_ip: Option<&str>,
    ) -> ReconcileReport {
        let theme = app::get_theme();
        let mut rng = rand::rng();
        let mut report = ReconcileReport::default();

        // 1) Router identity: first typed router or gateway-suffixed address
        //    in snapshot order, else the synthetic sentinel.
        let router_record = snapshot
            .iter()
            .find(|d| !d.ip.is_empty() && d.is_router_candidate());
        let router_id = router_record
            .map(|d| d.ip.clone())
            .unwrap_or_else(|| GATEWAY_SENTINEL.to_string());

        // 2) Router node. Styling is applied once; an established router
        //    keeps its look and pinned position across snapshots.
        report.node_ids.insert(router_id.clone());
        if !self.node_indices.contains_key(&router_id) {
            let node_style = style::router_style(&theme, router_record);
            let idx = self.graph.add_node(DeviceNode {
                id: router_id.clone(),
                is_router: true,
                size: node_style.size,
            });
            if let Some(node) = self.graph.node_mut(idx) {
                node.set_location(ROUTER_POSITION);
                node.set_label(node_style.label);
                node.set_color(node_style.color);
            }
            self.node_indices.insert(router_id.clone(), idx);
            report.nodes_added += 1;
        }
        if let Some(record) = router_record {
            self.records.insert(router_id.clone(), record.clone());
        }
        self.router_id = Some(router_id.clone());

        // 3) Every other device: update in place or create with jitter.
        for device in snapshot {
            if device.ip.is_empty() {
                // Records without an address cannot be keyed; skip instead
                // of failing the pass.
                continue;
            }
            if device.ip == router_id {
                continue;
            }

            let node_style = style::style_for(&theme, device, device.is_local(local_ip));
            report.node_ids.insert(device.ip.clone());

            if let Some(&idx) = self.node_indices.get(&device.ip) {
                // Style and label only; the layout owns the position.
                if let Some(node) = self.graph.node_mut(idx) {
                    node.set_label(node_style.label);
                    node.set_color(node_style.color);
                }
            } else {
                let idx = self.graph.add_node(DeviceNode {
                    id: device.ip.clone(),
                    is_router: false,
                    size: node_style.size,
                });
                if let Some(node) = self.graph.node_mut(idx) {
                    node.set_location(jittered_spawn(&mut rng));
                    node.set_label(node_style.label);
                    node.set_color(node_style.color);
                }
                self.node_indices.insert(device.ip.clone(), idx);
                report.nodes_added += 1;
            }
            self.records.insert(device.ip.clone(), device.clone());

            // 4) Edge to the router, created only when missing so the
            //    fade-in animation does not restart every poll.
            let eid = edge_id(&router_id, &device.ip);
            report.edge_ids.insert(eid.clone());
            if !self.edge_ids.contains(&eid) {
                if let (Some(&r_idx), Some(&d_idx)) = (
                    self.node_indices.get(&router_id),
                    self.node_indices.get(&device.ip),
                ) {
                    self.graph
                        .add_edge(r_idx, d_idx, Link::router_link(&router_id, &device.ip));
                    self.edge_ids.insert(eid.clone());
                    edge_anim::publish_create(&eid);
                    report.edges_added += 1;
                }
            }
        }

        // 5) Removal pass: edges referencing vanished devices go first, then
        //    the nodes themselves. The synthetic sentinel is permanent once
        //    created. Collect before mutating to keep the borrows simple.
        let stale_edges: Vec<(EdgeIndex, String)> = self
            .graph
            .edges_iter()
            .filter_map(|(idx, edge)| {
                let id = edge.payload().id.clone();
                (!report.edge_ids.contains(&id)).then_some((idx, id))
            })
            .collect();
        for (idx, id) in stale_edges {
            let _ = self.graph.remove_edge(idx);
            self.edge_ids.remove(&id);
            report.edges_removed += 1;
        }

        let stale_nodes: Vec<String> = self
            .node_indices
            .keys()
            .filter(|id| !report.node_ids.contains(*id) && id.as_str() != GATEWAY_SENTINEL)
            .cloned()
            .collect();
        for id in stale_nodes {
            if let Some(idx) = self.node_indices.remove(&id) {
                let _ = self.graph.remove_node(idx);
            }
            self.records.remove(&id);
            report.nodes_removed += 1;
        }

        // 6) Stats for the caller's panels.
        report.stats = NetworkStats::from_devices(snapshot);
        report
    }
}

fn jittered_spawn(rng: &mut impl Rng) -> Pos2 {
    Pos2::new(
        rng.random_range(-SPAWN_JITTER..SPAWN_JITTER),
        rng.random_range(-SPAWN_JITTER..SPAWN_JITTER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::device::DeviceType;

    fn device(ip: &str, kind: DeviceType) -> DeviceRecord {
        DeviceRecord {
            ip: ip.to_string(),
            kind,
            active: true,
            hostname: None,
            mac: None,
            vendor: None,
            latency: None,
            ports: Vec::new(),
        }
    }

    #[test]
    fn converges_to_snapshot_sets() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.5", DeviceType::Mobile),
        ];
        let report = graph.reconcile(&snapshot, None);

        let mut expected_nodes = HashSet::new();
        expected_nodes.insert("192.168.1.1".to_string());
        expected_nodes.insert("192.168.1.5".to_string());
        assert_eq!(report.node_ids, expected_nodes);

        let mut expected_edges = HashSet::new();
        expected_edges.insert("192.168.1.1-192.168.1.5".to_string());
        assert_eq!(report.edge_ids, expected_edges);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.router_id(), Some("192.168.1.1"));

        assert_eq!(report.stats.total, 2);
        assert_eq!(report.stats.mobile, 1);
        assert_eq!(report.stats.desktop, 0);
        assert_eq!(report.stats.server, 0);
        assert_eq!(report.stats.other, 0);
    }

    #[test]
    fn keeps_position_of_surviving_nodes() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.5", DeviceType::Mobile),
        ];
        graph.reconcile(&snapshot, None);
        let before = graph.node_position("192.168.1.5").unwrap();

        // Same device reclassified and gone offline: styling changes, the
        // settled position must not.
        let mut changed = device("192.168.1.5", DeviceType::Server);
        changed.active = false;
        let snapshot = vec![device("192.168.1.1", DeviceType::Router), changed];
        graph.reconcile(&snapshot, None);
        let after = graph.node_position("192.168.1.5").unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn second_pass_is_idempotent() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.5", DeviceType::Mobile),
            device("192.168.1.9", DeviceType::Desktop),
        ];
        let first = graph.reconcile(&snapshot, None);
        assert_eq!(first.nodes_added, 3);

        let second = graph.reconcile(&snapshot, None);
        assert_eq!(second.nodes_added, 0);
        assert_eq!(second.nodes_removed, 0);
        assert_eq!(second.edges_added, 0);
        assert_eq!(second.edges_removed, 0);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn first_gateway_suffix_wins_router_identity() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Unknown),
            device("10.0.0.1", DeviceType::Unknown),
        ];
        let report = graph.reconcile(&snapshot, None);

        assert_eq!(graph.router_id(), Some("192.168.1.1"));
        // The second gateway-suffixed address renders as a normal device,
        // wired to the chosen router.
        assert!(report.node_ids.contains("10.0.0.1"));
        assert!(report.edge_ids.contains("192.168.1.1-10.0.0.1"));
    }

    #[test]
    fn sentinel_anchors_routerless_snapshots_and_persists() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![device("192.168.1.23", DeviceType::Desktop)];
        let report = graph.reconcile(&snapshot, None);

        assert_eq!(graph.router_id(), Some(GATEWAY_SENTINEL));
        assert!(report.node_ids.contains(GATEWAY_SENTINEL));
        assert!(report.edge_ids.contains("gateway-192.168.1.23"));

        // A real router appears: the sentinel loses its edges but stays.
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.23", DeviceType::Desktop),
        ];
        let report = graph.reconcile(&snapshot, None);
        assert_eq!(graph.router_id(), Some("192.168.1.1"));
        assert!(!report.node_ids.contains(GATEWAY_SENTINEL));
        assert!(graph.node_position(GATEWAY_SENTINEL).is_some());
        assert!(!report.edge_ids.contains("gateway-192.168.1.23"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn removes_vanished_device_and_its_edge() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.5", DeviceType::Mobile),
            device("192.168.1.9", DeviceType::Desktop),
        ];
        graph.reconcile(&snapshot, None);
        let kept_pos = graph.node_position("192.168.1.9").unwrap();

        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.9", DeviceType::Desktop),
        ];
        let report = graph.reconcile(&snapshot, None);
        assert_eq!(report.nodes_removed, 1);
        assert_eq!(report.edges_removed, 1);
        assert!(graph.node_position("192.168.1.5").is_none());
        assert!(graph.record("192.168.1.5").is_none());
        // Removal leaves the survivors' positions alone.
        assert_eq!(graph.node_position("192.168.1.9").unwrap(), kept_pos);
    }

    #[test]
    fn skips_records_without_an_address() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![device("", DeviceType::Desktop)];
        let report = graph.reconcile(&snapshot, None);
        assert_eq!(graph.node_count(), 1);
        assert!(report.node_ids.contains(GATEWAY_SENTINEL));
        assert!(report.edge_ids.is_empty());
    }

    #[test]
    fn duplicate_address_is_last_write_wins() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![
            device("192.168.1.1", DeviceType::Router),
            device("192.168.1.5", DeviceType::Mobile),
            device("192.168.1.5", DeviceType::Server),
        ];
        graph.reconcile(&snapshot, None);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.record("192.168.1.5").unwrap().kind,
            DeviceType::Server
        );
    }

    #[test]
    fn router_keeps_styling_once_established() {
        let mut graph = TopologyGraph::default();
        let snapshot = vec![device("192.168.1.1", DeviceType::Router)];
        graph.reconcile(&snapshot, None);
        let anchor = graph.node_position("192.168.1.1").unwrap();
        assert_eq!(anchor, ROUTER_POSITION);

        // Repeated reconciles leave the anchor exactly where it was created.
        graph.reconcile(&snapshot, None);
        assert_eq!(graph.node_position("192.168.1.1").unwrap(), anchor);
    }
}
