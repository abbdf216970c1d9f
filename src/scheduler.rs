//! Multi-tick handover planning over a time-expanded graph.
//!
//! Each tick of the horizon contributes one layer of nodes, one per RSU
//! predicted to be in range at that tick. Edges join consecutive layers and
//! carry the negated predicted link quality of the node they enter, so the
//! minimum-weight path from `start` to `end` is the handover sequence with
//! the greatest total quality. The graph is acyclic by construction, which
//! lets a single relaxation pass in topological order find that path even
//! though every weight is negative.

use crate::error::Result;
use crate::link_quality::LinkQualityModel;
use crate::roster::{Roster, RsuId};
use crate::scene::Scene;
use crate::simulator::VehicleId;
use crate::trajectory::Kinematics;
use cgmath::MetricSpace;
use itertools::Itertools;
use pathfinding::directed::topological_sort::topological_sort;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

/// Default planning horizon, in ticks.
pub const DEFAULT_HORIZON: usize = 10;

/// Path weights closer than this are considered equal.
const WEIGHT_EPSILON: f64 = 1e-12;

new_key_type! {
    /// Unique ID of a node in a [TimeExpandedGraph].
    pub struct NodeId;
}

/// What a node of the time-expanded graph stands for.
/// Ordered `Start < Rsu(..) < End`, with RSUs ordered by ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Start,
    Rsu(RsuId),
    End,
}

/// A candidate (or sentinel) paired with the tick offset it applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeExpandedNode {
    pub kind: NodeKind,
    pub tick: usize,
}

/// A directed edge between nodes, weighted by the negated predicted
/// quality of the node it enters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

/// The layered, acyclic graph of candidate RSUs over a planning horizon.
#[derive(Clone, Debug)]
pub struct TimeExpandedGraph {
    nodes: SlotMap<NodeId, TimeExpandedNode>,
    /// Outgoing edges of each node.
    edges: SecondaryMap<NodeId, Vec<ScheduleEdge>>,
    start: NodeId,
    end: NodeId,
}

/// A planned handover sequence, from `start` to `end`.
///
/// When no RSU is predicted to be reachable during the horizon, the
/// schedule is the single node `(start, 0)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    nodes: Vec<TimeExpandedNode>,
    total_quality: f64,
}

/// Plans the sequence of RSU associations maximising the summed predicted
/// link quality over the next `horizon` ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizonOptimalScheduler {
    pub horizon: usize,
    /// Distance beyond which an RSU is not a candidate.
    pub range_threshold: f64,
    /// The model used to predict the quality of each candidate.
    pub link: LinkQualityModel,
}

impl TimeExpandedGraph {
    fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let start = nodes.insert(TimeExpandedNode {
            kind: NodeKind::Start,
            tick: 0,
        });
        let mut edges = SecondaryMap::new();
        edges.insert(start, vec![]);
        Self {
            nodes,
            edges,
            start,
            end: NodeId::default(),
        }
    }

    fn add_node(&mut self, kind: NodeKind, tick: usize) -> NodeId {
        let id = self.nodes.insert(TimeExpandedNode { kind, tick });
        self.edges.insert(id, vec![]);
        id
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, weight: f64) {
        if let Some(out) = self.edges.get_mut(from) {
            out.push(ScheduleEdge { from, to, weight });
        }
    }

    /// The synthetic start node.
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// The synthetic end node.
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Gets a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&TimeExpandedNode> {
        self.nodes.get(id)
    }

    /// Returns an iterator over all the nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TimeExpandedNode)> {
        self.nodes.iter()
    }

    /// Returns an iterator over all the edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &ScheduleEdge> {
        self.edges.values().flatten()
    }

    /// The outgoing edges of a node.
    pub fn edges_from(&self, id: NodeId) -> &[ScheduleEdge] {
        self.edges.get(id).map(|out| out.as_slice()).unwrap_or(&[])
    }

    /// Finds the minimum-weight (maximum-quality) path from `start` to `end`
    /// by relaxing edges in topological order.
    ///
    /// Among equal-weight paths, the one visiting the lowest RSU ID at the
    /// earliest point of divergence is chosen.
    pub fn longest_path(&self) -> Schedule {
        let order = match topological_sort(&[self.start], |id| {
            self.edges_from(*id).iter().map(|edge| edge.to).collect::<Vec<_>>()
        }) {
            Ok(order) => order,
            Err(node) => {
                log::error!("Time-expanded graph has a cycle through {:?}", node);
                return Schedule::unreachable();
            }
        };

        let mut dist = SecondaryMap::<NodeId, f64>::new();
        let mut pred = SecondaryMap::<NodeId, NodeId>::new();
        dist.insert(self.start, 0.0);

        for from in order {
            let Some(&base) = dist.get(from) else {
                continue;
            };
            for edge in self.edges_from(from) {
                let weight = base + edge.weight;
                let better = match dist.get(edge.to) {
                    None => true,
                    Some(&current) if weight < current - WEIGHT_EPSILON => true,
                    Some(&current) if weight <= current + WEIGHT_EPSILON => {
                        self.path_key(&pred, from) < self.path_key(&pred, pred[edge.to])
                    }
                    Some(_) => false,
                };
                if better {
                    dist.insert(edge.to, weight);
                    pred.insert(edge.to, from);
                }
            }
        }

        let Some(&weight) = dist.get(self.end) else {
            return Schedule::unreachable();
        };
        let mut path = vec![self.end];
        while let Some(&prev) = pred.get(path[path.len() - 1]) {
            path.push(prev);
        }
        Schedule {
            nodes: path.iter().rev().map(|id| self.nodes[*id]).collect(),
            total_quality: -weight,
        }
    }

    /// The sequence of node kinds on the best known path from `start` to `id`.
    fn path_key(&self, pred: &SecondaryMap<NodeId, NodeId>, id: NodeId) -> Vec<NodeKind> {
        let mut key = vec![self.nodes[id].kind];
        let mut id = id;
        while let Some(&prev) = pred.get(id) {
            key.push(self.nodes[prev].kind);
            id = prev;
        }
        key.reverse();
        key
    }
}

impl Schedule {
    /// The schedule of a vehicle with no predicted connectivity.
    pub fn unreachable() -> Self {
        Self {
            nodes: vec![TimeExpandedNode {
                kind: NodeKind::Start,
                tick: 0,
            }],
            total_quality: 0.0,
        }
    }

    /// All nodes of the schedule, sentinels included.
    pub fn nodes(&self) -> &[TimeExpandedNode] {
        &self.nodes
    }

    /// Whether any RSU is predicted to be reachable during the horizon.
    pub fn is_reachable(&self) -> bool {
        self.nodes.iter().any(|node| node.kind == NodeKind::End)
    }

    /// The planned RSU at each scheduled tick offset.
    pub fn rsu_sequence(&self) -> Vec<(usize, RsuId)> {
        self.nodes
            .iter()
            .filter_map(|node| match node.kind {
                NodeKind::Rsu(id) => Some((node.tick, id)),
                _ => None,
            })
            .collect()
    }

    /// The first planned association, if there is one.
    pub fn first(&self) -> Option<(usize, RsuId)> {
        self.rsu_sequence().first().copied()
    }

    /// The number of times the planned serving RSU changes.
    pub fn handovers(&self) -> usize {
        self.rsu_sequence()
            .iter()
            .tuple_windows()
            .filter(|(a, b)| a.1 != b.1)
            .count()
    }

    /// The summed predicted quality of every scheduled association.
    pub fn total_quality(&self) -> f64 {
        self.total_quality
    }
}

impl HorizonOptimalScheduler {
    /// Builds the time-expanded graph for one vehicle.
    ///
    /// Layers with no RSU in range are skipped: the next layer connects to
    /// the most recent non-empty one, so a momentary gap in coverage does
    /// not disconnect the graph.
    pub fn build_graph(
        &self,
        kin: &Kinematics,
        roster: &Roster,
        scene: &Scene,
        subject: &VehicleId,
    ) -> Result<TimeExpandedGraph> {
        let mut graph = TimeExpandedGraph::new();
        let mut live = vec![graph.start];

        for tick in 1..=self.horizon {
            let pos = kin.predict(tick as f64)?;
            let obstacles = scene.obstacles_at(tick as f64, subject).collect::<Vec<_>>();
            let mut current = vec![];
            for rsu in roster.iter() {
                if pos.distance(rsu.position()) > self.range_threshold {
                    continue;
                }
                let quality = self.link.evaluate(pos, rsu.position(), &obstacles);
                let node = graph.add_node(NodeKind::Rsu(rsu.id()), tick);
                for from in &live {
                    graph.add_edge(*from, node, -quality.strength);
                }
                current.push(node);
            }
            if !current.is_empty() {
                live = current;
            }
        }

        graph.end = graph.add_node(NodeKind::End, self.horizon + 1);
        if live != [graph.start] {
            for from in live {
                graph.add_edge(from, graph.end, 0.0);
            }
        }
        Ok(graph)
    }

    /// Computes the optimal handover schedule for one vehicle.
    pub fn plan(
        &self,
        kin: &Kinematics,
        roster: &Roster,
        scene: &Scene,
        subject: &VehicleId,
    ) -> Result<Schedule> {
        let schedule = self.build_graph(kin, roster, scene, subject)?.longest_path();
        log::debug!(
            "Planned {} associations with {} handovers for {}",
            schedule.rsu_sequence().len(),
            schedule.handovers(),
            subject
        );
        Ok(schedule)
    }
}
