// clos-failover: Simulation of Local Fast-Failover Routing in Fat-Tree (CLOS) Datacenter Networks
// Copyright (C) 2024-2025 the clos-failover developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! The fat-tree (CLOS) router graph.
//!
//! A network with port count `k` consists of `k` pods and `k/2` blocks. Each pod
//! holds `k/2` top and `k/2` bottom routers forming a complete bipartite graph;
//! block `b` holds `k/2` routers whose downward link `i` reaches pod `i`'s top
//! router at position `b`. Routers live in a single arena owned by [`Network`] and
//! reference each other through stable [`RouterId`] handles, so links, failure
//! flags, and candidate sets are plain index arrays without ownership cycles.
//!
//! For the topology itself see: Al-Fares, Loukissas and Vahdat, "A scalable,
//! commodity data center network architecture", ACM SIGCOMM CCR 38 (2008).

use std::fmt;

use itertools::Itertools;
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, failures::FailureSummary, routing::Strategy};

/// Stable handle of a router in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouterId(pub(crate) usize);

/// Handle of a pod (`0..k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PodId(pub(crate) usize);

/// Handle of a block (`0..k/2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub(crate) usize);

impl RouterId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl PodId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl BlockId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Position of a router in the two-layer fat-tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum RouterKind {
    /// Aggregation router inside a block; downward links only, one per pod.
    Block,
    /// Upper router of a pod; `k/2` upward links into its block and `k/2`
    /// downward links to the pod's bottom routers.
    Top,
    /// Lower router of a pod; upward links only. Packet destinations always lie
    /// on the bottom layer.
    Bottom,
}

/// Link direction relative to the fat-tree hierarchy (blocks on top, bottom
/// routers at the leaves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Direction {
    #[strum(serialize = "upward")]
    Up,
    #[strum(serialize = "downward")]
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// Owning group of a router: pods own top and bottom routers, blocks own block
/// routers. Mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    Pod(PodId),
    Block(BlockId),
}

/// A single router of the fat-tree.
///
/// Links are wired once at construction and never resized; the parallel failure
/// flag arrays carry the transient link state of the current run, and the
/// candidate sets are derived from them by [`Network::compute_routing_state`].
#[derive(Debug, Clone)]
pub struct Router {
    /// Random identity tag, used only for hashing (never for equality).
    pub(crate) hash_tag: u32,
    pub(crate) kind: RouterKind,
    /// Index within the owning pod layer or block (`0..k/2`).
    pub(crate) position: usize,
    pub(crate) owner: Owner,
    pub(crate) up: Vec<RouterId>,
    pub(crate) down: Vec<RouterId>,
    pub(crate) up_failed: Vec<bool>,
    pub(crate) down_failed: Vec<bool>,
    pub(crate) up_candidates: Vec<RouterId>,
    pub(crate) down_candidates: Vec<RouterId>,
    /// Packets forwarded by this router in the current run (saturating).
    pub(crate) load: u64,
}

impl Router {
    fn new(hash_tag: u32, kind: RouterKind, position: usize, owner: Owner, k: usize) -> Self {
        let half = k / 2;
        let (up_degree, down_degree) = match kind {
            RouterKind::Block => (0, k),
            RouterKind::Top => (half, half),
            RouterKind::Bottom => (half, 0),
        };
        Router {
            hash_tag,
            kind,
            position,
            owner,
            up: vec![RouterId(usize::MAX); up_degree],
            down: vec![RouterId(usize::MAX); down_degree],
            up_failed: vec![false; up_degree],
            down_failed: vec![false; down_degree],
            up_candidates: Vec::new(),
            down_candidates: Vec::new(),
            load: 0,
        }
    }

    pub fn kind(&self) -> RouterKind {
        self.kind
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Owning pod for top and bottom routers.
    pub fn pod(&self) -> Option<PodId> {
        match self.owner {
            Owner::Pod(p) => Some(p),
            Owner::Block(_) => None,
        }
    }

    /// Owning block for block routers.
    pub fn block(&self) -> Option<BlockId> {
        match self.owner {
            Owner::Pod(_) => None,
            Owner::Block(b) => Some(b),
        }
    }

    pub fn hash_tag(&self) -> u32 {
        self.hash_tag
    }

    pub fn load(&self) -> u64 {
        self.load
    }

    /// Fixed links in the given direction, in wiring order.
    pub fn links(&self, direction: Direction) -> &[RouterId] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Failure flags parallel to [`Router::links`].
    pub fn failed(&self, direction: Direction) -> &[bool] {
        match direction {
            Direction::Up => &self.up_failed,
            Direction::Down => &self.down_failed,
        }
    }

    pub(crate) fn failed_mut(&mut self, direction: Direction) -> &mut [bool] {
        match direction {
            Direction::Up => &mut self.up_failed,
            Direction::Down => &mut self.down_failed,
        }
    }

    /// Unfailed peers eligible for hashed selection, in original link order.
    /// Empty until the routing state has been computed.
    pub fn candidates(&self, direction: Direction) -> &[RouterId] {
        match direction {
            Direction::Up => &self.up_candidates,
            Direction::Down => &self.down_candidates,
        }
    }

    pub(crate) fn set_candidates(&mut self, direction: Direction, candidates: Vec<RouterId>) {
        match direction {
            Direction::Up => self.up_candidates = candidates,
            Direction::Down => self.down_candidates = candidates,
        }
    }

    /// Readable identity of the router, e.g. `Router[Top, pod 3, slot 1]`.
    pub fn label(&self) -> String {
        match self.owner {
            Owner::Pod(p) => format!("Router[{}, pod {}, slot {}]", self.kind, p.0, self.position),
            Owner::Block(b) => {
                format!("Router[{}, block {}, slot {}]", self.kind, b.0, self.position)
            }
        }
    }
}

/// A pod: `k/2` top and `k/2` bottom routers forming a complete bipartite graph.
#[derive(Debug, Clone)]
pub struct Pod {
    pub(crate) id: PodId,
    pub(crate) top: Vec<RouterId>,
    pub(crate) bottom: Vec<RouterId>,
}

impl Pod {
    pub fn id(&self) -> PodId {
        self.id
    }

    pub fn top(&self) -> &[RouterId] {
        &self.top
    }

    pub fn bottom(&self) -> &[RouterId] {
        &self.bottom
    }
}

/// A block: `k/2` routers aggregating one top router per pod.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) routers: Vec<RouterId>,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }
}

/// Undirected edge between two routers, equal regardless of traversal direction.
/// Synthesized for load aggregation; the core itself only stores the directed
/// link arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    a: RouterId,
    b: RouterId,
}

impl Edge {
    /// Normalizes the endpoint order so that derived equality and hashing are
    /// direction-independent.
    pub fn new(u: RouterId, v: RouterId) -> Self {
        if u <= v {
            Edge { a: u, b: v }
        } else {
            Edge { a: v, b: u }
        }
    }

    pub fn endpoints(&self) -> (RouterId, RouterId) {
        (self.a, self.b)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -- {})", self.a.0, self.b.0)
    }
}

/// The complete fat-tree, reused across repeated failure/heal/simulate runs.
#[derive(Debug)]
pub struct Network {
    pub(crate) k: usize,
    pub(crate) num_intervals: usize,
    pub(crate) strategy: Strategy,
    /// `floor(log2(k))`; drives the permutation schedule of the
    /// three-permutation strategy.
    pub(crate) log_domain: u32,
    pub(crate) routers: Vec<Router>,
    pub(crate) pods: Vec<Pod>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) rng: StdRng,
    pub(crate) last_failures: Option<FailureSummary>,
}

impl Network {
    /// Validate the configuration and create an empty network. Call
    /// [`Network::build_topology`] before injecting failures or routing packets.
    ///
    /// The RNG is drawn from entropy; use [`Network::with_seed`] for
    /// reproducible runs.
    pub fn new(k: usize, num_intervals: usize, strategy: Strategy) -> Result<Self, ConfigError> {
        Self::with_rng(k, num_intervals, strategy, StdRng::from_entropy())
    }

    /// Like [`Network::new`], but seeded: a fixed seed reproduces the identical
    /// failure pattern and identical hashed forwarding decisions.
    pub fn with_seed(
        k: usize,
        num_intervals: usize,
        strategy: Strategy,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::with_rng(k, num_intervals, strategy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        k: usize,
        num_intervals: usize,
        strategy: Strategy,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        if k == 0 || k % 2 != 0 {
            return Err(ConfigError::InvalidDegree(k));
        }
        // The smallest partitioned dimension is k/2 (top, bottom, and block
        // slots); the k pod indices are partitioned with the same interval count.
        if num_intervals == 0 || num_intervals > k / 2 {
            return Err(ConfigError::InvalidIntervals {
                num_nodes: k / 2,
                num_intervals,
            });
        }
        // Even and positive k implies k >= 2, so the permutation schedule's
        // divisor floor(log2(k)) is always at least 1.
        let log_domain = (k as u32).ilog2();
        Ok(Network {
            k,
            num_intervals,
            strategy,
            log_domain,
            routers: Vec::new(),
            pods: Vec::new(),
            blocks: Vec::new(),
            rng,
            last_failures: None,
        })
    }

    /// Build all pods, blocks, and links. All failure flags start cleared and no
    /// candidate sets are populated: run [`Network::compute_routing_state`]
    /// before simulating packets.
    pub fn build_topology(&mut self) {
        let k = self.k;
        let half = k / 2;
        info!(
            "initializing fat-tree with k={k}: {k} pods, {half} blocks, {} routers, {} edges",
            k * k + half * half,
            self.edge_count()
        );

        self.routers.clear();
        self.pods.clear();
        self.blocks.clear();

        fn alloc(
            routers: &mut Vec<Router>,
            rng: &mut StdRng,
            kind: RouterKind,
            position: usize,
            owner: Owner,
            k: usize,
        ) -> RouterId {
            let id = RouterId(routers.len());
            routers.push(Router::new(rng.gen(), kind, position, owner, k));
            id
        }

        for p in 0..k {
            let id = PodId(p);
            let top = (0..half)
                .map(|i| {
                    alloc(&mut self.routers, &mut self.rng, RouterKind::Top, i, Owner::Pod(id), k)
                })
                .collect_vec();
            let bottom = (0..half)
                .map(|i| {
                    let owner = Owner::Pod(id);
                    alloc(&mut self.routers, &mut self.rng, RouterKind::Bottom, i, owner, k)
                })
                .collect_vec();
            self.pods.push(Pod { id, top, bottom });
        }
        for b in 0..half {
            let id = BlockId(b);
            let routers = (0..half)
                .map(|i| {
                    let owner = Owner::Block(id);
                    alloc(&mut self.routers, &mut self.rng, RouterKind::Block, i, owner, k)
                })
                .collect_vec();
            self.blocks.push(Block { id, routers });
        }

        // Pod-internal bipartite edges: top i <-> bottom j for all i, j.
        for p in 0..k {
            for (i, j) in (0..half).cartesian_product(0..half) {
                let t = self.pods[p].top[i];
                let b = self.pods[p].bottom[j];
                self.routers[t.0].down[j] = b;
                self.routers[b.0].up[i] = t;
            }
        }

        // Block-to-pod edges: the top router at position i of every pod connects
        // to all routers of block i; block router (b, n) reaches pod p through
        // its downward link p.
        for p in 0..k {
            for i in 0..half {
                let t = self.pods[p].top[i];
                for n in 0..half {
                    let br = self.blocks[i].routers[n];
                    self.routers[t.0].up[n] = br;
                    self.routers[br.0].down[p] = t;
                }
            }
        }

        debug_assert!(self
            .routers
            .iter()
            .flat_map(|r| r.up.iter().chain(r.down.iter()))
            .all(|id| id.0 < self.routers.len()));
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn num_intervals(&self) -> usize {
        self.num_intervals
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Summary of the most recent failure injection, if any.
    pub fn last_failure_summary(&self) -> Option<FailureSummary> {
        self.last_failures
    }

    pub fn router(&self, id: RouterId) -> &Router {
        &self.routers[id.0]
    }

    /// All routers with their arena handles, for statistics aggregation.
    pub fn routers(&self) -> impl Iterator<Item = (RouterId, &Router)> {
        self.routers.iter().enumerate().map(|(i, r)| (RouterId(i), r))
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of routers in the network: `k*k + (k/2)^2`.
    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Number of undirected edges: `(k/2)^2 * k` block-top plus `k * (k/2)^2`
    /// top-bottom.
    pub fn edge_count(&self) -> usize {
        let half = self.k / 2;
        half * half * self.k + self.k * half * half
    }

    /// Synthesize the undirected edge set. Every edge touches a top router, so
    /// driving from the top layer visits each exactly once.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.pods.iter().flat_map(move |pod| {
            pod.top.iter().flat_map(move |&t| {
                let r = &self.routers[t.0];
                r.up
                    .iter()
                    .chain(r.down.iter())
                    .map(move |&peer| Edge::new(t, peer))
            })
        })
    }

    /// Select a bottom-layer router uniformly at random (first the pod, then the
    /// slot); sources and destinations of simulated flows always lie on the
    /// bottom layer.
    pub fn random_bottom_router(&mut self) -> RouterId {
        let pod = self.rng.gen_range(0..self.pods.len());
        let slot = self.rng.gen_range(0..self.pods[pod].bottom.len());
        self.pods[pod].bottom[slot]
    }

    /// Reset every per-router load counter to zero.
    pub fn reset_loads(&mut self) {
        for r in &mut self.routers {
            r.load = 0;
        }
    }

    /// Readable identity of a router, for diagnostics.
    pub fn router_label(&self, id: RouterId) -> String {
        self.routers[id.0].label()
    }
}
