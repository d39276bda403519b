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
//! Recomputation of per-router forwarding candidate sets.
//!
//! After failures change, every router rebuilds the subset of its links that is
//! eligible for hashed next-hop selection. Candidate sets keep the original link
//! order so the hashed index always maps to the same peer for the same failure
//! pattern. A router whose strategy must choose among candidates but is left with
//! an empty set aborts the whole rebuild: a partially initialized network must
//! never be used for packet simulation.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::DisconnectedError,
    intervals::{interval_members, interval_of},
    topology::{Direction, Network, RouterId, RouterKind},
};

/// Forwarding strategy employed by all routers of a network.
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
    strum_macros::EnumString,
)]
pub enum RoutingStrategy {
    /// Forward over any unfailed link that lies on a (locally) shortest path.
    ShortestPath,
    /// Restrict failover candidates to one contiguous interval of peer indices,
    /// cyclically advanced per layer (arXiv:2009.01497, adapted).
    Interval,
    /// Interval shape with a single interval (no restriction); path diversity
    /// comes from a hop-count driven permutation index in the hash instead.
    ThreePermutation,
}

/// Full forwarding configuration of a network: the candidate-set strategy plus
/// the packet header fields fed into the forwarding hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    pub routing: RoutingStrategy,
    pub hash: crate::hashing::HashInputs,
}

impl Network {
    /// Rebuild every router's candidate sets from the current failure flags.
    ///
    /// Must be called after each [`Network::inject_failures`] /
    /// [`Network::heal`] and before any packet is simulated. Fails fast with a
    /// [`DisconnectedError`] if any router is starved of candidates; the caller
    /// should abandon the run.
    pub fn compute_routing_state(&mut self) -> Result<(), DisconnectedError> {
        debug!(
            "recomputing routing state ({}, {} intervals)",
            self.strategy.routing, self.num_intervals
        );
        for index in 0..self.routers.len() {
            self.update_candidates(RouterId(index))?;
        }
        Ok(())
    }

    fn update_candidates(&mut self, id: RouterId) -> Result<(), DisconnectedError> {
        match self.strategy.routing {
            RoutingStrategy::ShortestPath => self.unrestricted_candidates(id),
            RoutingStrategy::Interval => self.interval_candidates(id, self.num_intervals),
            RoutingStrategy::ThreePermutation => self.interval_candidates(id, 1),
        }
    }

    /// Shortest-path failover: all unfailed links of a direction are candidates.
    fn unrestricted_candidates(&mut self, id: RouterId) -> Result<(), DisconnectedError> {
        for direction in [Direction::Up, Direction::Down] {
            let router = &self.routers[id.0];
            if router.links(direction).is_empty() {
                continue;
            }
            let candidates: Vec<RouterId> = router
                .links(direction)
                .iter()
                .zip(router.failed(direction))
                .filter(|(_, &failed)| !failed)
                .map(|(&peer, _)| peer)
                .collect();
            if candidates.is_empty() {
                return Err(self.disconnected(id, direction));
            }
            self.routers[id.0].set_candidates(direction, candidates);
        }
        Ok(())
    }

    /// Interval failover: candidates are additionally restricted to a contiguous
    /// interval of peer indices. With a single interval this degenerates to the
    /// unrestricted candidate sets.
    fn interval_candidates(
        &mut self,
        id: RouterId,
        num_intervals: usize,
    ) -> Result<(), DisconnectedError> {
        let half = self.k / 2;
        let my_interval = interval_of(half, num_intervals, self.routers[id.0].position);

        let restrict = |direction: Direction, peers: std::ops::Range<usize>| {
            let router = &self.routers[id.0];
            let candidates: Vec<RouterId> = peers
                .filter(|&i| !router.failed(direction)[i])
                .map(|i| router.links(direction)[i])
                .collect();
            if candidates.is_empty() {
                Err(self.disconnected(id, direction))
            } else {
                Ok(candidates)
            }
        };

        match self.routers[id.0].kind {
            RouterKind::Block => {
                // Downward failover into the interval one past our own, over the
                // k pod indices.
                let next = (my_interval + 1) % num_intervals;
                let pods = interval_members(self.k, num_intervals, next);
                let down = restrict(Direction::Down, pods)?;
                self.routers[id.0].set_candidates(Direction::Down, down);
            }
            RouterKind::Top => {
                let next = (my_interval + 1) % num_intervals;
                let down = restrict(Direction::Down, interval_members(half, num_intervals, next))?;
                // Upward candidates follow the interval that our pod id maps to
                // within the k pod indices.
                let pod = self.routers[id.0].pod().expect("top routers live in a pod");
                let vertical = interval_of(self.k, num_intervals, pod.index());
                let up = restrict(Direction::Up, interval_members(half, num_intervals, vertical))?;
                let router = &mut self.routers[id.0];
                router.set_candidates(Direction::Down, down);
                router.set_candidates(Direction::Up, up);
            }
            RouterKind::Bottom => {
                // Bottom routers stay within their own interval of top routers.
                let tops = interval_members(half, num_intervals, my_interval);
                let up = restrict(Direction::Up, tops)?;
                self.routers[id.0].set_candidates(Direction::Up, up);
            }
        }
        Ok(())
    }

    fn disconnected(&self, id: RouterId, direction: Direction) -> DisconnectedError {
        DisconnectedError {
            router: id,
            label: self.router_label(id),
            direction,
        }
    }
}
