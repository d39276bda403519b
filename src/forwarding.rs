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
//! Per-hop forwarding decisions and the loop-bounded packet walk.
//!
//! A router forwards an arriving packet using nothing but its own candidate sets
//! and the hashed packet header, so all failover decisions are local. The walk is
//! cut off after `2 * LOOP_MAX` hops; hitting the cutoff is the normal signal for
//! a permanent forwarding loop, not an error.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    hashing::{permutation_index, HashFields},
    routing::RoutingStrategy,
    topology::{Direction, Network, PodId, RouterId, RouterKind},
    LOOP_MAX, NUM_PERMUTATIONS,
};

/// A payload-less packet traveling through the fat-tree. One instance exists per
/// simulated flow and is discarded after its path has been collected.
#[derive(Debug, Clone)]
pub(crate) struct Packet {
    pub source: RouterId,
    pub destination: RouterId,
    /// Pod of the destination; kept in the header for convenience.
    pub destination_pod: PodId,
    pub last_hop: RouterId,
    pub hop_count: u32,
}

/// Ordered walk of a packet, including start and (if reached) destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub hops: Vec<RouterId>,
    /// `false` means the walk hit the loop cutoff and was abandoned.
    pub delivered: bool,
}

impl Path {
    /// Number of links traversed.
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

impl Network {
    /// Simulate one packet from `source` to `destination` (which must be a
    /// bottom-layer router) and collect its path.
    ///
    /// Requires a successfully computed routing state. The walk is abandoned as
    /// a permanent forwarding loop once it reaches `2 * LOOP_MAX` hops, yielding
    /// a path of exactly `2 * LOOP_MAX + 1` routers with `delivered = false`.
    pub fn route_packet(&mut self, source: RouterId, destination: RouterId) -> Path {
        assert_eq!(
            self.routers[destination.0].kind,
            RouterKind::Bottom,
            "packets may only be sent to bottom-layer destinations, got {}",
            self.router_label(destination)
        );
        let destination_pod = self.routers[destination.0]
            .pod()
            .expect("bottom routers live in a pod");
        let mut packet = Packet {
            source,
            destination,
            destination_pod,
            last_hop: source,
            hop_count: 0,
        };

        let mut hops = vec![source];
        let mut current = source;
        loop {
            match self.forward(&mut packet, current) {
                None => {
                    trace!(
                        "packet delivered to {} after {} hops",
                        self.router_label(destination),
                        packet.hop_count
                    );
                    return Path {
                        hops,
                        delivered: true,
                    };
                }
                Some(next) => {
                    hops.push(next);
                    if packet.hop_count >= 2 * LOOP_MAX {
                        trace!(
                            "packet to {} assumed to loop permanently, abandoned",
                            self.router_label(destination)
                        );
                        return Path {
                            hops,
                            delivered: false,
                        };
                    }
                    current = next;
                }
            }
        }
    }

    /// One forwarding decision at `current`: `None` means delivered.
    fn forward(&mut self, packet: &mut Packet, current: RouterId) -> Option<RouterId> {
        // The inport is recorded before hashing, as arriving hardware would.
        packet.last_hop = current;
        let router = &mut self.routers[current.0];
        router.load = router.load.saturating_add(1);

        if packet.destination == current {
            return None;
        }

        let router = &self.routers[current.0];
        let next = match router.kind {
            RouterKind::Bottom => self.hashed_choice(packet, current, Direction::Up),
            RouterKind::Top => {
                if router.pod() == Some(packet.destination_pod) {
                    // The destination is one hop below: take the direct link if
                    // it is alive, otherwise fail over within the pod.
                    let slot = self.routers[packet.destination.0].position;
                    if !router.down_failed[slot] {
                        router.down[slot]
                    } else {
                        self.hashed_choice(packet, current, Direction::Down)
                    }
                } else {
                    self.hashed_choice(packet, current, Direction::Up)
                }
            }
            RouterKind::Block => {
                let pod = packet.destination_pod.index();
                if !router.down_failed[pod] {
                    router.down[pod]
                } else {
                    self.hashed_choice(packet, current, Direction::Down)
                }
            }
        };

        packet.hop_count += 1;
        Some(next)
    }

    /// Hash the packet header at `current` and pick the candidate at the hashed
    /// index. Candidate sets are non-empty after a successful routing-state
    /// rebuild; anything else is a programming error.
    fn hashed_choice(&self, packet: &Packet, current: RouterId, direction: Direction) -> RouterId {
        let candidates = self.routers[current.0].candidates(direction);
        debug_assert!(
            !candidates.is_empty(),
            "{} has no {direction} candidates; routing state not computed?",
            self.router_label(current)
        );
        let fields = HashFields {
            router: self.routers[current.0].hash_tag,
            source: self.routers[packet.source.0].hash_tag,
            destination: self.routers[packet.destination.0].hash_tag,
            last_hop: self.routers[packet.last_hop.0].hash_tag,
            hop_count: packet.hop_count,
        };
        let permutation = (self.strategy.routing == RoutingStrategy::ThreePermutation)
            .then(|| permutation_index(packet.hop_count, self.log_domain, NUM_PERMUTATIONS));
        let index = self.strategy.hash.forwarding_index(&fields, permutation);
        candidates[index as usize % candidates.len()]
    }
}
