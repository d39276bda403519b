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
//! Failure injection models.
//!
//! Each policy flips failure flags on the router graph and always mirrors the
//! flag on the peer's side of the link, since edges are undirected. Flags stay in
//! place until [`Network::heal`]; candidate sets are stale after any change and
//! must be recomputed with [`Network::compute_routing_state`].

use log::{debug, info};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    intervals::interval_members,
    topology::{Direction, Network, RouterId, RouterKind},
};

/// Strategy used for placing edge failures.
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
pub enum FailurePolicy {
    /// Fail every edge independently with probability `p`.
    Random,
    /// Adversarial placement against interval-based strategies: in every
    /// interval, fail a `p`-fraction (rounded down) of the edges leading
    /// towards the destination pod and of the destination's own pod-internal
    /// downlinks.
    WorstCaseInterval,
    /// Fail a `p`-fraction (rounded down) of the links directly incident to the
    /// destination, chosen uniformly at random.
    DestinationIncident,
}

/// Outcome of a failure injection, also retained on the [`Network`] for
/// reporting by the driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub policy: FailurePolicy,
    /// The policy parameter `p`.
    pub param: f64,
    /// Number of undirected edges failed.
    pub failed: usize,
    /// Size of the edge population the policy drew from.
    pub total: usize,
}

impl Network {
    /// Place edge failures according to `policy`.
    ///
    /// `destination` is required by [`FailurePolicy::WorstCaseInterval`] and
    /// [`FailurePolicy::DestinationIncident`] and must be a bottom-layer router;
    /// violations are programming errors and panic. Previously placed failures
    /// are kept, so runs normally call [`Network::heal`] first.
    pub fn inject_failures(
        &mut self,
        policy: FailurePolicy,
        param: f64,
        destination: Option<RouterId>,
    ) -> FailureSummary {
        let summary = match policy {
            FailurePolicy::Random => self.fail_random(param),
            FailurePolicy::WorstCaseInterval => {
                self.fail_worst_case_interval(param, self.expect_bottom(policy, destination))
            }
            FailurePolicy::DestinationIncident => {
                self.fail_destination_incident(param, self.expect_bottom(policy, destination))
            }
        };
        info!(
            "{}(p={}): failed {} out of {} edges",
            summary.policy, summary.param, summary.failed, summary.total
        );
        self.last_failures = Some(summary);
        summary
    }

    /// Repair all failed links without altering the topology. Candidate sets
    /// remain stale until the routing state is recomputed.
    pub fn heal(&mut self) {
        debug!("healing all edge failures");
        for router in &mut self.routers {
            router.up_failed.iter_mut().for_each(|f| *f = false);
            router.down_failed.iter_mut().for_each(|f| *f = false);
        }
    }

    fn expect_bottom(&self, policy: FailurePolicy, destination: Option<RouterId>) -> RouterId {
        let dest = destination
            .unwrap_or_else(|| panic!("failure policy {policy} requires a destination router"));
        assert_eq!(
            self.routers[dest.0].kind,
            RouterKind::Bottom,
            "failure policy {policy} requires a bottom-layer destination, got {}",
            self.router_label(dest)
        );
        dest
    }

    /// Fail the link at `index` of `router` in `direction`, mirroring the flag
    /// on the peer's opposite-direction record.
    pub(crate) fn fail_link(&mut self, router: RouterId, direction: Direction, index: usize) {
        let peer = self.routers[router.0].links(direction)[index];
        self.routers[router.0].failed_mut(direction)[index] = true;
        let back = self.routers[peer.0]
            .links(direction.opposite())
            .iter()
            .position(|&r| r == router)
            .expect("links are wired symmetrically");
        self.routers[peer.0].failed_mut(direction.opposite())[back] = true;
    }

    /// Every edge touches a top router, so iterating over the top routers' link
    /// arrays visits each undirected edge exactly once.
    fn fail_random(&mut self, p: f64) -> FailureSummary {
        let mut failed = 0;
        let mut total = 0;
        let tops: Vec<RouterId> = self.pods.iter().flat_map(|pod| pod.top.clone()).collect();
        for top in tops {
            for direction in [Direction::Up, Direction::Down] {
                for index in 0..self.routers[top.0].links(direction).len() {
                    if self.rng.gen::<f64>() <= p {
                        self.fail_link(top, direction, index);
                        failed += 1;
                    }
                    total += 1;
                }
            }
        }
        FailureSummary {
            policy: FailurePolicy::Random,
            param: p,
            failed,
            total,
        }
    }

    /// Adversarial placement for interval strategies: per interval, shuffle the
    /// interval's indices and fail a `floor(p * |interval|)`-sized prefix of (1)
    /// the destination pod's top-to-destination downlinks and (2) every block's
    /// links into the destination pod. Small intervals may round to zero
    /// failures; this rounding-down is kept for reproducibility.
    fn fail_worst_case_interval(&mut self, p: f64, destination: RouterId) -> FailureSummary {
        let half = self.k / 2;
        let num_intervals = self.num_intervals;
        let dest_pod = self.routers[destination.0].pod().expect("bottom router");
        let dest_slot = self.routers[destination.0].position;
        let mut failed = 0;

        // (1) Top layer of the destination pod.
        for interval in 0..num_intervals {
            let mut indices: Vec<usize> =
                interval_members(half, num_intervals, interval).collect();
            indices.shuffle(&mut self.rng);
            let quota = (p * indices.len() as f64) as usize;
            for &i in indices.iter().take(quota) {
                let top = self.pods[dest_pod.index()].top[i];
                self.fail_link(top, Direction::Down, dest_slot);
                failed += 1;
            }
        }

        // (2) Every block's links reaching into the destination pod.
        for b in 0..self.blocks.len() {
            for interval in 0..num_intervals {
                let mut indices: Vec<usize> =
                    interval_members(half, num_intervals, interval).collect();
                indices.shuffle(&mut self.rng);
                let quota = (p * indices.len() as f64) as usize;
                for &i in indices.iter().take(quota) {
                    let router = self.blocks[b].routers[i];
                    self.fail_link(router, Direction::Down, dest_pod.index());
                    failed += 1;
                }
            }
        }

        // The policy only ever draws from the destination-directed edges: the
        // k/2 top-to-destination downlinks plus the (k/2)^2 block links into
        // the destination pod.
        FailureSummary {
            policy: FailurePolicy::WorstCaseInterval,
            param: p,
            failed,
            total: half + half * half,
        }
    }

    /// Shuffle the destination's uplink indices and fail a `floor(p * degree)`
    /// prefix, mirroring on each failed peer.
    fn fail_destination_incident(&mut self, p: f64, destination: RouterId) -> FailureSummary {
        let degree = self.routers[destination.0].up.len();
        let mut indices: Vec<usize> = (0..degree).collect();
        indices.shuffle(&mut self.rng);
        let quota = (degree as f64 * p) as usize;
        for &i in indices.iter().take(quota) {
            self.fail_link(destination, Direction::Up, i);
        }
        FailureSummary {
            policy: FailurePolicy::DestinationIncident,
            param: p,
            failed: quota,
            total: degree,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        hashing::HashInputs,
        routing::{RoutingStrategy, Strategy},
    };

    fn network(k: usize, num_intervals: usize, seed: u64) -> Network {
        let strategy = Strategy {
            routing: RoutingStrategy::ShortestPath,
            hash: HashInputs::Destination,
        };
        let mut net = Network::with_seed(k, num_intervals, strategy, seed).unwrap();
        net.build_topology();
        net
    }

    /// Every failed flag must have its mirror set on the peer's corresponding
    /// index in the opposite direction.
    fn assert_symmetric(net: &Network) {
        for (id, router) in net.routers() {
            for direction in [Direction::Up, Direction::Down] {
                for (index, &peer) in router.links(direction).iter().enumerate() {
                    let back = net
                        .router(peer)
                        .links(direction.opposite())
                        .iter()
                        .position(|&r| r == id)
                        .unwrap();
                    assert_eq!(
                        router.failed(direction)[index],
                        net.router(peer).failed(direction.opposite())[back],
                        "asymmetric failure on {} link {index} of {}",
                        direction,
                        router.label()
                    );
                }
            }
        }
    }

    #[test]
    fn random_failures_are_symmetric() {
        let mut net = network(8, 2, 3);
        let summary = net.inject_failures(FailurePolicy::Random, 0.3, None);
        assert_eq!(summary.total, net.edge_count());
        assert_symmetric(&net);
    }

    #[test]
    fn worst_case_interval_failures_are_symmetric() {
        let mut net = network(8, 2, 4);
        let dest = net.pods()[2].bottom()[1];
        let summary = net.inject_failures(FailurePolicy::WorstCaseInterval, 0.5, Some(dest));
        // Population: 4 top-to-destination downlinks plus 16 block links into
        // the destination pod. Quotas are floor(0.5 * 2) = 1 per interval, so
        // 2 top-layer and 8 block-layer failures.
        assert_eq!(summary.total, 4 + 16);
        assert_eq!(summary.failed, 10);
        assert_symmetric(&net);
    }

    #[test]
    fn destination_incident_failures_are_symmetric() {
        let mut net = network(8, 2, 5);
        let dest = net.random_bottom_router();
        let summary = net.inject_failures(FailurePolicy::DestinationIncident, 0.5, Some(dest));
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total, 4);
        assert_symmetric(&net);
    }

    #[test]
    fn random_with_p_one_fails_everything() {
        let mut net = network(4, 1, 6);
        let summary = net.inject_failures(FailurePolicy::Random, 1.0, None);
        assert_eq!(summary.failed, net.edge_count());
        for (_, r) in net.routers() {
            assert!(r.failed(Direction::Up).iter().all(|&f| f));
            assert!(r.failed(Direction::Down).iter().all(|&f| f));
        }
    }

    #[test]
    fn destination_incident_with_p_one_cuts_off_the_destination() {
        let mut net = network(4, 1, 7);
        let dest = net.pods()[0].bottom()[0];
        let summary = net.inject_failures(FailurePolicy::DestinationIncident, 1.0, Some(dest));
        assert_eq!(summary.failed, 2);
        assert!(net.router(dest).failed(Direction::Up).iter().all(|&f| f));
        assert_symmetric(&net);
    }

    /// `floor(p * |interval|)` may be zero for every interval; the policy then
    /// places no failures at all instead of forcing a minimum of one.
    #[test]
    fn worst_case_interval_rounds_down_to_zero() {
        let mut net = network(8, 3, 8);
        let dest = net.pods()[1].bottom()[0];
        // Intervals over 4 indices in 3 parts have sizes {2, 1, 1}; p = 0.4
        // rounds every quota down to zero.
        let summary = net.inject_failures(FailurePolicy::WorstCaseInterval, 0.4, Some(dest));
        assert_eq!(summary.failed, 0);
        for (_, r) in net.routers() {
            assert!(r.failed(Direction::Up).iter().all(|&f| !f));
            assert!(r.failed(Direction::Down).iter().all(|&f| !f));
        }
    }

    #[test]
    fn worst_case_interval_targets_only_destination_pod_links() {
        let mut net = network(8, 2, 9);
        let dest = net.pods()[3].bottom()[2];
        net.inject_failures(FailurePolicy::WorstCaseInterval, 1.0, Some(dest));
        // All failed top-layer downlinks lead to the destination; all failed
        // block downlinks lead into the destination pod.
        for (_, r) in net.routers() {
            for (index, &flag) in r.failed(Direction::Down).iter().enumerate() {
                if !flag {
                    continue;
                }
                match r.kind() {
                    RouterKind::Top => assert_eq!(r.links(Direction::Down)[index], dest),
                    RouterKind::Block => assert_eq!(index, 3),
                    RouterKind::Bottom => unreachable!("bottom routers have no downlinks"),
                }
            }
        }
        assert_symmetric(&net);
    }

    #[test]
    fn heal_clears_every_flag() {
        let mut net = network(8, 2, 10);
        net.inject_failures(FailurePolicy::Random, 0.5, None);
        net.heal();
        for (_, r) in net.routers() {
            assert!(r.failed(Direction::Up).iter().all(|&f| !f));
            assert!(r.failed(Direction::Down).iter().all(|&f| !f));
        }
        // The summary of the injection run is still available for reporting.
        assert_eq!(
            net.last_failure_summary().unwrap().policy,
            FailurePolicy::Random
        );
    }

    #[test]
    #[should_panic(expected = "requires a destination")]
    fn destination_policies_need_a_destination() {
        let mut net = network(4, 1, 11);
        net.inject_failures(FailurePolicy::DestinationIncident, 0.5, None);
    }

    #[test]
    #[should_panic(expected = "bottom-layer destination")]
    fn destination_must_lie_on_the_bottom_layer() {
        let mut net = network(4, 1, 12);
        let top = net.pods()[0].top()[0];
        net.inject_failures(FailurePolicy::WorstCaseInterval, 0.5, Some(top));
    }
}
