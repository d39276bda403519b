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
//! End-to-end scenario tests driving full inject/recompute/route runs.

use crate::{
    hashing::HashInputs,
    routing::{RoutingStrategy, Strategy},
    topology::Network,
};

mod lifecycle;

/// Fresh, fully built network with a computed (failure-free) routing state.
fn seeded_network(
    routing: RoutingStrategy,
    hash: HashInputs,
    k: usize,
    num_intervals: usize,
    seed: u64,
) -> Network {
    let mut net = Network::with_seed(k, num_intervals, Strategy { routing, hash }, seed).unwrap();
    net.build_topology();
    net.compute_routing_state().unwrap();
    net
}
