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
//! Library for simulating stateless, hash-based local fast-failover routing on a
//! two-layer fat-tree (CLOS) datacenter topology under link failures.
//!
//! The simulation proceeds in discrete runs against a single [`topology::Network`]:
//! failures are injected ([`failures::FailurePolicy`]), every router recomputes its
//! forwarding candidate sets from the locally visible failure flags
//! ([`topology::Network::compute_routing_state`]), and packets are then driven
//! hop-by-hop through the hashed forwarding rules until they are delivered or hit
//! the loop cutoff. Workload generation and statistics export live outside this
//! crate; the library only exposes per-packet paths, per-router load counters, and
//! the synthesized undirected edge set.

pub mod error;
pub mod failures;
pub mod forwarding;
pub mod hashing;
pub mod intervals;
pub mod routing;
pub mod topology;
pub mod util;

#[cfg(test)]
mod test;

/// A packet that travels more than `2 * LOOP_MAX` hops is assumed to be caught in
/// a permanent forwarding loop and its walk is abandoned.
pub const LOOP_MAX: u32 = 1000;

/// Number of hash permutations cycled through by the three-permutation strategy.
pub const NUM_PERMUTATIONS: u32 = 6;

pub mod prelude {
    pub use super::{
        error::{ConfigError, DisconnectedError},
        failures::{FailurePolicy, FailureSummary},
        forwarding::Path,
        hashing::HashInputs,
        routing::{RoutingStrategy, Strategy},
        topology::{Direction, Edge, Network, RouterId, RouterKind},
        LOOP_MAX,
    };
}
