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
//! Error types surfaced by the simulation core.

use thiserror::Error;

use crate::topology::{Direction, RouterId};

/// Invalid network or strategy parameters. Fatal to construction; no partial
/// [`crate::topology::Network`] is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The port count of the fat-tree routers must be even and positive.
    #[error("degree k of the fat-tree must be even and positive, got {0}")]
    InvalidDegree(usize),

    /// More intervals were requested than there are indices to partition.
    #[error("cannot split {num_nodes} router indices into {num_intervals} non-empty intervals")]
    InvalidIntervals {
        num_nodes: usize,
        num_intervals: usize,
    },
}

/// Too many edge failures: some router is left without any forwarding candidate
/// in a direction its strategy must choose from. Raised while recomputing the
/// routing state; the whole run must be abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("network got disconnected: {label} has no remaining {direction} forwarding candidates")]
pub struct DisconnectedError {
    /// Arena handle of the starved router.
    pub router: RouterId,
    /// Human-readable identity of the router (kind, owner, slot).
    pub label: String,
    /// Direction whose candidate set came out empty.
    pub direction: Direction,
}
