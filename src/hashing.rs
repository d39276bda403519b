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
//! Deterministic, non-cryptographic hashing of packet headers.
//!
//! Routers derive pseudo-random but reproducible forwarding choices by hashing a
//! selection of packet header fields. Every variant folds in the current router's
//! own identity tag: without it, two adjacent routers would make mirrored choices
//! and could bounce packets along short cycles.

use serde::{Deserialize, Serialize};

/// 32-bit FNV-1a over the four (little-endian) bytes of `input`.
pub fn fnv1a(input: u32) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.to_le_bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// FNV-1a constrained to 31 bits, so the result is usable as a modulus index
/// without sign issues.
pub fn positive(input: u32) -> u32 {
    fnv1a(input) & 0x7fff_ffff
}

/// Header fields a router combines into its forwarding index. All values are the
/// random 32-bit identity tags of the respective routers, except `hop_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFields {
    pub router: u32,
    pub source: u32,
    pub destination: u32,
    pub last_hop: u32,
    pub hop_count: u32,
}

/// Selection of packet header fields fed into the forwarding hash.
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
pub enum HashInputs {
    /// Destination address only.
    Destination,
    /// Inport (last hop) and destination address.
    InportDestination,
    /// Source address, inport, and destination address.
    SourceInportDestination,
    /// Source, inport, destination, and hop count, each salted and hashed
    /// individually before combining.
    Sidh,
}

impl HashInputs {
    /// Compute the 31-bit forwarding index for a packet arriving at a router.
    ///
    /// `permutation` is folded into the pre-hash combination by the
    /// three-permutation strategy; `Sidh` ignores it since the hop count already
    /// diversifies repeated hashing along a path.
    pub fn forwarding_index(&self, fields: &HashFields, permutation: Option<u32>) -> u32 {
        let perm = permutation.unwrap_or(0);
        match self {
            Self::Destination => positive(fields.router ^ fields.destination ^ perm),
            // The inport variants combine by wrapping addition, not XOR: the
            // inport equals the hashing router itself (it is recorded before
            // the hash runs), so an XOR of `router ^ last_hop` would cancel
            // and strip the router's identity out of the index.
            Self::InportDestination => positive(
                fields
                    .router
                    .wrapping_add(fields.destination)
                    .wrapping_add(fields.last_hop)
                    .wrapping_add(perm),
            ),
            Self::SourceInportDestination => positive(
                fields
                    .router
                    .wrapping_add(fields.source)
                    .wrapping_add(fields.destination)
                    .wrapping_add(fields.last_hop)
                    .wrapping_add(perm),
            ),
            Self::Sidh => {
                (fnv1a(fields.router ^ 1)
                    ^ fnv1a(fields.destination ^ 2)
                    ^ fnv1a(fields.last_hop ^ 3)
                    ^ fnv1a(fields.source ^ 4)
                    ^ fnv1a(fields.hop_count))
                    & 0x7fff_ffff
            }
        }
    }
}

/// Permutation index for the three-permutation strategy: a packet that keeps
/// retrying past one permutation's local failures samples the next permutation
/// every `log_domain` hops, clamped to `num_permutations - 1`.
pub fn permutation_index(hop_count: u32, log_domain: u32, num_permutations: u32) -> u32 {
    debug_assert!(log_domain >= 1 && num_permutations >= 1);
    (hop_count / log_domain).min(num_permutations - 1)
}
