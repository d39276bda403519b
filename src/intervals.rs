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
//! Partitioning of router indices into contiguous intervals.
//!
//! The indices `0..num_nodes` are split into `num_intervals` contiguous ranges
//! whose sizes differ by at most one; the first `num_nodes % num_intervals`
//! intervals take the larger size. Both directions of the mapping are pure
//! functions so routers and failure models never share partition state.

use std::ops::Range;

/// Interval that `index` belongs to when splitting `num_nodes` indices into
/// `num_intervals` parts.
pub fn interval_of(num_nodes: usize, num_intervals: usize, index: usize) -> usize {
    debug_assert!(num_intervals >= 1 && num_intervals <= num_nodes);
    debug_assert!(index < num_nodes);
    let base = num_nodes / num_intervals;
    let rest = num_nodes % num_intervals;
    // The first `rest` intervals are one index wider.
    let wide_span = rest * (base + 1);
    if index < wide_span {
        index / (base + 1)
    } else {
        rest + (index - wide_span) / base
    }
}

/// Indices belonging to `interval`, as a contiguous range.
pub fn interval_members(num_nodes: usize, num_intervals: usize, interval: usize) -> Range<usize> {
    debug_assert!(num_intervals >= 1 && num_intervals <= num_nodes);
    debug_assert!(interval < num_intervals);
    let base = num_nodes / num_intervals;
    let rest = num_nodes % num_intervals;
    if interval < rest {
        let start = interval * (base + 1);
        start..start + base + 1
    } else {
        let start = rest * (base + 1) + (interval - rest) * base;
        start..start + base
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn ten_nodes_three_intervals() {
        assert_eq!(interval_members(10, 3, 0), 0..4);
        assert_eq!(interval_members(10, 3, 1), 4..7);
        assert_eq!(interval_members(10, 3, 2), 7..10);
        let covered = (0..3).flat_map(|j| interval_members(10, 3, j)).collect_vec();
        assert_eq!(covered, (0..10).collect_vec());
    }

    #[test]
    fn assignment_matches_membership() {
        for (num_nodes, num_intervals) in [(10, 3), (8, 8), (16, 5), (4, 1), (7, 2)] {
            for interval in 0..num_intervals {
                for index in interval_members(num_nodes, num_intervals, interval) {
                    assert_eq!(interval_of(num_nodes, num_intervals, index), interval);
                }
            }
        }
    }

    #[test]
    fn sizes_differ_by_at_most_one() {
        for (num_nodes, num_intervals) in [(10, 3), (13, 4), (16, 16), (9, 2)] {
            let sizes = (0..num_intervals)
                .map(|j| interval_members(num_nodes, num_intervals, j).len())
                .collect_vec();
            let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
            assert!(max - min <= 1);
            assert_eq!(sizes.iter().sum::<usize>(), num_nodes);
            // The larger intervals come first.
            assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
