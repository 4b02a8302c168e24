//! Bounds checker for graph walks (spec §4.1).
//!
//! Every traversal in [`crate::graph`] and [`crate::inference`] is
//! policed by one of these; the first violated bound short-circuits
//! the walk with a distinguishable error so the caller can return
//! partial results instead of discarding work in progress.

use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

const MAX_HOPS_DEFAULT: usize = 3;
const MAX_HOPS_CAP: usize = 10;
const MAX_NODES_DEFAULT: usize = 100;
const MAX_NODES_CAP: usize = 1_000;
const MAX_EDGES_DEFAULT: usize = 500;
const MAX_EDGES_CAP: usize = 5_000;
const TIMEOUT_DEFAULT: Duration = Duration::from_secs(30);
const TIMEOUT_CAP: Duration = Duration::from_secs(5 * 60);

/// Which bound tripped, carried on `Error::BoundsExceeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Cancelled,
    MaxNodes,
    MaxEdges,
    MaxHops,
    Timeout,
}

impl std::fmt::Display for BoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BoundKind::Cancelled => "cancelled",
            BoundKind::MaxNodes => "max_nodes",
            BoundKind::MaxEdges => "max_edges",
            BoundKind::MaxHops => "max_hops",
            BoundKind::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// Requested limits, clamped to their caps at construction time.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub max_hops: usize,
    pub max_nodes: usize,
    pub max_edges: usize,
    pub timeout: Duration,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            max_hops: MAX_HOPS_DEFAULT,
            max_nodes: MAX_NODES_DEFAULT,
            max_edges: MAX_EDGES_DEFAULT,
            timeout: TIMEOUT_DEFAULT,
        }
    }
}

impl Bounds {
    pub fn new(max_hops: usize, max_nodes: usize, max_edges: usize, timeout: Duration) -> Self {
        Self {
            max_hops: max_hops.min(MAX_HOPS_CAP).max(1),
            max_nodes: max_nodes.min(MAX_NODES_CAP).max(1),
            max_edges: max_edges.min(MAX_EDGES_CAP).max(1),
            timeout: timeout.min(TIMEOUT_CAP),
        }
    }
}

/// Running totals for a single traversal, visible to the caller as
/// `stats()` so a bounds-exceeded result can still report how much
/// work was actually done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundsStats {
    pub nodes_visited: usize,
    pub edges_visited: usize,
}

/// Mutable counter paired with a [`Bounds`] and the ambient cancellation
/// token, consulted once per node/edge expansion.
pub struct BoundsChecker {
    bounds: Bounds,
    token: CancellationToken,
    started_at: Instant,
    stats: BoundsStats,
}

impl BoundsChecker {
    pub fn new(bounds: Bounds, token: CancellationToken) -> Self {
        Self {
            bounds,
            token,
            started_at: Instant::now(),
            stats: BoundsStats::default(),
        }
    }

    /// Checks, in order: external cancellation, node count, edge
    /// count, depth, elapsed wall-time. Returns the first bound tripped.
    pub fn can_continue(&self, depth: usize) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.stats.nodes_visited >= self.bounds.max_nodes {
            return Err(Error::BoundsExceeded(BoundKind::MaxNodes));
        }
        if self.stats.edges_visited >= self.bounds.max_edges {
            return Err(Error::BoundsExceeded(BoundKind::MaxEdges));
        }
        if depth > self.bounds.max_hops {
            return Err(Error::BoundsExceeded(BoundKind::MaxHops));
        }
        if self.started_at.elapsed() >= self.bounds.timeout {
            return Err(Error::BoundsExceeded(BoundKind::Timeout));
        }
        Ok(())
    }

    pub fn record_node(&mut self) {
        self.stats.nodes_visited += 1;
    }

    pub fn record_edge(&mut self) {
        self.stats.edges_visited += 1;
    }

    pub fn stats(&self) -> BoundsStats {
        self.stats
    }

    pub fn max_hops(&self) -> usize {
        self.bounds.max_hops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_new_clamps_to_caps() {
        let bounds = Bounds::new(999, 999_999, 999_999, Duration::from_secs(999_999));
        assert_eq!(bounds.max_hops, MAX_HOPS_CAP);
        assert_eq!(bounds.max_nodes, MAX_NODES_CAP);
        assert_eq!(bounds.max_edges, MAX_EDGES_CAP);
        assert_eq!(bounds.timeout, TIMEOUT_CAP);
    }

    #[test]
    fn can_continue_checks_cancellation_first() {
        let token = CancellationToken::new();
        token.cancel();
        let checker = BoundsChecker::new(Bounds::default(), token);
        assert!(matches!(checker.can_continue(0), Err(Error::Cancelled)));
    }

    #[test]
    fn can_continue_trips_max_nodes() {
        let bounds = Bounds::new(3, 2, 500, Duration::from_secs(30));
        let mut checker = BoundsChecker::new(bounds, CancellationToken::background());
        checker.record_node();
        checker.record_node();
        match checker.can_continue(0) {
            Err(Error::BoundsExceeded(BoundKind::MaxNodes)) => {}
            other => panic!("expected max_nodes, got {other:?}"),
        }
    }

    #[test]
    fn can_continue_trips_max_hops_before_edges_within_depth() {
        let bounds = Bounds::new(1, 100, 500, Duration::from_secs(30));
        let checker = BoundsChecker::new(bounds, CancellationToken::background());
        assert!(checker.can_continue(1).is_ok());
        match checker.can_continue(2) {
            Err(Error::BoundsExceeded(BoundKind::MaxHops)) => {}
            other => panic!("expected max_hops, got {other:?}"),
        }
    }

    #[test]
    fn stats_reflect_recorded_work() {
        let mut checker = BoundsChecker::new(Bounds::default(), CancellationToken::background());
        checker.record_node();
        checker.record_node();
        checker.record_edge();
        assert_eq!(checker.stats(), BoundsStats { nodes_visited: 2, edges_visited: 1 });
    }
}
