//! Frame Scheduler
//!
//! Drives the graph once per display frame. A tick runs in four phases:
//!
//! 1. **Snapshot**: copy the node table under the graph lock and release it
//!    immediately. Node instances are shared, node states are deep copies.
//! 2. **Prepare**: call `prepare` on every snapshotted node and collect the
//!    ones that report `must_run`.
//! 3. **Execute**: run each must-run node that has not run yet, in prepare
//!    order. Inputs pull their producers on demand through [`Execution`], so
//!    only nodes reachable from a must-run node execute, each at most once.
//! 4. **Complete**: call `complete` on every snapshotted node.
//!
//! # Snapshot Lifetime
//!
//! The scheduler keeps its snapshot until the graph changes and the next tick
//! replaces it. A node removed from the graph therefore finishes the tick it
//! is in, and its last reference is dropped on the render thread when the
//! following tick swaps the snapshot out. Nodes never prepared (added and
//! removed between two ticks) are dropped wherever the graph releases them.

mod execution;
mod render_loop;

pub use execution::Execution;
pub use render_loop::{frame_period, RenderLoop, RenderLoopError};

use std::sync::Arc;
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::debug;

use crate::graph::{GraphManager, NodeTable};

/// Timing information handed to every node during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Index of the tick, starting at zero.
    pub frame: u64,
    /// Time since the scheduler started.
    pub elapsed: Duration,
    /// Nominal duration of one frame.
    pub frame_period: Duration,
}

impl FrameContext {
    pub fn new(frame: u64, elapsed: Duration, frame_period: Duration) -> Self {
        Self {
            frame,
            elapsed,
            frame_period,
        }
    }

    /// `elapsed` in seconds.
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    /// Nodes in the snapshot; all of them were prepared and completed.
    pub prepared: usize,
    /// Nodes that reported `must_run`.
    pub must_run: usize,
    /// Node ids in execution order.
    pub executed: Vec<String>,
    /// Whether this tick took a fresh snapshot of the graph.
    pub refreshed: bool,
}

/// Runs ticks against a [`GraphManager`].
///
/// Not `Sync`: a scheduler belongs to the thread that renders.
pub struct FrameScheduler {
    graph: Arc<GraphManager>,
    snapshot: NodeTable,
    generation: Option<u64>,
    frame: u64,
    started: Instant,
    frame_period: Duration,
}

impl FrameScheduler {
    pub fn new(graph: Arc<GraphManager>, frame_period: Duration) -> Self {
        Self {
            graph,
            snapshot: NodeTable::new(),
            generation: None,
            frame: 0,
            started: Instant::now(),
            frame_period,
        }
    }

    /// Number of ticks run so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Run one tick using wall-clock timing.
    pub fn tick(&mut self) -> TickReport {
        let ctx = FrameContext::new(self.frame, self.started.elapsed(), self.frame_period);
        self.tick_with(&ctx)
    }

    /// Run one tick with caller-provided timing.
    pub fn tick_with(&mut self, ctx: &FrameContext) -> TickReport {
        let refreshed = self.refresh_snapshot();
        let nodes = &self.snapshot;

        let mut must_run: SmallVec<[&str; 8]> = SmallVec::new();
        for (id, record) in nodes {
            if record.node.prepare(ctx, &record.state).must_run {
                must_run.push(id.as_str());
            }
        }

        let executed: Vec<String> = {
            let mut exec = Execution::new(ctx, nodes);
            for id in &must_run {
                if !exec.has_executed(id) {
                    exec.run(id);
                }
            }
            exec.executed_nodes().iter().map(|id| id.to_string()).collect()
        };

        for record in nodes.values() {
            record.node.complete(ctx);
        }

        debug!(
            "Frame {}: {} prepared, {} must run, {} executed",
            ctx.frame,
            nodes.len(),
            must_run.len(),
            executed.len()
        );

        let report = TickReport {
            frame: ctx.frame,
            prepared: nodes.len(),
            must_run: must_run.len(),
            executed,
            refreshed,
        };

        self.frame += 1;
        report
    }

    /// Drop the retained snapshot, destroying any node the graph no longer
    /// references. Call on the render thread before it exits.
    pub fn release(&mut self) {
        self.snapshot = NodeTable::new();
        self.generation = None;
    }

    fn refresh_snapshot(&mut self) -> bool {
        let Some((generation, table)) = self.graph.snapshot_since(self.generation) else {
            return false;
        };

        // The previous snapshot is dropped here, after the graph lock was released.
        let previous = std::mem::replace(&mut self.snapshot, table);
        self.generation = Some(generation);
        drop(previous);

        true
    }
}
