//! Render Thread
//!
//! Runs a [`FrameScheduler`] on a dedicated OS thread at a fixed frame rate.
//! The scheduler, and with it every snapshot it takes, lives and dies on that
//! thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::FrameScheduler;
use crate::graph::GraphManager;

#[derive(Debug, Error)]
pub enum RenderLoopError {
    #[error("frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f64),

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Handle to a running render thread. Dropping it stops the thread.
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl RenderLoop {
    /// Start ticking `graph` at `frame_rate` frames per second.
    pub fn spawn(graph: Arc<GraphManager>, frame_rate: f64) -> Result<Self, RenderLoopError> {
        let period = frame_period(frame_rate)?;
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || run(graph, period, flag))?;

        info!("Render loop started at {frame_rate} fps");

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the thread after its current tick and wait for it.
    ///
    /// Returns the number of ticks rendered.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(frames) => {
                    info!("Render loop stopped after {frames} frames");
                    frames
                }
                Err(_) => {
                    warn!("Render thread panicked");
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Time between ticks at `frame_rate`. Rates too small for a [`Duration`]
/// period are rejected like non-positive ones.
pub fn frame_period(frame_rate: f64) -> Result<Duration, RenderLoopError> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(RenderLoopError::InvalidFrameRate(frame_rate));
    }
    Duration::try_from_secs_f64(1.0 / frame_rate)
        .map_err(|_| RenderLoopError::InvalidFrameRate(frame_rate))
}

fn run(graph: Arc<GraphManager>, period: Duration, running: Arc<AtomicBool>) -> u64 {
    let mut scheduler = FrameScheduler::new(graph, period);
    let mut deadline = Instant::now();

    while running.load(Ordering::Acquire) {
        scheduler.tick();

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else if now - deadline > period {
            debug!(
                "Render loop behind by {:?}, skipping ahead",
                now - deadline
            );
            deadline = now;
        }
    }

    scheduler.release();
    scheduler.frames()
}
