//! Gapless playback scheduling of inbound model audio.

use crate::audio::PcmBuffer;
use crate::device::OutputContext;
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Identifier of one scheduled playback unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u64);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Where a buffer landed on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledUnit {
    pub id: UnitId,
    /// Start time in seconds on the output clock.
    pub start: f64,
    /// End time in seconds on the output clock.
    pub end: f64,
}

/// Queues decoded buffers back to back on an output clock.
///
/// `next_start_time` never lags the clock when a unit is scheduled, and only
/// moves backwards on [`flush`](Self::flush), where it snaps to the current
/// clock time.
pub struct PlaybackScheduler<O: OutputContext> {
    output: O,
    next_start_time: f64,
    active: BTreeMap<UnitId, ScheduledUnit>,
    next_id: u64,
}

impl<O: OutputContext> PlaybackScheduler<O> {
    /// Create a scheduler rendering into `output`.
    pub fn new(output: O) -> Self {
        let next_start_time = output.current_time();
        Self { output, next_start_time, active: BTreeMap::new(), next_id: 0 }
    }

    /// Schedule `buffer` right after everything already queued.
    ///
    /// If the queue has drained, the buffer starts at the current clock time.
    pub fn enqueue(&mut self, buffer: PcmBuffer) -> Result<ScheduledUnit> {
        let now = self.output.current_time();
        self.next_start_time = self.next_start_time.max(now);

        let id = UnitId(self.next_id);
        self.next_id += 1;

        let start = self.next_start_time;
        let end = start + buffer.duration();
        self.output.start(id, &buffer, start)?;

        self.next_start_time = end;
        let unit = ScheduledUnit { id, start, end };
        self.active.insert(id, unit);
        trace!(unit = %id, start, end, active = self.active.len(), "Scheduled playback unit");
        Ok(unit)
    }

    /// Natural completion of a unit.
    ///
    /// Ids that are no longer active (for example flushed units) are ignored.
    pub fn complete(&mut self, id: UnitId) -> bool {
        self.active.remove(&id).is_some()
    }

    /// Drop units whose end time has passed on the clock.
    pub fn reap(&mut self) -> usize {
        let now = self.output.current_time();
        let before = self.active.len();
        self.active.retain(|_, unit| unit.end > now);
        before - self.active.len()
    }

    /// Stop every scheduled or playing unit and restart the timeline at now.
    ///
    /// Returns the number of units stopped.
    pub fn flush(&mut self) -> usize {
        let stopped = self.active.len();
        for id in std::mem::take(&mut self.active).into_keys() {
            self.output.stop(id);
        }
        self.next_start_time = self.output.current_time();
        debug!(stopped, cursor = self.next_start_time, "Flushed playback");
        stopped
    }

    /// Flush and close the output context.
    pub fn close(&mut self) {
        self.flush();
        if let Err(e) = self.output.close() {
            warn!(error = %e, "Failed to close output context");
        }
    }

    /// Units currently scheduled or playing, ordered by id.
    pub fn active_units(&self) -> impl Iterator<Item = &ScheduledUnit> {
        self.active.values()
    }

    /// Number of units currently scheduled or playing.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Clock time at which the next unit would start.
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Current output clock time.
    pub fn current_time(&self) -> f64 {
        self.output.current_time()
    }

    /// The underlying output context.
    pub fn output(&self) -> &O {
        &self.output
    }
}

impl<O: OutputContext> std::fmt::Debug for PlaybackScheduler<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("next_start_time", &self.next_start_time)
            .field("active", &self.active.len())
            .finish()
    }
}
