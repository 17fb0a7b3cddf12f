//! Property-based tests for gapless playback scheduling.
//!
//! *For any* sequence of chunk durations and clock readings, each unit SHALL
//! start at `max(previous end, now)`, so units never overlap and never leave
//! a gap while the queue is non-empty.

use parking_lot::Mutex;
use proptest::prelude::*;
use sherpa_live::{OutputContext, PcmBuffer, PlaybackScheduler, Result, UnitId};
use std::sync::Arc;

struct Clock {
    now: Arc<Mutex<f64>>,
}

impl OutputContext for Clock {
    fn current_time(&self) -> f64 {
        *self.now.lock()
    }

    fn start(&mut self, _unit: UnitId, _buffer: &PcmBuffer, at: f64) -> Result<()> {
        assert!(at >= *self.now.lock());
        Ok(())
    }

    fn stop(&mut self, _unit: UnitId) {}

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Chunk length in frames at 24 kHz and how far the clock moves before it.
fn arb_step() -> impl Strategy<Value = (usize, f64)> {
    (1usize..24_000, 0.0f64..0.8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_units_start_at_max_of_cursor_and_now(steps in prop::collection::vec(arb_step(), 1..40)) {
        let now = Arc::new(Mutex::new(0.0));
        let mut scheduler = PlaybackScheduler::new(Clock { now: now.clone() });
        let mut previous_end = 0.0f64;

        for (frames, advance) in steps {
            *now.lock() += advance;
            let unit = scheduler.enqueue(PcmBuffer::silence(frames as f64 / 24_000.0, 24_000)).unwrap();

            let expected = previous_end.max(*now.lock());
            prop_assert!((unit.start - expected).abs() < 1e-9);
            prop_assert!(unit.end >= unit.start);
            prop_assert!(unit.start >= *now.lock());
            previous_end = unit.end;
        }
        prop_assert!((scheduler.next_start_time() - previous_end).abs() < 1e-9);
    }

    #[test]
    fn prop_flush_restarts_at_now(
        before in prop::collection::vec(arb_step(), 1..10),
        at in 0.0f64..5.0,
    ) {
        let now = Arc::new(Mutex::new(0.0));
        let mut scheduler = PlaybackScheduler::new(Clock { now: now.clone() });
        for (frames, _) in &before {
            scheduler.enqueue(PcmBuffer::silence(*frames as f64 / 24_000.0, 24_000)).unwrap();
        }

        *now.lock() = at;
        prop_assert_eq!(scheduler.flush(), before.len());
        prop_assert!(scheduler.is_idle());

        let unit = scheduler.enqueue(PcmBuffer::silence(0.1, 24_000)).unwrap();
        prop_assert!((unit.start - at).abs() < 1e-9);
    }
}
