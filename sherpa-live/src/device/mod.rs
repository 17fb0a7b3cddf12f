//! Platform audio abstraction.
//!
//! The session controller talks to hardware only through these traits:
//! [`AudioCapture`] hands out a [`MicrophoneStream`] (microphone plus the
//! input-direction context) and [`AudioRenderer`] hands out an
//! [`OutputContext`] (the output-direction context and its clock). The
//! `cpal` feature adds desktop implementations in [`desktop`].
//!
//! Opening a device and closing it may block while the hardware starts or
//! stops, so the controller runs `open` and `close` on tokio's blocking pool.
//! Everything else is called from the controller's task and must not block.
//! Device callbacks report back through the channels passed in.

mod mixer;

#[cfg(feature = "resample")]
pub mod resample;

#[cfg(feature = "cpal")]
pub mod desktop;

pub use mixer::Mixer;

use crate::audio::{AudioFormat, AudioFrame, PcmBuffer};
use crate::error::Result;
use crate::scheduler::UnitId;
use tokio::sync::mpsc::UnboundedSender;

/// Channel carrying captured frames to the controller.
pub type FrameSender = UnboundedSender<AudioFrame>;

/// Channel carrying naturally finished playback units to the controller.
pub type EndedSender = UnboundedSender<UnitId>;

/// Source of microphone streams.
pub trait AudioCapture: Send + Sync {
    /// Request microphone access and open the input context.
    ///
    /// Fails with [`LiveError::Permission`](crate::LiveError::Permission) when
    /// access is denied and [`LiveError::Device`](crate::LiveError::Device)
    /// when no capture device exists.
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn MicrophoneStream>>;
}

/// An acquired microphone.
pub trait MicrophoneStream: Send {
    /// Start delivering frames of exactly `frame_size` samples.
    fn tap(&mut self, frame_size: usize, frames: FrameSender) -> Result<()>;

    /// Stop delivering frames. Idempotent.
    fn untap(&mut self);

    /// Release the device and close the input context.
    fn close(&mut self) -> Result<()>;
}

/// Source of output contexts.
pub trait AudioRenderer: Send + Sync {
    /// Open the output context. Finished units are reported on `ended`.
    fn open(&self, format: &AudioFormat, ended: EndedSender) -> Result<Box<dyn OutputContext>>;
}

/// A playback context with its own clock.
pub trait OutputContext: Send {
    /// Current clock time in seconds.
    fn current_time(&self) -> f64;

    /// Start `buffer` at clock time `at` (seconds).
    fn start(&mut self, unit: UnitId, buffer: &PcmBuffer, at: f64) -> Result<()>;

    /// Stop a unit immediately, whether it is playing or still pending.
    fn stop(&mut self, unit: UnitId);

    /// Close the context and release the device.
    fn close(&mut self) -> Result<()>;
}

impl OutputContext for Box<dyn OutputContext> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn start(&mut self, unit: UnitId, buffer: &PcmBuffer, at: f64) -> Result<()> {
        (**self).start(unit, buffer, at)
    }

    fn stop(&mut self, unit: UnitId) {
        (**self).stop(unit)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
