//! Handle given to the presentation layer.

use crate::state::{SessionSnapshot, SessionState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Requests from the UI to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// The mute flag changed to the given value.
    MuteChanged(bool),
    /// Tear the session down.
    Close,
}

type CloseCallback = Box<dyn FnOnce() + Send>;

/// Cloneable UI handle: status, mute, volume and close.
///
/// Mirrors the controller's state; it holds no state of its own besides the
/// shared mute flag.
#[derive(Clone)]
pub struct SessionHandle {
    snapshot: watch::Receiver<SessionSnapshot>,
    muted: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    on_close: Arc<Mutex<Option<CloseCallback>>>,
}

impl SessionHandle {
    pub(crate) fn new(
        snapshot: watch::Receiver<SessionSnapshot>,
        muted: Arc<AtomicBool>,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self { snapshot, muted, commands, on_close: Arc::new(Mutex::new(None)) }
    }

    /// Notify the parent view when the session is closed through this handle.
    pub fn on_close(self, callback: impl FnOnce() + Send + 'static) -> Self {
        *self.on_close.lock() = Some(Box::new(callback));
        self
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SessionState {
        self.snapshot.borrow().status
    }

    /// Whether outbound audio is suppressed.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Latest microphone loudness in `[0, 1]`.
    pub fn volume(&self) -> f32 {
        self.snapshot.borrow().volume
    }

    /// Current status, mute flag and volume together.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { muted: self.is_muted(), ..*self.snapshot.borrow() }
    }

    /// Receiver that is notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Flip the mute flag and return the new value.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.muted.fetch_xor(true, Ordering::SeqCst);
        debug!(muted, "Mute toggled");
        let _ = self.commands.send(SessionCommand::MuteChanged(muted));
        muted
    }

    /// Tear the session down and notify the parent view.
    ///
    /// Safe to call repeatedly and after the controller has stopped.
    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
        let callback = self.on_close.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("snapshot", &self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn handle() -> (SessionHandle, mpsc::UnboundedReceiver<SessionCommand>) {
        let (_tx, rx) = watch::channel(SessionSnapshot::default());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        (SessionHandle::new(rx, Arc::new(AtomicBool::new(false)), cmd_tx), cmd_rx)
    }

    #[test]
    fn test_toggle_mute_round_trip() {
        let (handle, mut commands) = handle();
        assert!(handle.toggle_mute());
        assert!(handle.is_muted());
        assert!(!handle.toggle_mute());
        assert_eq!(commands.try_recv().unwrap(), SessionCommand::MuteChanged(true));
        assert_eq!(commands.try_recv().unwrap(), SessionCommand::MuteChanged(false));
    }

    #[test]
    fn test_close_notifies_parent_once() {
        let (handle, mut commands) = handle();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = handle.on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.close();
        handle.clone().close();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(commands.try_recv().unwrap(), SessionCommand::Close);
    }

    #[test]
    fn test_close_after_controller_gone() {
        let (handle, commands) = handle();
        drop(commands);
        handle.close();
        assert_eq!(handle.status(), SessionState::Connecting);
    }
}
