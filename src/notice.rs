//! User-visible notices (short toast-style messages)
//!
//! The frame driver posts notices; the viewer or CLI drains them without
//! blocking. Messages are delivered over an unbounded crossbeam channel so
//! posting never stalls a frame.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::overlay::FilterMode;

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The device cannot run face tracking
    DeviceUnsupported,
    /// Session setup failed for another reason, named by kind
    ArFailure(String),
    /// Camera access is required to use the filters
    CameraPermissionRequired,
    /// The active filter changed
    FilterChanged(FilterMode),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::DeviceUnsupported => write!(f, "This device does not support AR face tracking"),
            Notice::ArFailure(kind) => write!(f, "AR failure: {}", kind),
            Notice::CameraPermissionRequired => write!(f, "Camera permission is required"),
            Notice::FilterChanged(mode) => write!(f, "Filter: {}", mode),
        }
    }
}

/// Create a connected notifier/receiver pair.
pub fn channel() -> (Notifier, NoticeReceiver) {
    let (tx, rx) = unbounded();
    (Notifier { tx }, NoticeReceiver { rx })
}

/// Posting side
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<Notice>,
}

impl Notifier {
    pub fn post(&self, notice: Notice) {
        tracing::info!("Notice: {}", notice);
        if self.tx.send(notice).is_err() {
            tracing::trace!("Notice receiver dropped");
        }
    }
}

/// Draining side
#[derive(Debug, Clone)]
pub struct NoticeReceiver {
    rx: Receiver<Notice>,
}

impl NoticeReceiver {
    /// Next pending notice, if any
    pub fn try_next(&self) -> Option<Notice> {
        match self.rx.try_recv() {
            Ok(notice) => Some(notice),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All pending notices, oldest first
    pub fn drain(&self) -> Vec<Notice> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
