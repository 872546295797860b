//! Screen controllers.
//!
//! Each screen holds the state and actions of one view, without any layout.
//! Errors from the adapters are turned into generic [`Notice`]s; the screens
//! never navigate after sign-in or sign-out, the navigation guard does.

mod create_group;
mod group_list;
mod home;
mod login;
mod notice;


pub use create_group::CreateGroupScreen;
pub use group_list::GroupListScreen;
pub use home::HomeScreen;
pub use login::LoginScreen;
pub use notice::{Notice, Notifier, RecordingNotifier};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Disables a control while its call is pending.
///
/// Re-entrant submissions are ignored, not queued and not canceled.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the flag. Returns `None` if a call is already pending.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// What a screen action ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Rejected locally or by the backend; a notice was shown.
    Failed,
    /// Another submission was still pending.
    Ignored,
}
