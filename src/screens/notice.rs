use std::sync::{Mutex, PoisonError};

/// Blocking user-facing alerts. Texts are generic and never carry backend
/// error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MissingCredentials,
    LoginFailed,
    SignUpFailed,
    MissingGroupFields,
    NotSignedIn,
    GroupCreateFailed,
    GroupCreated,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::MissingCredentials
            | Notice::MissingGroupFields
            | Notice::NotSignedIn
            | Notice::GroupCreateFailed => "Error",
            Notice::LoginFailed => "Login failed",
            Notice::SignUpFailed => "Sign up failed",
            Notice::GroupCreated => "Success",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::MissingCredentials => "Please enter your email address and password.",
            Notice::LoginFailed => "The email address or password is incorrect.",
            Notice::SignUpFailed => {
                "This email address is already in use or is not formatted correctly."
            }
            Notice::MissingGroupFields => "Group name and goal are required.",
            Notice::NotSignedIn => "You are not signed in.",
            Notice::GroupCreateFailed => "Could not create the group.",
            Notice::GroupCreated => "Group created!",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::GroupCreated)
    }
}

/// Shows notices to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that keeps every notice, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices().last().copied()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            tracing::warn!(title = notice.title(), "{}", notice.message());
        } else {
            tracing::info!(title = notice.title(), "{}", notice.message());
        }
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
