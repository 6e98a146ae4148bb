//! User-facing notifications.
//!
//! Core code reports outcomes ("Login successful!", "Update failed") through
//! a `Notifier`. Notifications are fire-and-forget: implementations must not
//! block, and callers never wait on them.

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotificationLevel::Success, message);
    }

    fn info(&self, message: &str) {
        self.notify(NotificationLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NotificationLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotificationLevel::Error, message);
    }
}

/// Routes notifications into the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(?level, "{}", message)
            }
            NotificationLevel::Warning => warn!("{}", message),
            NotificationLevel::Error => error!("{}", message),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{NotificationLevel, Notifier};

    /// Captures notifications so tests can assert on them
    #[derive(Default)]
    pub struct RecordingNotifier {
        seen: Mutex<Vec<(NotificationLevel, String)>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<(NotificationLevel, String)> {
            self.seen.lock().unwrap().clone()
        }

        pub fn contains(&self, level: NotificationLevel, message: &str) -> bool {
            self.messages()
                .iter()
                .any(|(l, m)| *l == level && m == message)
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, level: NotificationLevel, message: &str) {
            self.seen.lock().unwrap().push((level, message.to_string()));
        }
    }
}
