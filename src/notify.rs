//! Local notifications handed to the host for presentation.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Notifications with the same id replace each other.
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    /// In-app deep link, e.g. `/connection`.
    pub path: Option<String>,
}

/// Host notification center.
pub trait Notifier: Send + Sync {
    /// Schedule `notification` after `delay`. With `remove_existing`, any
    /// undelivered notification with the same id is dropped first.
    fn queue(&self, notification: Notification, delay: Duration, silent: bool, remove_existing: bool);
}
