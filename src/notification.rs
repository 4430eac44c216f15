// src/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
    Warning,
}

/// A user-visible notification (geocode failures, finished claims, backend errors).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Newest-first notification list with read tracking.
#[derive(Debug, Default, Clone)]
pub struct NotificationCenter {
    notifications: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a new unread notification and returns its id.
    pub fn add(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            kind,
            timestamp: Utc::now(),
            read: false,
        };
        let id = notification.id;
        log::debug!(
            "Notification {:?} added: {}",
            notification.kind,
            notification.title
        );
        self.notifications.insert(0, notification);
        id
    }

    /// Shorthand for an error notification built from any displayable error.
    pub fn add_error(&mut self, title: impl Into<String>, error: &dyn std::fmt::Display) -> Uuid {
        self.add(NotificationKind::Error, title, error.to_string())
    }

    pub fn mark_as_read(&mut self, id: Uuid) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_as_read(&mut self) {
        self.notifications.iter_mut().for_each(|n| n.read = true);
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Notification> {
        let index = self.notifications.iter().position(|n| n.id == id)?;
        Some(self.notifications.remove(index))
    }

    pub fn clear_all(&mut self) {
        self.notifications.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}
