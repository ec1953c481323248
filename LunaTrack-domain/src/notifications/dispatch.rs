//! Platform notification seam

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::payload::NotificationPayload;

/// Action category attached to medication reminders (take / snooze buttons)
pub const MEDICATION_REMINDER_CATEGORY: &str = "MEDICATION_REMINDER";

/// One notification to be delivered at a local wall-clock instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub deliver_at: NaiveDateTime,
    pub channel: String,
    pub action_category: Option<String>,
    pub payload: Option<NotificationPayload>,
}

/// Delivery channel the platform must know about before scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A descriptor the platform refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedNotification {
    pub id: i32,
    pub reason: String,
}

/// Result of a batch submission. Descriptors not listed were accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub failed: Vec<FailedNotification>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Errors raised by the platform notification service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("Notification call failed: {0}")]
    Failed(String),
}

/// Local notification service of the host platform.
///
/// Cancelling an id that is not pending is a no-op.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcherTrait: Send + Sync {
    /// Submit several notifications in one call
    async fn schedule_batch(&self, requests: Vec<NotificationRequest>) -> Result<BatchReport, DispatchError>;

    /// Cancel pending notifications by id
    async fn cancel(&self, ids: Vec<i32>) -> Result<(), DispatchError>;

    /// Ids of notifications still waiting to be delivered
    async fn list_pending(&self) -> Result<Vec<i32>, DispatchError>;

    /// Whether notifications may be shown; never prompts
    async fn check_permission(&self) -> Result<bool, DispatchError>;

    /// Prompt for permission
    async fn request_permission(&self) -> Result<bool, DispatchError>;

    /// Create (or update) a delivery channel
    async fn create_channel(&self, channel: ChannelSpec) -> Result<(), DispatchError>;
}

#[async_trait]
impl<D: NotificationDispatcherTrait + ?Sized> NotificationDispatcherTrait for Arc<D> {
    async fn schedule_batch(&self, requests: Vec<NotificationRequest>) -> Result<BatchReport, DispatchError> {
        (**self).schedule_batch(requests).await
    }

    async fn cancel(&self, ids: Vec<i32>) -> Result<(), DispatchError> {
        (**self).cancel(ids).await
    }

    async fn list_pending(&self) -> Result<Vec<i32>, DispatchError> {
        (**self).list_pending().await
    }

    async fn check_permission(&self) -> Result<bool, DispatchError> {
        (**self).check_permission().await
    }

    async fn request_permission(&self) -> Result<bool, DispatchError> {
        (**self).request_permission().await
    }

    async fn create_channel(&self, channel: ChannelSpec) -> Result<(), DispatchError> {
        (**self).create_channel(channel).await
    }
}
