//! In-app channel sender.
//!
//! Delivery writes into a per-user in-process inbox, so in-app
//! notifications are immediately observable by the application layer.
//! Delivery is confirmed synchronously since no external hop exists.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{ChannelSender, DeliveryReceipt};
use crate::error::Result;
use crate::notification::{Channel, Notification};

/// Default cap on messages retained per user inbox.
const DEFAULT_INBOX_CAPACITY: usize = 100;

/// A message landed in a user's in-app inbox.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InAppMessage {
    /// Id of the originating notification
    pub notification_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// In-app sender with bounded per-user inboxes.
///
/// When an inbox is full the oldest message is dropped, so a noisy sender
/// cannot grow memory without bound.
pub struct InAppSender {
    inboxes: DashMap<String, VecDeque<InAppMessage>>,
    capacity: usize,
}

impl InAppSender {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inboxes: DashMap::new(),
            capacity,
        }
    }

    /// Current inbox contents for a user, oldest first.
    pub fn inbox(&self, user_id: &str) -> Vec<InAppMessage> {
        self.inboxes
            .get(user_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting for a user.
    pub fn inbox_size(&self, user_id: &str) -> usize {
        self.inboxes.get(user_id).map(|q| q.len()).unwrap_or(0)
    }
}

impl Default for InAppSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        let mut inbox = self
            .inboxes
            .entry(notification.recipient.clone())
            .or_default();

        if inbox.len() >= self.capacity {
            if let Some(dropped) = inbox.pop_front() {
                tracing::debug!(
                    user_id = %notification.recipient,
                    dropped_id = %dropped.notification_id,
                    "Dropped oldest message from full inbox"
                );
            }
        }

        inbox.push_back(InAppMessage {
            notification_id: notification.id,
            subject: notification.subject.clone(),
            message: notification.message.clone(),
            received_at: Utc::now(),
        });

        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.recipient,
            inbox_size = inbox.len(),
            "In-app notification delivered"
        );

        Ok(DeliveryReceipt::Confirmed)
    }
}
