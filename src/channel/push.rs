//! Push channel sender.
//!
//! No push provider is integrated; delivery is simulated while preserving
//! the `ChannelSender` contract.

use async_trait::async_trait;

use super::{ChannelSender, DeliveryReceipt};
use crate::error::Result;
use crate::notification::{Channel, Notification};

/// Simulated push sender.
pub struct PushSender;

impl PushSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PushSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for PushSender {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        tracing::info!(
            notification_id = %notification.id,
            device_token = %notification.recipient,
            "Push notification delivered (simulated)"
        );
        Ok(DeliveryReceipt::Confirmed)
    }
}
