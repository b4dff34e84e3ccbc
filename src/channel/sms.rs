//! SMS channel sender.
//!
//! No SMS gateway is integrated; delivery is simulated while preserving the
//! `ChannelSender` contract so the router treats every channel uniformly.

use async_trait::async_trait;

use super::{ChannelSender, DeliveryReceipt};
use crate::error::Result;
use crate::notification::{Channel, Notification};

/// Simulated SMS sender.
pub struct SmsSender;

impl SmsSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SmsSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        tracing::info!(
            notification_id = %notification.id,
            recipient = %notification.recipient,
            "SMS delivered (simulated)"
        );
        Ok(DeliveryReceipt::Confirmed)
    }
}
