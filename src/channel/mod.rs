//! Channel senders and routing.
//!
//! Each delivery medium implements the `ChannelSender` trait; the
//! `ChannelRouter` maps a notification's channel to the registered sender.
//! Email is backed by a real SMTP transport, the others are in-process
//! implementations that honor the same contract so the router stays uniform.

mod email;
mod in_app;
mod push;
mod sms;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use email::{EmailSender, MailTransport, MailTransportError, SmtpMailer, METADATA_HTML_BODY};
pub use in_app::{InAppMessage, InAppSender};
pub use push::PushSender;
pub use sms::SmsSender;

use crate::error::{DispatchError, Result};
use crate::notification::{Channel, Notification};

/// What a sender reports after a delivery attempt completes without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryReceipt {
    /// Handed to external delivery infrastructure; confirmation may come
    /// later or never (e.g. SMTP accept)
    Accepted,
    /// Delivery confirmed synchronously
    Confirmed,
}

impl DeliveryReceipt {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, DeliveryReceipt::Confirmed)
    }
}

/// A delivery capability for one channel.
///
/// The single contract: attempt delivery of the notification and either
/// return a receipt or an error. Senders own their timeouts; the engine
/// imposes none.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender handles.
    fn channel(&self) -> Channel;

    /// Attempt delivery.
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt>;
}

/// Maps a channel to its registered sender.
///
/// Built once at startup and immutable afterwards. Lookups for a channel
/// with no registered sender fail with `UnsupportedChannel` rather than
/// silently succeeding.
pub struct ChannelRouter {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self {
            senders: HashMap::new(),
        }
    }

    /// Register a sender under its own channel. Re-registering a channel
    /// replaces the previous sender.
    pub fn register(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    /// Resolve the sender for a channel.
    pub fn sender_for(&self, channel: Channel) -> Result<&Arc<dyn ChannelSender>> {
        self.senders
            .get(&channel)
            .ok_or(DispatchError::UnsupportedChannel(channel))
    }

    /// Channels with a registered sender.
    pub fn channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}
