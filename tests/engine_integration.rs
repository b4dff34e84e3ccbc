//! End-to-end tests for the dispatch engine.
//!
//! These drive the engine through the public API with scripted channel
//! senders and a recording mail transport, without any real SMTP server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use notify_dispatch::channel::METADATA_HTML_BODY;
use notify_dispatch::config::DispatchSettings;
use notify_dispatch::{
    Channel, ChannelRouter, ChannelSender, DeliveryReceipt, DispatchEngine, DispatchError,
    EmailSender, InAppSender, MailTransport, MailTransportError, Notification,
    NotificationRequest, NotificationStatus, Priority, Result,
};

// =============================================================================
// Test doubles
// =============================================================================

/// Channel sender with a scripted outcome per delivery call.
///
/// Each call pops the next outcome (`true` = fail); an empty script means
/// success. Delivered notifications are recorded for inspection.
struct ScriptedSender {
    channel: Channel,
    receipt: DeliveryReceipt,
    outcomes: Mutex<VecDeque<bool>>,
    delivered: Mutex<Vec<Notification>>,
}

impl ScriptedSender {
    fn succeeding(channel: Channel) -> Arc<Self> {
        Self::scripted(channel, [])
    }

    fn scripted(channel: Channel, fail_script: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Arc::new(Self {
            channel,
            receipt: DeliveryReceipt::Accepted,
            outcomes: Mutex::new(fail_script.into_iter().collect()),
            delivered: Mutex::new(Vec::new()),
        })
    }

    fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        let fail = self.outcomes.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(DispatchError::ExternalService("SMTP Error".to_string()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(self.receipt)
    }
}

/// Sender that blocks until released, to hold a record in `Pending`.
struct GatedSender {
    channel: Channel,
    release: Notify,
}

impl GatedSender {
    fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl ChannelSender for GatedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn deliver(&self, _notification: &Notification) -> Result<DeliveryReceipt> {
        self.release.notified().await;
        Ok(DeliveryReceipt::Confirmed)
    }
}

/// Mail transport that records calls instead of speaking SMTP.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, String, String, bool)>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> std::result::Result<(), MailTransportError> {
        self.sent.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
            is_html,
        ));
        Ok(())
    }
}

fn engine_with(senders: Vec<Arc<dyn ChannelSender>>) -> DispatchEngine {
    let mut router = ChannelRouter::new();
    for sender in senders {
        router = router.register(sender);
    }
    DispatchEngine::new(router, DispatchSettings::default())
}

// =============================================================================
// Send
// =============================================================================

mod send_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_send_resolves_via_status() {
        let sender = ScriptedSender::succeeding(Channel::Email);
        let engine = engine_with(vec![sender.clone()]);

        let request = NotificationRequest::new("a@example.com", "Test", Channel::Email)
            .subject("Hi")
            .priority(Priority::Normal);
        let result = engine.send(&request).await.unwrap();

        assert!(result.success);
        assert!(result.error_message.is_none());
        assert_eq!(sender.delivered_count(), 1);

        let record = engine.status(result.notification_id.unwrap()).unwrap();
        assert_eq!(record.recipient, "a@example.com");
        assert_eq!(record.channel, Channel::Email);
        assert_eq!(record.message, "Test");
        assert_eq!(record.subject.as_deref(), Some("Hi"));
        assert_eq!(record.status, NotificationStatus::Sent);
        assert!(record.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_send_stores_auditable_record() {
        let sender = ScriptedSender::scripted(Channel::Email, [true]);
        let engine = engine_with(vec![sender]);

        let request = NotificationRequest::new("a@example.com", "Test", Channel::Email);
        let result = engine.send(&request).await.unwrap();

        assert!(!result.success);
        let id = result.notification_id.expect("failure result keeps the id");

        let record = engine.status(id).unwrap();
        assert_eq!(record.status, NotificationStatus::Failed);
        let error = record.error_message.unwrap();
        assert!(!error.is_empty());
        assert!(error.contains("External service error"));
    }

    #[tokio::test]
    async fn test_blank_recipient_and_message_create_nothing() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);

        for request in [
            NotificationRequest::new("", "Test", Channel::Email),
            NotificationRequest::new("a@example.com", "", Channel::Email),
        ] {
            assert!(matches!(
                engine.send(&request).await,
                Err(DispatchError::Validation(_))
            ));
        }

        assert_eq!(engine.store_size(), 0);
    }

    #[tokio::test]
    async fn test_status_of_unknown_id_is_none() {
        let engine = engine_with(vec![]);
        assert!(engine.status(uuid::Uuid::new_v4()).is_none());
    }
}

// =============================================================================
// Retry
// =============================================================================

mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_on_sent_record_fails_without_consuming_budget() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);
        let request = NotificationRequest::new("a@example.com", "Test", Channel::Email);
        let id = engine
            .send(&request)
            .await
            .unwrap()
            .notification_id
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(
                engine.retry(id).await,
                Err(DispatchError::InvalidState { .. })
            ));
        }
        assert_eq!(engine.status(id).unwrap().retry_count, 0);
    }

    #[tokio::test]
    async fn test_retry_ceiling_holds_even_when_channel_recovers() {
        // First send and the first three retries fail; afterwards the
        // channel would succeed, but the budget is spent.
        let sender = ScriptedSender::scripted(Channel::Sms, [true, true, true, true]);
        let engine = engine_with(vec![sender]);

        let request = NotificationRequest::new("+1234567890", "Test", Channel::Sms);
        let id = engine
            .send(&request)
            .await
            .unwrap()
            .notification_id
            .unwrap();

        for _ in 0..3 {
            let result = engine.retry(id).await.unwrap();
            assert!(!result.success);
        }

        assert!(matches!(
            engine.retry(id).await,
            Err(DispatchError::RetriesExhausted { max: 3 })
        ));
        assert_eq!(engine.status(id).unwrap().retry_count, 3);
        assert_eq!(
            engine.status(id).unwrap().status,
            NotificationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_retry_clears_error_and_keeps_identity() {
        let sender = ScriptedSender::scripted(Channel::Email, [true]);
        let engine = engine_with(vec![sender]);

        let request = NotificationRequest::new("a@example.com", "Test", Channel::Email);
        let id = engine
            .send(&request)
            .await
            .unwrap()
            .notification_id
            .unwrap();
        let failed = engine.status(id).unwrap();

        let result = engine.retry(id).await.unwrap();
        assert!(result.success);

        let record = engine.status(id).unwrap();
        assert_eq!(record.status, NotificationStatus::Sent);
        assert!(record.error_message.is_none());
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.channel, failed.channel);
        assert_eq!(record.recipient, failed.recipient);
        assert_eq!(record.created_at, failed.created_at);
    }
}

// =============================================================================
// Cancel
// =============================================================================

mod cancel_tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_unknown_id_returns_false() {
        let engine = engine_with(vec![]);
        assert!(!engine.cancel(uuid::Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_cancel_in_flight_record_exactly_once() {
        let sender = GatedSender::new(Channel::Push);
        let engine = Arc::new(engine_with(vec![sender.clone()]));

        let send_engine = engine.clone();
        let send_task = tokio::spawn(async move {
            let request = NotificationRequest::new("device-1", "ping", Channel::Push);
            send_engine.send(&request).await.unwrap()
        });

        // Wait for the record to appear in Pending while dispatch is blocked
        let id = loop {
            if let Some(record) = engine.history("device-1").unwrap().first() {
                break record.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(
            engine.status(id).unwrap().status,
            NotificationStatus::Pending
        );

        assert!(engine.cancel(id));
        assert!(!engine.cancel(id), "second cancel must return false");

        // Let the in-flight dispatch finish; it must not overwrite Cancelled
        sender.release.notify_one();
        send_task.await.unwrap();

        assert_eq!(
            engine.status(id).unwrap().status,
            NotificationStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_settled_record_returns_false() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);
        let request = NotificationRequest::new("a@example.com", "Test", Channel::Email);
        let id = engine
            .send(&request)
            .await
            .unwrap()
            .notification_id
            .unwrap();

        assert!(!engine.cancel(id));
        assert_eq!(engine.status(id).unwrap().status, NotificationStatus::Sent);
    }
}

// =============================================================================
// History
// =============================================================================

mod history_tests {
    use super::*;

    #[tokio::test]
    async fn test_history_returns_newest_first_with_limit() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);

        let mut ids = Vec::new();
        for i in 0..3 {
            let request =
                NotificationRequest::new("u1", format!("Message {i}"), Channel::Email);
            ids.push(
                engine
                    .send(&request)
                    .await
                    .unwrap()
                    .notification_id
                    .unwrap(),
            );
        }

        let history = engine.history_with_limit("u1", 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, ids[2]);
        assert_eq!(history[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_history_empty_for_unknown_recipient() {
        let engine = engine_with(vec![]);
        assert!(engine.history("nobody@example.com").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_rejects_blank_recipient() {
        let engine = engine_with(vec![]);
        assert!(matches!(
            engine.history(""),
            Err(DispatchError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_sends_still_appear_in_history() {
        let sender = ScriptedSender::scripted(Channel::Email, [false, true]);
        let engine = engine_with(vec![sender]);

        for _ in 0..2 {
            let request = NotificationRequest::new("u1", "msg", Channel::Email);
            engine.send(&request).await.unwrap();
        }

        let history = engine.history("u1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, NotificationStatus::Failed);
        assert_eq!(history[1].status, NotificationStatus::Sent);
    }
}

// =============================================================================
// Bulk send
// =============================================================================

mod bulk_tests {
    use super::*;

    #[tokio::test]
    async fn test_bulk_mixed_outcomes_keep_order_and_records() {
        let sender = ScriptedSender::scripted(Channel::Email, [false, true]);
        let engine = engine_with(vec![sender]);

        let requests = vec![
            NotificationRequest::new("user1@example.com", "Message 1", Channel::Email),
            NotificationRequest::new("user2@example.com", "Message 2", Channel::Email),
        ];
        let results = engine.send_bulk(&requests).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);

        // Both attempts are stored
        assert_eq!(engine.store_size(), 2);
        let failed = engine.status(results[1].notification_id.unwrap()).unwrap();
        assert_eq!(failed.status, NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn test_bulk_invalid_item_does_not_abort_batch() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);

        let requests = vec![
            NotificationRequest::new("u1@example.com", "ok", Channel::Email),
            NotificationRequest::new("", "blank recipient", Channel::Email),
            NotificationRequest::new("u2@example.com", "ok too", Channel::Email),
        ];
        let results = engine.send_bulk(&requests).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].notification_id.is_none());
        assert!(results[1]
            .error_message
            .as_deref()
            .unwrap()
            .contains("Validation error"));
        assert!(results[2].success);

        // Only the valid items created records
        assert_eq!(engine.store_size(), 2);
    }

    #[tokio::test]
    async fn test_bulk_empty_input() {
        let engine = engine_with(vec![]);
        assert!(engine.send_bulk(&[]).await.is_empty());
    }
}

// =============================================================================
// Channel wiring
// =============================================================================

mod channel_tests {
    use super::*;

    #[tokio::test]
    async fn test_unrouted_channel_leaves_failed_record() {
        let engine = engine_with(vec![ScriptedSender::succeeding(Channel::Email)]);

        let request = NotificationRequest::new("user-1", "msg", Channel::InApp);
        let result = engine.send(&request).await.unwrap();

        assert!(!result.success);
        let record = engine.status(result.notification_id.unwrap()).unwrap();
        assert_eq!(record.status, NotificationStatus::Failed);
        assert!(record
            .error_message
            .unwrap()
            .contains("Channel not supported"));
    }

    #[tokio::test]
    async fn test_email_end_to_end_through_mail_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let engine = engine_with(vec![Arc::new(EmailSender::new(transport.clone()))]);

        let request = NotificationRequest::new("a@example.com", "<b>Test</b>", Channel::Email)
            .subject("Hi")
            .metadata(METADATA_HTML_BODY, "true");
        let result = engine.send(&request).await.unwrap();
        assert!(result.success);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, subject, body, is_html) = &sent[0];
        assert_eq!(to, "a@example.com");
        assert_eq!(subject, "Hi");
        assert_eq!(body, "<b>Test</b>");
        assert!(*is_html);
    }

    #[tokio::test]
    async fn test_in_app_end_to_end_lands_in_inbox() {
        let sender = Arc::new(InAppSender::new());
        let engine = engine_with(vec![sender.clone()]);

        let request = NotificationRequest::new("user-123", "You have a new message", Channel::InApp)
            .subject("In-App Notification");
        let result = engine.send(&request).await.unwrap();
        assert!(result.success);

        let record = engine.status(result.notification_id.unwrap()).unwrap();
        assert_eq!(record.status, NotificationStatus::Delivered);
        assert!(record.delivered_at.is_some());

        let inbox = sender.inbox("user-123");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message, "You have a new message");
    }
}
