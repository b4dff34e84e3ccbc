use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::channel::{
    ChannelRouter, EmailSender, InAppSender, PushSender, SmsSender, SmtpMailer,
};
use crate::config::{DispatchSettings, Settings};
use crate::error::{DispatchError, Result};
use crate::metrics::DispatchMetrics;

use super::store::{NotificationStore, StoreStats};
use super::types::{Notification, NotificationRequest, NotificationResult, NotificationStatus};

/// Statistics for the dispatch engine
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Total notification records created
    pub total_created: AtomicU64,
    /// Total successful dispatches
    pub total_sent: AtomicU64,
    /// Total failed dispatches
    pub total_failed: AtomicU64,
    /// Total retry attempts started
    pub total_retried: AtomicU64,
    /// Total pending notifications cancelled
    pub total_cancelled: AtomicU64,
}

impl EngineStats {
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_retried: self.total_retried.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine statistics
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatsSnapshot {
    pub total_created: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    pub total_cancelled: u64,
}

/// The notification dispatch engine.
///
/// Validates requests, constructs records, routes them to channel senders,
/// applies the bounded retry policy, and serves status and history queries.
/// The engine exclusively owns the store; callers only see cloned records.
pub struct DispatchEngine {
    store: NotificationStore,
    router: ChannelRouter,
    config: DispatchSettings,
    stats: EngineStats,
}

impl DispatchEngine {
    /// Create an engine over a pre-built router.
    pub fn new(router: ChannelRouter, config: DispatchSettings) -> Self {
        Self {
            store: NotificationStore::new(),
            router,
            config,
            stats: EngineStats::default(),
        }
    }

    /// Create an engine with the standard channel wiring: SMTP-backed email
    /// plus the in-process SMS, push and in-app senders.
    pub fn with_default_channels(settings: &Settings) -> Result<Self> {
        let mailer = SmtpMailer::new(&settings.email).map_err(|e| {
            DispatchError::Config(config::ConfigError::Message(format!(
                "smtp transport setup failed: {e}"
            )))
        })?;

        let router = ChannelRouter::new()
            .register(Arc::new(EmailSender::new(Arc::new(mailer))))
            .register(Arc::new(SmsSender::new()))
            .register(Arc::new(PushSender::new()))
            .register(Arc::new(InAppSender::new()));

        Ok(Self::new(router, settings.dispatch.clone()))
    }

    /// Engine configuration.
    pub fn config(&self) -> &DispatchSettings {
        &self.config
    }

    /// Engine statistics.
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of records currently stored.
    pub fn store_size(&self) -> usize {
        self.store.len()
    }

    /// Store statistics.
    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Validate and dispatch a single notification.
    ///
    /// Validation failures return an error without creating a record or
    /// contacting a channel. Every other outcome, success or delivery
    /// failure, leaves exactly one record in the store and an entry in the
    /// recipient's history.
    #[tracing::instrument(
        name = "engine.send",
        skip(self, request),
        fields(recipient = %request.recipient, channel = %request.channel)
    )]
    pub async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        request.validate().map_err(DispatchError::Validation)?;

        let notification = Notification::from_request(request);
        let id = notification.id;

        self.store.insert(notification.clone());
        self.stats.total_created.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_created(notification.channel);

        tracing::info!(
            notification_id = %id,
            recipient = %notification.recipient,
            channel = %notification.channel,
            priority = ?notification.priority,
            "Notification created"
        );

        self.dispatch_stored(notification).await
    }

    /// Dispatch a batch of requests, one result per request in input order.
    ///
    /// Per-item failures (validation included) are converted into failure
    /// results; one bad item never aborts the batch.
    pub async fn send_bulk(&self, requests: &[NotificationRequest]) -> Vec<NotificationResult> {
        DispatchMetrics::record_bulk(requests.len());

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = match self.send(request).await {
                Ok(result) => result,
                Err(e) => NotificationResult::failure(e.to_string()),
            };
            results.push(result);
        }

        tracing::info!(
            requested = requests.len(),
            succeeded = results.iter().filter(|r| r.success).count(),
            "Bulk send completed"
        );

        results
    }

    /// Look up a notification by id. Pure read, no side effects.
    pub fn status(&self, id: Uuid) -> Option<Notification> {
        self.store.get(id)
    }

    /// Recent notifications for a recipient, newest first, capped at the
    /// configured default history limit.
    pub fn history(&self, recipient: &str) -> Result<Vec<Notification>> {
        self.history_with_limit(recipient, self.config.history_limit)
    }

    /// Recent notifications for a recipient, newest first, capped at
    /// `limit`. Unknown recipients yield an empty vec, not an error.
    pub fn history_with_limit(&self, recipient: &str, limit: usize) -> Result<Vec<Notification>> {
        if recipient.trim().is_empty() {
            return Err(DispatchError::Validation(
                "recipient cannot be empty".to_string(),
            ));
        }
        Ok(self.store.history(recipient, limit))
    }

    /// Retry a failed notification.
    ///
    /// Only records in `Failed` status with retry budget remaining are
    /// eligible. An allowed retry consumes one attempt, resets the record to
    /// `Pending`, clears the error message and re-dispatches through the
    /// same routing as `send`. Channel, recipient, `created_at` and
    /// previously set timestamps are untouched.
    #[tracing::instrument(name = "engine.retry", skip(self), fields(notification_id = %id))]
    pub async fn retry(&self, id: Uuid) -> Result<NotificationResult> {
        let max_retries = self.config.max_retries;

        // Precondition checks and the arm-for-retry mutation happen under a
        // single record guard so concurrent retries cannot double-spend an
        // attempt.
        let snapshot = self
            .store
            .with_record_mut(id, |n| {
                if n.status != NotificationStatus::Failed {
                    return Err(DispatchError::InvalidState { status: n.status });
                }
                if n.retry_count >= max_retries {
                    return Err(DispatchError::RetriesExhausted { max: max_retries });
                }
                n.retry_count += 1;
                n.status = NotificationStatus::Pending;
                n.error_message = None;
                Ok(n.clone())
            })
            .ok_or(DispatchError::NotFound(id))??;

        self.stats.total_retried.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_retried();

        tracing::info!(
            notification_id = %id,
            retry_count = snapshot.retry_count,
            channel = %snapshot.channel,
            "Retrying notification"
        );

        self.dispatch_stored(snapshot).await
    }

    /// Cancel a pending notification.
    ///
    /// Returns true only when the record existed in `Pending` and was moved
    /// to `Cancelled`; false otherwise, with no mutation. With synchronous
    /// dispatch the pending window is the in-flight delivery call, so this
    /// mostly matters once dispatch becomes asynchronous.
    pub fn cancel(&self, id: Uuid) -> bool {
        let cancelled = self
            .store
            .with_record_mut(id, |n| {
                if n.status == NotificationStatus::Pending {
                    n.status = NotificationStatus::Cancelled;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        if cancelled {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_cancelled();
            tracing::info!(notification_id = %id, "Notification cancelled");
        }

        cancelled
    }

    /// Route the snapshot to its channel sender and apply the resulting
    /// lifecycle transition.
    ///
    /// The store guard is never held across the delivery call: the sender
    /// works on a snapshot, and the record is re-acquired afterwards. The
    /// transition only applies while the record is still `Pending`, so a
    /// record cancelled mid-flight keeps its `Cancelled` status.
    async fn dispatch_stored(&self, snapshot: Notification) -> Result<NotificationResult> {
        let id = snapshot.id;
        let channel = snapshot.channel;

        let outcome = match self.router.sender_for(channel) {
            Ok(sender) => sender.deliver(&snapshot).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(receipt) => {
                let now = Utc::now();
                let applied = self
                    .store
                    .with_record_mut(id, |n| {
                        if n.status != NotificationStatus::Pending {
                            return false;
                        }
                        n.status = NotificationStatus::Sent;
                        // First-attempt timestamps survive retries
                        if n.sent_at.is_none() {
                            n.sent_at = Some(now);
                        }
                        if receipt.is_confirmed() {
                            n.status = NotificationStatus::Delivered;
                            if n.delivered_at.is_none() {
                                n.delivered_at = Some(now);
                            }
                        }
                        true
                    })
                    .unwrap_or(false);

                if applied {
                    self.stats.total_sent.fetch_add(1, Ordering::Relaxed);
                    DispatchMetrics::record_sent(channel);
                    tracing::info!(
                        notification_id = %id,
                        channel = %channel,
                        confirmed = receipt.is_confirmed(),
                        "Notification dispatched"
                    );
                } else {
                    tracing::debug!(
                        notification_id = %id,
                        "Dispatch completed for a record no longer pending"
                    );
                }

                Ok(NotificationResult::success(id))
            }
            Err(e) => {
                let message = e.to_string();

                self.store.with_record_mut(id, |n| {
                    if n.status == NotificationStatus::Pending {
                        n.status = NotificationStatus::Failed;
                        n.error_message = Some(message.clone());
                    }
                });

                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_failed(channel);
                tracing::warn!(
                    notification_id = %id,
                    channel = %channel,
                    error = %message,
                    "Notification dispatch failed"
                );

                Ok(NotificationResult::failure_for(id, message))
            }
        }
    }
}
