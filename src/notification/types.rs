use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery medium for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email via an SMTP transport
    Email,
    /// Text message
    Sms,
    /// Mobile/desktop push
    Push,
    /// In-process inbox
    InApp,
}

impl Channel {
    /// Stable lowercase name, used for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::InApp => "in_app",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority levels for notifications.
///
/// Informational only: the engine records priority but does not schedule
/// by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Priority {
    /// Low priority, can be delayed
    Low,
    /// Normal priority (default)
    #[default]
    Normal,
    /// High priority, should be delivered promptly
    High,
    /// Critical priority, immediate delivery required
    Critical,
}

impl Priority {
    /// Get numeric value for priority comparison
    pub fn as_weight(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_weight().cmp(&other.as_weight())
    }
}

/// Lifecycle state of a notification.
///
/// Transitions: `Pending → Sent → Delivered`, `Pending → Failed`,
/// `Failed → Pending` (retry, bounded), `Pending → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    /// Created, dispatch not yet completed
    Pending,
    /// Handed to the channel's delivery infrastructure
    Sent,
    /// Channel sender confirmed delivery
    Delivered,
    /// Dispatch raised an error; retryable until the ceiling
    Failed,
    /// Cancelled while pending; terminal
    Cancelled,
}

impl NotificationStatus {
    /// States that never transition again. `Failed` is only terminal once
    /// the retry ceiling is reached, so it is not listed here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Sent
                | NotificationStatus::Delivered
                | NotificationStatus::Cancelled
        )
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationStatus::Pending => "Pending",
            NotificationStatus::Sent => "Sent",
            NotificationStatus::Delivered => "Delivered",
            NotificationStatus::Failed => "Failed",
            NotificationStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// A notification record: the unit of work and its audit trail.
///
/// Records are owned exclusively by the engine's store; callers only ever
/// receive clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier, generated at creation, store primary key
    pub id: Uuid,
    /// Destination: address, phone number, device token or user id
    pub recipient: String,
    /// Optional subject line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body
    pub message: String,
    /// Delivery channel, fixed at creation
    pub channel: Channel,
    /// Priority level
    pub priority: Priority,
    /// Current lifecycle state
    pub status: NotificationStatus,
    /// When the record was constructed
    pub created_at: DateTime<Utc>,
    /// First successful hand-off to the channel; preserved across retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// First confirmed delivery; preserved across retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Free-form key/value pairs copied from the request; channel senders
    /// may read well-known keys (e.g. `"html"` for the email body format)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Last delivery error; cleared when a retry begins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Retry attempts consumed so far
    pub retry_count: u32,
}

impl Notification {
    /// Construct a `Pending` record from a request.
    pub fn from_request(request: &NotificationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: request.recipient.clone(),
            subject: request.subject.clone(),
            message: request.message.clone(),
            channel: request.channel,
            priority: request.priority,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
            sent_at: None,
            delivered_at: None,
            metadata: request.metadata.clone(),
            error_message: None,
            retry_count: 0,
        }
    }

    /// Metadata lookup for the boolean flags channel senders understand.
    pub fn metadata_flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Caller input for a single notification. Pure input, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    pub recipient: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    pub channel: Channel,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl NotificationRequest {
    /// Create a request with the required fields; the rest via the builder
    /// methods below.
    pub fn new(
        recipient: impl Into<String>,
        message: impl Into<String>,
        channel: Channel,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: None,
            message: message.into(),
            channel,
            priority: Priority::default(),
            metadata: HashMap::new(),
        }
    }

    /// Set the subject line
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the request preconditions: recipient and message must be
    /// non-blank. Returns the human-readable reason on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.recipient.trim().is_empty() {
            return Err("recipient cannot be empty".to_string());
        }
        if self.message.trim().is_empty() {
            return Err("message cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Outcome of a send or retry operation. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    /// Whether dispatch completed without error
    pub success: bool,
    /// The stored record's id; present on success and on delivery-failure
    /// paths where a record was created before the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<Uuid>,
    /// Error description on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
}

impl NotificationResult {
    /// Successful dispatch of the given record.
    pub fn success(notification_id: Uuid) -> Self {
        Self {
            success: true,
            notification_id: Some(notification_id),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Failure with no associated record (e.g. a bulk item that failed
    /// validation).
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            notification_id: None,
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }

    /// Delivery failure for a record that was stored before the error; the
    /// id stays resolvable through status queries.
    pub fn failure_for(notification_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            notification_id: Some(notification_id),
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }
}
