// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer (business logic)
pub mod channel;
pub mod notification;

pub use channel::{
    ChannelRouter, ChannelSender, DeliveryReceipt, EmailSender, InAppMessage, InAppSender,
    MailTransport, MailTransportError, PushSender, SmsSender, SmtpMailer,
};
pub use config::Settings;
pub use error::{DispatchError, Result};
pub use notification::{
    Channel, DispatchEngine, EngineStatsSnapshot, Notification, NotificationRequest,
    NotificationResult, NotificationStatus, Priority,
};
