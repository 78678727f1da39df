use thiserror::Error;

/// Errors that can occur within the message bus system
#[derive(Error, Debug)]
pub enum MessageBusError {
    /// Failed to send a message to subscribers
    #[error("Failed to send message: {reason}")]
    SendFailed { reason: String },

    /// Channel is disconnected
    #[error("Channel disconnected for event type: {event_type}")]
    ChannelDisconnected { event_type: String },
}

/// Result type for message bus operations
pub type MessageBusResult<T> = Result<T, MessageBusError>;
