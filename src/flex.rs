//! Flex messaging class names and record shapes
//!
//! Flex clients wrap RPC calls in `flex.messaging.messages.*` envelopes.
//! These helpers give the type registry ready-made shapes for the message
//! classes so their typed objects decode with a stable field layout.

use crate::amf::registry::TypeShape;

pub mod class_names {
    pub const REMOTING_MESSAGE: &str = "flex.messaging.messages.RemotingMessage";
    pub const ASYNC_MESSAGE: &str = "flex.messaging.messages.AsyncMessage";
    pub const COMMAND_MESSAGE: &str = "flex.messaging.messages.CommandMessage";
    pub const ACKNOWLEDGE_MESSAGE: &str = "flex.messaging.messages.AcknowledgeMessage";
    pub const ERROR_MESSAGE: &str = "flex.messaging.messages.ErrorMessage";
}

fn abstract_message_fields() -> TypeShape {
    TypeShape::new()
        .field("Body")
        .field("ClientId")
        .field("Destination")
        .field("Headers")
        .field("MessageId")
        .field("Timestamp")
        .field("TimeToLive")
}

/// Shape of a RemotingMessage: the abstract message fields plus the
/// operation name and source
pub fn remoting_message_shape() -> TypeShape {
    abstract_message_fields().field("Operation").field("Source")
}

/// Shape of an AsyncMessage
pub fn async_message_shape() -> TypeShape {
    abstract_message_fields().field("CorrelationId")
}

/// Shape of a CommandMessage
pub fn command_message_shape() -> TypeShape {
    async_message_shape().field("Operation")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remoting_message_shape() {
        let shape = remoting_message_shape();
        let fields = shape.fields();
        assert!(fields.contains(&"Body".to_string()));
        assert!(fields.contains(&"Operation".to_string()));
        assert!(fields.contains(&"Source".to_string()));
        assert_eq!(fields.len(), 9);
    }

    #[test]
    fn test_command_message_extends_async() {
        let base = async_message_shape().fields().len();
        assert_eq!(command_message_shape().fields().len(), base + 1);
    }
}
