// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! Publishing is fire-and-forget: the body is encoded synchronously and handed
//! to the broker without waiting for a publisher confirm. Nothing is retried
//! here; callers decide whether a failed publish should be attempted again.

use crate::{codec::Codec, errors::AmqpError, otel};
use async_trait::async_trait;
use lapin::{
    options::BasicPublishOptions,
    types::{FieldTable, ShortString},
    BasicProperties, Channel,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Sends an already encoded body to an exchange.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `payload` to `exchange` under `key`.
    ///
    /// # Parameters
    /// * `exchange` - Target exchange
    /// * `key` - Routing key
    /// * `content_type` - Content type tag of the payload
    /// * `payload` - Encoded message body
    async fn publish_raw(
        &self,
        exchange: &str,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<(), AmqpError>;
}

/// Encodes `value` with `codec` and publishes it tagged with the codec's
/// content type.
///
/// # Parameters
/// * `publisher` - Transport the encoded body is handed to
/// * `exchange` - Target exchange
/// * `key` - Routing key
/// * `value` - Message to send
/// * `codec` - Encoding, which also decides the content type
///
/// # Returns
/// Encoding errors without publishing anything, or the publisher's error
pub async fn publish<T, C, P>(
    publisher: &P,
    exchange: &str,
    key: &str,
    value: &T,
    codec: &C,
) -> Result<(), AmqpError>
where
    C: Codec<T> + ?Sized,
    P: Publisher + ?Sized,
{
    let payload = codec.encode(value).map_err(|err| {
        error!(error = err.to_string(), "error encoding message");
        err
    })?;

    publisher
        .publish_raw(exchange, key, codec.content_type(), payload)
        .await
}

/// Publisher backed by a lapin channel.
///
/// Channels must not be written to concurrently, so every publish goes
/// through an async mutex owned by the publisher.
pub struct AmqpPublisher {
    channel: Arc<Channel>,
    guard: Mutex<()>,
}

impl AmqpPublisher {
    pub fn new(channel: Arc<Channel>) -> Arc<AmqpPublisher> {
        Arc::new(AmqpPublisher {
            channel,
            guard: Mutex::new(()),
        })
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish_raw(
        &self,
        exchange: &str,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<(), AmqpError> {
        let headers = otel::inject_current();
        let _guard = self.guard.lock().await;

        match self
            .channel
            .basic_publish(
                exchange,
                key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &payload,
                BasicProperties::default()
                    .with_content_type(ShortString::from(content_type))
                    .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
                    .with_headers(FieldTable::from(headers)),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    exchange, key, "error publishing message"
                );
                Err(AmqpError::PublishingError)
            }
            _ => {
                debug!("message published to {} with key {}", exchange, key);
                Ok(())
            }
        }
    }
}
