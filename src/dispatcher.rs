// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Dispatcher
//!
//! A subscription owns a dedicated channel, a dead-lettered queue bound to an
//! exchange, and one tokio task that drains the queue. For every delivery the
//! task decodes the body, hands the value to a typed [`Handler`] and settles
//! the delivery according to the returned [`HandlerOutcome`].
//!
//! Deliveries of one subscription are handled one at a time, in the order the
//! broker hands them out. Separate subscriptions run independently of each
//! other. A failing delivery never stops the loop; the loop ends when the
//! channel or connection is closed.

use crate::{
    codec::Codec,
    config::DEFAULT_PREFETCH,
    errors::AmqpError,
    otel,
    outcome::{settle, Acknowledge, HandlerOutcome},
    queue::QueueKind,
    topology::declare_and_bind,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Connection,
};
use opentelemetry::{
    global,
    trace::{Span, Status},
};
use std::{borrow::Cow, marker::PhantomData};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Domain-side consumer of decoded messages.
#[async_trait]
pub trait Handler<T>: Send + Sync {
    async fn handle(&self, msg: T) -> HandlerOutcome;
}

/// Where a subscription reads from and how much it may hold unacknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDefinition<'s> {
    pub(crate) exchange: &'s str,
    pub(crate) queue_name: &'s str,
    pub(crate) binding_key: &'s str,
    pub(crate) kind: QueueKind,
    pub(crate) prefetch: u16,
}

impl<'s> SubscriptionDefinition<'s> {
    /// Creates a durable subscription definition with the default prefetch.
    pub fn new(exchange: &'s str, queue_name: &'s str, binding_key: &'s str) -> Self {
        SubscriptionDefinition {
            exchange,
            queue_name,
            binding_key,
            kind: QueueKind::Durable,
            prefetch: DEFAULT_PREFETCH,
        }
    }

    pub fn kind(mut self, kind: QueueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn durable(self) -> Self {
        self.kind(QueueKind::Durable)
    }

    pub fn transient(self) -> Self {
        self.kind(QueueKind::Transient)
    }

    /// Caps the number of unacknowledged deliveries held by this consumer.
    pub fn prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }
}

/// Handle to a running delivery loop.
pub struct Subscription<T> {
    queue_name: String,
    task: JoinHandle<()>,
    _msg: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
    /// Name of the queue as declared by the broker.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Waits for the delivery loop to end, which happens once its channel or
    /// connection is closed.
    ///
    /// # Returns
    /// `Ok(())` when the loop drained normally, or
    /// [`AmqpError::InternalError`] if the task panicked
    pub async fn join(self) -> Result<(), AmqpError> {
        self.task.await.map_err(|err| {
            error!(error = err.to_string(), "delivery loop failed");
            AmqpError::InternalError
        })
    }
}

/// Builds the queue topology for `def` and starts its delivery loop.
///
/// Topology, QoS and consumer errors are returned immediately. Once this
/// returns `Ok`, per-message failures are only logged.
///
/// # Parameters
/// * `conn` - Connection the subscription opens its own channel on
/// * `def` - Exchange, queue, binding key, durability and prefetch
/// * `codec` - Decoder for delivery bodies
/// * `handler` - Domain handler invoked once per decoded delivery
///
/// # Returns
/// A [`Subscription`] handle for the spawned delivery loop
pub async fn subscribe<T, C, H>(
    conn: &Connection,
    def: &SubscriptionDefinition<'_>,
    codec: C,
    handler: H,
) -> Result<Subscription<T>, AmqpError>
where
    T: Send + 'static,
    C: Codec<T> + 'static,
    H: Handler<T> + 'static,
{
    let (channel, queue) =
        declare_and_bind(conn, def.exchange, def.queue_name, def.binding_key, def.kind).await?;
    let queue_name = queue.name().to_string();

    if let Err(err) = channel
        .basic_qos(def.prefetch, BasicQosOptions { global: false })
        .await
    {
        error!(error = err.to_string(), "failure to configure qos");
        return Err(AmqpError::QoSDeclarationError(queue_name));
    }

    let consumer = match channel
        .basic_consume(
            &queue_name,
            "",
            BasicConsumeOptions {
                no_local: false,
                no_ack: false,
                exclusive: false,
                nowait: false,
            },
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(error = err.to_string(), "error to create the consumer");
            Err(AmqpError::ConsumerDeclarationError(queue_name.clone()))
        }
        Ok(c) => Ok(c),
    }?;

    debug!(
        "consuming queue: {} bound to {} with key {}",
        queue_name, def.exchange, def.binding_key
    );

    let task = tokio::spawn({
        let queue_name = queue_name.clone();
        async move {
            // The channel stays open for as long as its delivery loop runs.
            let _channel = channel;
            let mut consumer = consumer;
            let tracer = global::tracer("amqp consumer");

            while let Some(result) = consumer.next().await {
                let delivery = match result {
                    Ok(delivery) => delivery,
                    Err(err) => {
                        error!(error = err.to_string(), "errors consume msg");
                        continue;
                    }
                };

                let mut span = otel::new_span(&delivery.properties, &tracer, &queue_name);
                let content_type = delivery
                    .properties
                    .content_type()
                    .as_ref()
                    .map(|ct| ct.as_str());

                match dispatch(&delivery.data, content_type, &delivery.acker, &codec, &handler)
                    .await
                {
                    Ok(_) => span.set_status(Status::Ok),
                    Err(err) => {
                        error!(error = err.to_string(), "error consume msg");
                        span.record_error(&err);
                        span.set_status(Status::Error {
                            description: Cow::from(err.to_string()),
                        });
                    }
                }
                span.end();
            }

            debug!("delivery loop for queue: {} finished", queue_name);
        }
    });

    Ok(Subscription {
        queue_name,
        task,
        _msg: PhantomData,
    })
}

/// Processes one delivery body and settles it.
///
/// A body that cannot be decoded is discarded without reaching the handler,
/// since redelivering it would fail the same way.
///
/// # Parameters
/// * `data` - Raw delivery body
/// * `content_type` - Content type the publisher tagged the body with, if any
/// * `acker` - Acknowledgment primitives of the delivery
/// * `codec` - Decoder for the body
/// * `handler` - Domain handler
///
/// # Returns
/// The outcome that was applied, or the broker error raised while settling
pub async fn dispatch<T, C, H, A>(
    data: &[u8],
    content_type: Option<&str>,
    acker: &A,
    codec: &C,
    handler: &H,
) -> Result<HandlerOutcome, AmqpError>
where
    C: Codec<T> + ?Sized,
    H: Handler<T> + ?Sized,
    A: Acknowledge + ?Sized,
{
    if let Some(ct) = content_type {
        if ct != codec.content_type() {
            warn!(
                received = ct,
                expected = codec.content_type(),
                "unexpected content type"
            );
        }
    }

    let outcome = match codec.decode(data) {
        Ok(value) => handler.handle(value).await,
        Err(err) => {
            error!(error = err.to_string(), "failure to decode payload, discarding");
            HandlerOutcome::NackDiscard
        }
    };

    settle(acker, outcome).await?;
    Ok(outcome)
}
