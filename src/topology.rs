// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! Declares queues and binds them to exchanges. Any failure here means the
//! topology is misconfigured, so errors are returned to the caller and never
//! retried.

use crate::{
    channel::new_amqp_channel,
    errors::AmqpError,
    exchange::{declare_exchanges, ExchangeDefinition},
    queue::{QueueBinding, QueueDefinition, QueueKind},
    routing::{DEAD_LETTER_QUEUE, EXCHANGE_PERIL_DIRECT, EXCHANGE_PERIL_DLX, EXCHANGE_PERIL_TOPIC},
};
use lapin::{
    options::{QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, Queue,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Opens a dedicated channel, declares `queue_name` with the requested
/// durability and binds it to `exchange` under `key`.
///
/// The returned channel owns the queue: a transient queue disappears once
/// that channel's connection closes.
///
/// # Parameters
/// * `conn` - Connection to open the channel on
/// * `exchange` - Exchange to bind to; it must already exist
/// * `queue_name` - Queue to declare
/// * `key` - Binding key, may contain wildcards on a topic exchange
/// * `kind` - Durable or transient queue
///
/// # Returns
/// The channel and the declared queue, or the first topology error
pub async fn declare_and_bind(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    key: &str,
    kind: QueueKind,
) -> Result<(Arc<Channel>, Queue), AmqpError> {
    let channel = new_amqp_channel(conn).await?;

    let def = QueueDefinition::new(queue_name).kind(kind);
    let queue = declare_queue(&channel, &def).await?;

    let binding = QueueBinding::new(queue.name().as_str())
        .exchange(exchange)
        .routing_key(key);
    bind_queue(&channel, &binding).await?;

    Ok((channel, queue))
}

/// Declares a single queue from its definition.
pub async fn declare_queue(channel: &Channel, def: &QueueDefinition) -> Result<Queue, AmqpError> {
    debug!("creating {} queue: {}", def.kind, def.name);

    match channel
        .queue_declare(&def.name, def.options(), def.arguments())
        .await
    {
        Ok(queue) => {
            debug!("queue: {} was created", def.name);
            Ok(queue)
        }
        Err(err) => {
            error!(
                error = err.to_string(),
                name = def.name.as_str(),
                "error to declare the queue"
            );
            Err(AmqpError::DeclareQueueError(def.name.clone()))
        }
    }
}

/// Binds a queue to an exchange.
pub async fn bind_queue(channel: &Channel, binding: &QueueBinding<'_>) -> Result<(), AmqpError> {
    debug!(
        "binding queue: {} to the exchange: {} with the key: {}",
        binding.queue_name, binding.exchange_name, binding.routing_key
    );

    match channel
        .queue_bind(
            binding.queue_name,
            binding.exchange_name,
            binding.routing_key,
            QueueBindOptions { nowait: false },
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(error = err.to_string(), "error to bind queue to exchange");
            Err(AmqpError::BindingExchangeToQueueError(
                binding.exchange_name.to_owned(),
                binding.queue_name.to_owned(),
            ))
        }
        _ => Ok(()),
    }
}

/// Declares the Peril exchanges and the dead-letter queue behind `peril_dlx`.
///
/// The dead-letter queue itself carries no dead-letter argument, otherwise a
/// rejected dead letter would loop back into it.
pub async fn install(channel: &Channel) -> Result<(), AmqpError> {
    declare_exchanges(
        channel,
        &[
            ExchangeDefinition::new(EXCHANGE_PERIL_DIRECT).direct().durable(),
            ExchangeDefinition::new(EXCHANGE_PERIL_TOPIC).topic().durable(),
            ExchangeDefinition::new(EXCHANGE_PERIL_DLX).fanout().durable(),
        ],
    )
    .await?;

    debug!("creating dead letter queue: {}", DEAD_LETTER_QUEUE);
    if let Err(err) = channel
        .queue_declare(
            DEAD_LETTER_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
    {
        error!(error = err.to_string(), "failure to declare dead letter queue");
        return Err(AmqpError::DeclareQueueError(DEAD_LETTER_QUEUE.to_owned()));
    }

    bind_queue(
        channel,
        &QueueBinding::new(DEAD_LETTER_QUEUE)
            .exchange(EXCHANGE_PERIL_DLX)
            .routing_key(""),
    )
    .await
}
