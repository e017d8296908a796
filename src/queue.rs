// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Management for RabbitMQ
//!
//! Every queue Peril declares is dead-lettered: messages that are
//! negatively acknowledged without requeue are redirected to the dead-letter
//! exchange instead of being dropped by the broker.

use crate::routing::EXCHANGE_PERIL_DLX;
use lapin::{
    options::QueueDeclareOptions,
    types::{AMQPValue, FieldTable, LongString, ShortString},
};
use std::{collections::BTreeMap, fmt};

/// Constant for the header field used to specify a dead letter exchange
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";

/// Durability mode of a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Survives broker restarts and is shared by every consumer bound to it.
    #[default]
    Durable,
    /// Exclusive to the declaring connection and deleted once it goes away.
    Transient,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Durable => write!(f, "durable"),
            QueueKind::Transient => write!(f, "transient"),
        }
    }
}

/// Definition of a RabbitMQ queue with its configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) kind: QueueKind,
}

impl QueueDefinition {
    /// Creates a durable queue definition dead-lettered to `peril_dlx`.
    ///
    /// # Parameters
    /// * `name` - Queue name; an empty name lets the broker generate one
    ///
    /// # Returns
    /// A definition to refine with [`QueueDefinition::kind`]
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            kind: QueueKind::Durable,
        }
    }

    pub fn kind(mut self, kind: QueueKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn options(&self) -> QueueDeclareOptions {
        let transient = self.kind == QueueKind::Transient;
        QueueDeclareOptions {
            passive: false,
            durable: !transient,
            exclusive: transient,
            auto_delete: transient,
            nowait: false,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        let mut args = BTreeMap::new();

        args.insert(
            ShortString::from(AMQP_HEADERS_DEAD_LETTER_EXCHANGE),
            AMQPValue::LongString(LongString::from(EXCHANGE_PERIL_DLX)),
        );

        FieldTable::from(args)
    }
}

/// Configuration for binding a queue to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding<'qeb> {
    pub(crate) queue_name: &'qeb str,
    pub(crate) exchange_name: &'qeb str,
    pub(crate) routing_key: &'qeb str,
}

impl<'qeb> QueueBinding<'qeb> {
    /// Creates a binding for `queue` with an empty exchange and routing key.
    pub fn new(queue: &'qeb str) -> QueueBinding<'qeb> {
        QueueBinding {
            queue_name: queue,
            exchange_name: "",
            routing_key: "",
        }
    }

    pub fn exchange(mut self, exchange: &'qeb str) -> Self {
        self.exchange_name = exchange;
        self
    }

    /// Sets the binding key. Topic exchanges accept `*` and `#` wildcards.
    pub fn routing_key(mut self, key: &'qeb str) -> Self {
        self.routing_key = key;
        self
    }
}
