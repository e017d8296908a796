// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Management for RabbitMQ
//!
//! Peril routes through three exchanges: a direct exchange for targeted
//! control messages, a topic exchange for pattern-routed game events and a
//! fanout exchange that collects dead-lettered messages.

use crate::errors::AmqpError;
use lapin::{options::ExchangeDeclareOptions, types::FieldTable, Channel};
use tracing::{debug, error};

/// Represents the types of exchanges Peril declares.
///
/// - Direct: exact routing-key match
/// - Fanout: every bound queue receives every message
/// - Topic: dot-separated keys matched against wildcard bindings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Definition of a RabbitMQ exchange with its configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition<'ex> {
    pub(crate) name: &'ex str,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
}

impl<'ex> ExchangeDefinition<'ex> {
    /// Creates a new, non-durable direct exchange definition.
    pub fn new(name: &'ex str) -> ExchangeDefinition<'ex> {
        ExchangeDefinition {
            name,
            kind: ExchangeKind::Direct,
            durable: false,
        }
    }

    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    pub fn fanout(self) -> Self {
        self.kind(ExchangeKind::Fanout)
    }

    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub(crate) fn options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: false,
            internal: false,
            nowait: false,
        }
    }
}

/// Declares every exchange in `defs` on `channel`, stopping at the first failure.
pub async fn declare_exchanges(
    channel: &Channel,
    defs: &[ExchangeDefinition<'_>],
) -> Result<(), AmqpError> {
    for exch in defs {
        debug!("creating exchange: {}", exch.name);

        if let Err(err) = channel
            .exchange_declare(
                exch.name,
                exch.kind.into(),
                exch.options(),
                FieldTable::default(),
            )
            .await
        {
            error!(
                error = err.to_string(),
                name = exch.name,
                "error to declare the exchange"
            );
            return Err(AmqpError::DeclareExchangeError(exch.name.to_owned()));
        }

        debug!("exchange: {} was created", exch.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let def = ExchangeDefinition::new("peril_direct");
        assert_eq!(def.kind, ExchangeKind::Direct);
        assert!(!def.durable);
    }

    #[test]
    fn test_builder_options() {
        let def = ExchangeDefinition::new("peril_topic").topic().durable();
        let opts = def.options();
        assert_eq!(def.kind, ExchangeKind::Topic);
        assert!(opts.durable);
        assert!(!opts.auto_delete);
        assert!(!opts.passive);
    }

    #[test]
    fn test_kind_conversion() {
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        ));
    }
}
