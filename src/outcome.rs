// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Handler Outcomes
//!
//! Domain handlers answer every message with a [`HandlerOutcome`]. The
//! [`settle`] function is the only place that outcome is turned into broker
//! acknowledgment calls.

use crate::errors::AmqpError;
use async_trait::async_trait;
use lapin::{
    acker::Acker,
    options::{BasicAckOptions, BasicNackOptions},
};
use std::fmt;
use tracing::{debug, error, warn};

#[cfg(test)]
use mockall::automock;

/// Result of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerOutcome {
    /// Accepted, remove from the queue.
    Ack,
    /// Not processable right now, put it back for another attempt.
    NackRequeue,
    /// Never processable here, route it to the dead-letter exchange.
    NackDiscard,
}

impl fmt::Display for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutcome::Ack => write!(f, "ack"),
            HandlerOutcome::NackRequeue => write!(f, "nack-requeue"),
            HandlerOutcome::NackDiscard => write!(f, "nack-discard"),
        }
    }
}

/// Terminal acknowledgment primitives of a single delivery.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self) -> Result<(), AmqpError>;

    async fn nack(&self, requeue: bool) -> Result<(), AmqpError>;
}

#[async_trait]
impl Acknowledge for Acker {
    async fn ack(&self) -> Result<(), AmqpError> {
        Acker::ack(self, BasicAckOptions { multiple: false })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling ack msg");
                AmqpError::AckMessageError
            })
    }

    async fn nack(&self, requeue: bool) -> Result<(), AmqpError> {
        Acker::nack(
            self,
            BasicNackOptions {
                multiple: false,
                requeue,
            },
        )
        .await
        .map_err(|err| {
            error!(error = err.to_string(), requeue, "error whiling nack msg");
            AmqpError::NackMessageError
        })
    }
}

/// Issues exactly one acknowledgment call matching `outcome`.
///
/// # Parameters
/// * `acker` - Acknowledgment primitives of the delivery
/// * `outcome` - What the handler decided
///
/// # Returns
/// The broker error if the acknowledgment could not be sent
pub async fn settle<A>(acker: &A, outcome: HandlerOutcome) -> Result<(), AmqpError>
where
    A: Acknowledge + ?Sized,
{
    match outcome {
        HandlerOutcome::Ack => {
            debug!("message successfully processed");
            acker.ack().await
        }
        HandlerOutcome::NackRequeue => {
            warn!("message not processed, requeuing for later");
            acker.nack(true).await
        }
        HandlerOutcome::NackDiscard => {
            warn!("message rejected, sending to dead letter");
            acker.nack(false).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_ack_issues_single_ack() {
        let mut acker = MockAcknowledge::new();
        acker.expect_ack().times(1).returning(|| Ok(()));
        acker.expect_nack().times(0);

        settle(&acker, HandlerOutcome::Ack).await.unwrap();
    }

    #[tokio::test]
    async fn test_nack_requeue_requeues() {
        let mut acker = MockAcknowledge::new();
        acker.expect_ack().times(0);
        acker
            .expect_nack()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));

        settle(&acker, HandlerOutcome::NackRequeue).await.unwrap();
    }

    #[tokio::test]
    async fn test_nack_discard_does_not_requeue() {
        let mut acker = MockAcknowledge::new();
        acker.expect_ack().times(0);
        acker
            .expect_nack()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        settle(&acker, HandlerOutcome::NackDiscard).await.unwrap();
    }

    #[tokio::test]
    async fn test_broker_failure_is_reported() {
        let mut acker = MockAcknowledge::new();
        acker
            .expect_ack()
            .returning(|| Err(AmqpError::AckMessageError));

        assert_eq!(
            settle(&acker, HandlerOutcome::Ack).await,
            Err(AmqpError::AckMessageError)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(HandlerOutcome::Ack.to_string(), "ack");
        assert_eq!(HandlerOutcome::NackRequeue.to_string(), "nack-requeue");
        assert_eq!(HandlerOutcome::NackDiscard.to_string(), "nack-discard");
    }
}
