// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Game Event Handlers
//!
//! Adapters between the dispatcher and the game state machine. Each handler
//! maps a domain result to a [`HandlerOutcome`] and publishes the follow-up
//! events the result calls for. When a follow-up publish fails the triggering
//! delivery is requeued so the whole unit of work is attempted again; any state
//! change that cannot be repeated is rolled back first.

use super::{
    logwriter::GameLogWriter,
    state::{GameState, MoveOutcome, WarOutcome},
    types::{ArmyMove, GameLog, PlayingState, RecognitionOfWar},
};
use crate::{
    codec::{BincodeCodec, JsonCodec},
    dispatcher::Handler,
    outcome::HandlerOutcome,
    publisher::{publish, Publisher},
    routing::{player_key, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG, WAR_RECOGNITIONS_PREFIX},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Applies pause/resume broadcasts. Always acknowledged.
pub struct PauseHandler {
    state: Arc<GameState>,
}

impl PauseHandler {
    pub fn new(state: Arc<GameState>) -> Self {
        PauseHandler { state }
    }
}

#[async_trait]
impl Handler<PlayingState> for PauseHandler {
    async fn handle(&self, msg: PlayingState) -> HandlerOutcome {
        self.state.handle_pause(msg);
        HandlerOutcome::Ack
    }
}

/// Reacts to other players' moves, declaring war when they enter our territory.
pub struct MoveHandler {
    state: Arc<GameState>,
    publisher: Arc<dyn Publisher>,
}

impl MoveHandler {
    pub fn new(state: Arc<GameState>, publisher: Arc<dyn Publisher>) -> Self {
        MoveHandler { state, publisher }
    }
}

#[async_trait]
impl Handler<ArmyMove> for MoveHandler {
    async fn handle(&self, msg: ArmyMove) -> HandlerOutcome {
        match self.state.handle_move(&msg) {
            MoveOutcome::Safe => HandlerOutcome::Ack,
            MoveOutcome::MakeWar(recognition) => {
                let key = player_key(WAR_RECOGNITIONS_PREFIX, self.state.username());
                match publish(
                    self.publisher.as_ref(),
                    EXCHANGE_PERIL_TOPIC,
                    &key,
                    &recognition,
                    &JsonCodec,
                )
                .await
                {
                    Ok(_) => HandlerOutcome::Ack,
                    Err(err) => {
                        error!(error = err.to_string(), "failure to publish war recognition");
                        HandlerOutcome::NackRequeue
                    }
                }
            }
            MoveOutcome::Invalid => {
                warn!(
                    player = msg.player.username.as_str(),
                    "discarding invalid move"
                );
                HandlerOutcome::NackDiscard
            }
        }
    }
}

/// Resolves wars involving this player and publishes the result to the game log.
///
/// The war and its log entry succeed or fail together: when the log cannot be
/// published the casualties are restored and the recognition requeued.
pub struct WarHandler {
    state: Arc<GameState>,
    publisher: Arc<dyn Publisher>,
}

impl WarHandler {
    pub fn new(state: Arc<GameState>, publisher: Arc<dyn Publisher>) -> Self {
        WarHandler { state, publisher }
    }
}

#[async_trait]
impl Handler<RecognitionOfWar> for WarHandler {
    async fn handle(&self, msg: RecognitionOfWar) -> HandlerOutcome {
        let report = self.state.handle_war(&msg);

        let ack_nack = match report.outcome {
            WarOutcome::NotInvolved => return HandlerOutcome::NackRequeue,
            WarOutcome::NoUnits => return HandlerOutcome::NackDiscard,
            WarOutcome::YouWon | WarOutcome::OpponentWon | WarOutcome::Draw => {
                HandlerOutcome::Ack
            }
        };

        let Some(message) = report.log_message() else {
            return ack_nack;
        };

        debug!(
            outcome = ?report.outcome,
            casualties = report.casualties().len(),
            "war resolved"
        );
        let attacker = msg.attacker.username.as_str();
        let log = GameLog::new(attacker, message);
        let key = player_key(GAME_LOG_SLUG, attacker);

        match publish(
            self.publisher.as_ref(),
            EXCHANGE_PERIL_TOPIC,
            &key,
            &log,
            &BincodeCodec,
        )
        .await
        {
            Ok(_) => ack_nack,
            Err(err) => {
                error!(error = err.to_string(), "failure to publish game log");
                self.state.undo_war(&report);
                HandlerOutcome::NackRequeue
            }
        }
    }
}

/// Server-side aggregation of game logs into the log file.
pub struct LogHandler {
    writer: Arc<GameLogWriter>,
}

impl LogHandler {
    pub fn new(writer: Arc<GameLogWriter>) -> Self {
        LogHandler { writer }
    }
}

#[async_trait]
impl Handler<GameLog> for LogHandler {
    async fn handle(&self, msg: GameLog) -> HandlerOutcome {
        match self.writer.write(&msg).await {
            Ok(_) => HandlerOutcome::Ack,
            Err(err) => {
                error!(error = err.to_string(), "log handler error");
                HandlerOutcome::NackRequeue
            }
        }
    }
}
