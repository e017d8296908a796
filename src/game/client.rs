// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Player Client Wiring
//!
//! Connects one player's [`GameState`] to the broker. A player consumes from
//! three queues:
//!
//! - `pause.{username}`: transient, bound to `peril_direct` with `pause`
//! - `army_moves.{username}`: transient, bound to `peril_topic` with `army_moves.*`
//! - `war`: durable and shared by every player, bound to `peril_topic` with `war.*`
//!
//! and publishes its own moves and junk game logs on the topic exchange.

use super::{
    handlers::{MoveHandler, PauseHandler, WarHandler},
    spam::malicious_logs,
    state::GameState,
    types::{ArmyMove, Location, PlayingState, RecognitionOfWar, UnitRank},
    GameError,
};
use crate::{
    codec::{BincodeCodec, JsonCodec},
    dispatcher::{subscribe, Subscription, SubscriptionDefinition},
    errors::AmqpError,
    publisher::{publish, Publisher},
    routing::{
        player_key, wildcard_key, ARMY_MOVES_PREFIX, EXCHANGE_PERIL_DIRECT, EXCHANGE_PERIL_TOPIC,
        GAME_LOG_SLUG, PAUSE_KEY, WAR_RECOGNITIONS_PREFIX,
    },
};
use lapin::Connection;
use std::sync::Arc;
use tracing::{debug, info};

/// Queue names and binding keys one player consumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientQueues {
    pause_queue: String,
    moves_queue: String,
    moves_key: String,
    wars_key: String,
    prefetch: u16,
}

impl ClientQueues {
    /// Derives the queue names of `username`.
    ///
    /// # Parameters
    /// * `username` - Player the per-player queues are named after
    /// * `prefetch` - Unacknowledged deliveries allowed per subscription
    pub fn new(username: &str, prefetch: u16) -> Self {
        ClientQueues {
            pause_queue: player_key(PAUSE_KEY, username),
            moves_queue: player_key(ARMY_MOVES_PREFIX, username),
            moves_key: wildcard_key(ARMY_MOVES_PREFIX),
            wars_key: wildcard_key(WAR_RECOGNITIONS_PREFIX),
            prefetch,
        }
    }

    /// Pause/resume broadcasts, only while this player is connected.
    pub fn pause(&self) -> SubscriptionDefinition<'_> {
        SubscriptionDefinition::new(EXCHANGE_PERIL_DIRECT, &self.pause_queue, PAUSE_KEY)
            .transient()
            .prefetch(self.prefetch)
    }

    /// Every player's moves, only while this player is connected.
    pub fn moves(&self) -> SubscriptionDefinition<'_> {
        SubscriptionDefinition::new(EXCHANGE_PERIL_TOPIC, &self.moves_queue, &self.moves_key)
            .transient()
            .prefetch(self.prefetch)
    }

    /// War recognitions, shared by all players so a recognition not meant for
    /// one player is requeued until an involved player picks it up.
    pub fn wars(&self) -> SubscriptionDefinition<'_> {
        SubscriptionDefinition::new(
            EXCHANGE_PERIL_TOPIC,
            WAR_RECOGNITIONS_PREFIX,
            &self.wars_key,
        )
        .durable()
        .prefetch(self.prefetch)
    }
}

/// Running delivery loops of one player.
pub struct ClientSubscriptions {
    pub pause: Subscription<PlayingState>,
    pub moves: Subscription<ArmyMove>,
    pub wars: Subscription<RecognitionOfWar>,
}

impl ClientSubscriptions {
    /// Waits for every delivery loop to end.
    pub async fn join(self) -> Result<(), AmqpError> {
        self.pause.join().await?;
        self.moves.join().await?;
        self.wars.join().await
    }
}

/// Subscribes the player's handlers to its three queues.
///
/// # Parameters
/// * `conn` - Connection each subscription opens its own channel on
/// * `state` - The player's game state, shared by all handlers
/// * `publisher` - Used by handlers for war recognitions and game logs
/// * `prefetch` - Unacknowledged deliveries allowed per subscription
///
/// # Returns
/// The running subscriptions, or the first topology error
pub async fn subscribe_client(
    conn: &Connection,
    state: Arc<GameState>,
    publisher: Arc<dyn Publisher>,
    prefetch: u16,
) -> Result<ClientSubscriptions, AmqpError> {
    let queues = ClientQueues::new(state.username(), prefetch);

    let pause = subscribe(
        conn,
        &queues.pause(),
        JsonCodec,
        PauseHandler::new(state.clone()),
    )
    .await?;
    let moves = subscribe(
        conn,
        &queues.moves(),
        JsonCodec,
        MoveHandler::new(state.clone(), publisher.clone()),
    )
    .await?;
    let wars = subscribe(
        conn,
        &queues.wars(),
        JsonCodec,
        WarHandler::new(state.clone(), publisher),
    )
    .await?;

    info!("{} subscribed to pause, move and war events", state.username());
    Ok(ClientSubscriptions { pause, moves, wars })
}

/// Publishes a move made with [`GameState::move_units`] on
/// `army_moves.{username}`.
pub async fn publish_move(publisher: &dyn Publisher, mv: &ArmyMove) -> Result<(), AmqpError> {
    let key = player_key(ARMY_MOVES_PREFIX, &mv.player.username);
    publish(publisher, EXCHANGE_PERIL_TOPIC, &key, mv, &JsonCodec).await?;
    debug!("published move of {} units to {}", mv.units.len(), mv.to_location);
    Ok(())
}

/// Publishes `n` junk game logs on `game_logs.{username}`.
///
/// Stops at the first failed publish.
pub async fn publish_spam(
    publisher: &dyn Publisher,
    username: &str,
    n: usize,
) -> Result<(), AmqpError> {
    let key = player_key(GAME_LOG_SLUG, username);
    for log in malicious_logs(username, n) {
        publish(publisher, EXCHANGE_PERIL_TOPIC, &key, &log, &BincodeCodec).await?;
    }
    info!("published {} spam logs", n);
    Ok(())
}

/// Parses a `location:rank` pair such as `europe:infantry`.
pub fn parse_spawn(value: &str) -> Result<(Location, UnitRank), GameError> {
    let (location, rank) = value
        .split_once(':')
        .ok_or_else(|| GameError::UnknownLocation(value.to_owned()))?;
    Ok((location.parse()?, rank.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{Codec, BINCODE_CONTENT_TYPE, JSON_CONTENT_TYPE},
        game::types::GameLog,
        publisher::MockPublisher,
        queue::QueueKind,
    };
    use std::sync::Mutex;

    #[test]
    fn test_pause_definition() {
        let queues = ClientQueues::new("washington", 10);
        let def = queues.pause();
        assert_eq!(def.exchange, "peril_direct");
        assert_eq!(def.queue_name, "pause.washington");
        assert_eq!(def.binding_key, "pause");
        assert_eq!(def.kind, QueueKind::Transient);
        assert_eq!(def.prefetch, 10);
    }

    #[test]
    fn test_moves_definition() {
        let queues = ClientQueues::new("washington", 10);
        let def = queues.moves();
        assert_eq!(def.exchange, "peril_topic");
        assert_eq!(def.queue_name, "army_moves.washington");
        assert_eq!(def.binding_key, "army_moves.*");
        assert_eq!(def.kind, QueueKind::Transient);
    }

    #[test]
    fn test_wars_definition_is_shared() {
        let washington = ClientQueues::new("washington", 1);
        let napoleon = ClientQueues::new("napoleon", 1);

        let def = washington.wars();
        assert_eq!(def.exchange, "peril_topic");
        assert_eq!(def.queue_name, "war");
        assert_eq!(def.binding_key, "war.*");
        assert_eq!(def.kind, QueueKind::Durable);
        assert_eq!(def.prefetch, 1);
        assert_eq!(def.queue_name, napoleon.wars().queue_name);
    }

    #[tokio::test]
    async fn test_publish_move_routes_by_mover() {
        let state = GameState::new("washington");
        let unit = state.spawn(Location::Europe, UnitRank::Cavalry);
        let mv = state.move_units(Location::Asia, &[unit.id]).unwrap();

        let published: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
        let sink = published.clone();
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_raw()
            .withf(|exchange, key, content_type, _| {
                exchange == "peril_topic"
                    && key == "army_moves.washington"
                    && content_type == JSON_CONTENT_TYPE
            })
            .times(1)
            .returning(move |_, _, _, payload| {
                sink.lock().unwrap().push(payload);
                Ok(())
            });

        publish_move(&publisher, &mv).await.unwrap();

        let decoded: ArmyMove = JsonCodec.decode(&published.lock().unwrap()[0]).unwrap();
        assert_eq!(decoded, mv);
    }

    #[tokio::test]
    async fn test_publish_spam_sends_binary_logs() {
        let published: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
        let sink = published.clone();
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_raw()
            .withf(|exchange, key, content_type, _| {
                exchange == "peril_topic"
                    && key == "game_logs.washington"
                    && content_type == BINCODE_CONTENT_TYPE
            })
            .times(3)
            .returning(move |_, _, _, payload| {
                sink.lock().unwrap().push(payload);
                Ok(())
            });

        publish_spam(&publisher, "washington", 3).await.unwrap();

        for payload in published.lock().unwrap().iter() {
            let log: GameLog = BincodeCodec.decode(payload).unwrap();
            assert_eq!(log.username, "washington");
        }
    }

    #[tokio::test]
    async fn test_publish_spam_stops_at_first_failure() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_raw()
            .times(1)
            .returning(|_, _, _, _| Err(AmqpError::PublishingError));

        let result = publish_spam(&publisher, "washington", 5).await;
        assert_eq!(result, Err(AmqpError::PublishingError));
    }

    #[test]
    fn test_parse_spawn() {
        assert_eq!(
            parse_spawn("europe:artillery").unwrap(),
            (Location::Europe, UnitRank::Artillery)
        );
        assert_eq!(
            parse_spawn("atlantis:infantry"),
            Err(GameError::UnknownLocation("atlantis".to_owned()))
        );
        assert_eq!(
            parse_spawn("asia:dragon"),
            Err(GameError::UnknownRank("dragon".to_owned()))
        );
        assert!(parse_spawn("asia").is_err());
    }
}
