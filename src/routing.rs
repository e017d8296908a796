// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Exchange names and routing key conventions.
//!
//! Per-player keys are `{category}.{username}`; broadcast consumers bind with
//! `{category}.*`.

pub const EXCHANGE_PERIL_DIRECT: &str = "peril_direct";
pub const EXCHANGE_PERIL_TOPIC: &str = "peril_topic";
pub const EXCHANGE_PERIL_DLX: &str = "peril_dlx";

/// Durable queue collecting every dead-lettered message.
pub const DEAD_LETTER_QUEUE: &str = "peril_dlq";

pub const PAUSE_KEY: &str = "pause";
pub const ARMY_MOVES_PREFIX: &str = "army_moves";
pub const WAR_RECOGNITIONS_PREFIX: &str = "war";
pub const GAME_LOG_SLUG: &str = "game_logs";

/// `{category}.{username}`
pub fn player_key(category: &str, username: &str) -> String {
    format!("{category}.{username}")
}

/// `{category}.*`, matching every player's key on a topic exchange.
pub fn wildcard_key(category: &str) -> String {
    format!("{category}.*")
}
