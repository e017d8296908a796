// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Peril Game Logic
//!
//! The per-client state machine reacting to pause, move and war events, and
//! the handlers and client wiring that plug it into the broker.

pub mod client;
pub mod combat;
pub mod handlers;
pub mod logwriter;
pub mod spam;
pub mod state;
pub mod types;

use thiserror::Error;

/// Errors raised by local game commands and the log writer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GameError {
    #[error("the game is paused, you can not move units")]
    Paused,

    #[error("no units selected")]
    NoUnitsSelected,

    #[error("unit `{0}` does not exist")]
    UnknownUnit(u32),

    #[error("unknown location `{0}`")]
    UnknownLocation(String),

    #[error("unknown unit rank `{0}`")]
    UnknownRank(String),

    #[error("failure to write game log `{0}`")]
    LogWriteError(String),
}
