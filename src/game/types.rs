// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Wire types exchanged between Peril clients and the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use super::GameError;

/// Territories units can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Americas,
    Europe,
    Africa,
    Asia,
    Antarctica,
    Australia,
}

impl Location {
    pub const ALL: [Location; 6] = [
        Location::Americas,
        Location::Europe,
        Location::Africa,
        Location::Asia,
        Location::Antarctica,
        Location::Australia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Americas => "americas",
            Location::Europe => "europe",
            Location::Africa => "africa",
            Location::Asia => "asia",
            Location::Antarctica => "antarctica",
            Location::Australia => "australia",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::ALL
            .into_iter()
            .find(|loc| loc.as_str() == s)
            .ok_or_else(|| GameError::UnknownLocation(s.to_owned()))
    }
}

/// Unit types, in increasing order of strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRank {
    Infantry,
    Cavalry,
    Artillery,
}

impl UnitRank {
    pub const ALL: [UnitRank; 3] = [UnitRank::Infantry, UnitRank::Cavalry, UnitRank::Artillery];

    /// Combat strength of a single unit of this rank.
    pub fn power(&self) -> u32 {
        match self {
            UnitRank::Infantry => 1,
            UnitRank::Cavalry => 5,
            UnitRank::Artillery => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitRank::Infantry => "infantry",
            UnitRank::Cavalry => "cavalry",
            UnitRank::Artillery => "artillery",
        }
    }
}

impl fmt::Display for UnitRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitRank {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitRank::ALL
            .into_iter()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| GameError::UnknownRank(s.to_owned()))
    }
}

/// A single army unit. Ids are unique per owning player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub id: u32,
    pub rank: UnitRank,
    pub location: Location,
}

impl Unit {
    pub fn new(id: u32, rank: UnitRank, location: Location) -> Self {
        Unit { id, rank, location }
    }
}

/// A player and every unit it owns, keyed by unit id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub units: BTreeMap<u32, Unit>,
}

impl Player {
    pub fn new(username: &str) -> Self {
        Player {
            username: username.to_owned(),
            units: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Units currently stationed at `location`.
    pub fn units_in(&self, location: Location) -> Vec<Unit> {
        self.units
            .values()
            .filter(|unit| unit.location == location)
            .copied()
            .collect()
    }

    pub fn occupies(&self, location: Location) -> bool {
        self.units.values().any(|unit| unit.location == location)
    }

    /// Removes every unit stationed at `location` and returns them.
    pub(crate) fn remove_units_in(&mut self, location: Location) -> Vec<Unit> {
        let removed = self.units_in(location);
        self.units.retain(|_, unit| unit.location != location);
        removed
    }
}

/// Published on `army_moves.{username}` whenever a player relocates units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyMove {
    /// The mover after the move was applied.
    pub player: Player,
    pub units: Vec<Unit>,
    pub to_location: Location,
}

/// Published on `war.{username}` by the player who detected the conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOfWar {
    pub attacker: Player,
    pub defender: Player,
    /// Contested territory.
    pub location: Location,
}

/// Pause/resume broadcast sent by the server on the direct exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    pub is_paused: bool,
}

/// Immutable log record, published with the binary codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    pub current_time: DateTime<Utc>,
    pub username: String,
    pub message: String,
}

impl GameLog {
    pub fn new(username: &str, message: impl Into<String>) -> Self {
        GameLog {
            current_time: Utc::now(),
            username: username.to_owned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for GameLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.current_time.to_rfc3339(),
            self.username,
            self.message
        )
    }
}
