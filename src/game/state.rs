// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Per-Client Game State
//!
//! [`GameState`] is shared by the local control loop and every delivery loop
//! of the client. All reads and writes happen under one mutex so a unit can
//! never be moved or destroyed by two handlers at once. The lock is never held
//! across an await point.
//!
//! A war is applied to the snapshot as soon as it is resolved. If the game log
//! announcing it cannot be published, [`GameState::undo_war`] restores the
//! casualties so the redelivered recognition resolves the same war again.

use super::{
    combat::{resolve, Victor},
    types::{ArmyMove, Location, Player, PlayingState, RecognitionOfWar, Unit, UnitRank},
    GameError,
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

/// How a received move relates to this player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing of ours is in the way.
    Safe,
    /// The mover entered a territory we hold; the recognition must be published.
    MakeWar(RecognitionOfWar),
    /// The move references units its player does not own.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarOutcome {
    NotInvolved,
    NoUnits,
    YouWon,
    OpponentWon,
    Draw,
}

/// Result of a war resolution as seen by this player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarReport {
    pub outcome: WarOutcome,
    /// Winner's name, or the attacker's on a draw.
    pub winner: String,
    /// Loser's name, or the defender's on a draw.
    pub loser: String,
    opponent: String,
    /// Our units removed by the war.
    casualties: Vec<Unit>,
    /// Units removed from our record of the opponent.
    opponent_casualties: Vec<Unit>,
}

impl WarReport {
    fn unresolved(outcome: WarOutcome) -> Self {
        WarReport {
            outcome,
            winner: String::new(),
            loser: String::new(),
            opponent: String::new(),
            casualties: vec![],
            opponent_casualties: vec![],
        }
    }

    /// Our units destroyed in this war.
    pub fn casualties(&self) -> &[Unit] {
        &self.casualties
    }

    /// Log line for a resolved war, `None` when no battle took place.
    pub fn log_message(&self) -> Option<String> {
        match self.outcome {
            WarOutcome::YouWon | WarOutcome::OpponentWon => {
                Some(format!("{} won a war against {}", self.winner, self.loser))
            }
            WarOutcome::Draw => Some(format!(
                "A war between {} and {} resulted in a draw",
                self.winner, self.loser
            )),
            WarOutcome::NotInvolved | WarOutcome::NoUnits => None,
        }
    }
}

struct Snapshot {
    player: Player,
    paused: bool,
    next_unit_id: u32,
    /// Last known armies of other players, learned from their moves and wars.
    opponents: BTreeMap<String, Player>,
}

/// Lock-protected view of one player's game.
pub struct GameState {
    username: String,
    inner: Mutex<Snapshot>,
}

impl GameState {
    /// Creates an empty, unpaused game for `username`.
    pub fn new(username: &str) -> Self {
        GameState {
            username: username.to_owned(),
            inner: Mutex::new(Snapshot {
                player: Player::new(username),
                paused: false,
                next_unit_id: 1,
                opponents: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Copy of this player's current armies.
    pub fn player(&self) -> Player {
        self.lock().player.clone()
    }

    /// Last known armies of another player.
    pub fn known_player(&self, username: &str) -> Option<Player> {
        self.lock().opponents.get(username).cloned()
    }

    /// Creates a new unit owned by this player.
    pub fn spawn(&self, location: Location, rank: UnitRank) -> Unit {
        let mut snap = self.lock();
        let unit = Unit::new(snap.next_unit_id, rank, location);
        snap.next_unit_id += 1;
        snap.player.insert(unit);
        debug!("spawned {} unit {} in {}", rank, unit.id, location);
        unit
    }

    /// Relocates owned units and returns the move to publish.
    ///
    /// # Parameters
    /// * `to` - Destination territory
    /// * `unit_ids` - Ids of the units to move; all of them must be owned
    ///
    /// # Returns
    /// The [`ArmyMove`] to publish on `army_moves.{username}`, or the
    /// [`GameError`] explaining why nothing was moved
    pub fn move_units(&self, to: Location, unit_ids: &[u32]) -> Result<ArmyMove, GameError> {
        let mut snap = self.lock();
        if snap.paused {
            return Err(GameError::Paused);
        }
        if unit_ids.is_empty() {
            return Err(GameError::NoUnitsSelected);
        }
        if let Some(id) = unit_ids
            .iter()
            .find(|id| !snap.player.units.contains_key(*id))
        {
            return Err(GameError::UnknownUnit(*id));
        }

        let mut units = Vec::with_capacity(unit_ids.len());
        for id in unit_ids {
            if let Some(unit) = snap.player.units.get_mut(id) {
                unit.location = to;
                units.push(*unit);
            }
        }

        Ok(ArmyMove {
            player: snap.player.clone(),
            units,
            to_location: to,
        })
    }

    /// Applies a pause/resume broadcast.
    pub fn handle_pause(&self, ps: PlayingState) {
        let mut snap = self.lock();
        snap.paused = ps.is_paused;
        info!(paused = ps.is_paused, "game state changed");
    }

    /// Reacts to a move broadcast by any player, ourselves included.
    ///
    /// Our own moves are applied to the snapshot. Other players' moves update
    /// what we know of their armies.
    ///
    /// # Parameters
    /// * `mv` - The received move
    ///
    /// # Returns
    /// * [`MoveOutcome::MakeWar`] when another player entered a territory we hold
    /// * [`MoveOutcome::Invalid`] when the move references units its player does
    ///   not own at the destination
    /// * [`MoveOutcome::Safe`] otherwise
    pub fn handle_move(&self, mv: &ArmyMove) -> MoveOutcome {
        if mv.units.is_empty() {
            return MoveOutcome::Invalid;
        }

        let well_formed = mv.units.iter().all(|unit| {
            unit.location == mv.to_location
                && mv
                    .player
                    .units
                    .get(&unit.id)
                    .is_some_and(|owned| owned.location == mv.to_location)
        });
        if !well_formed {
            return MoveOutcome::Invalid;
        }

        let mut snap = self.lock();

        if mv.player.username == self.username {
            // Our own move coming back through the broadcast.
            if mv
                .units
                .iter()
                .any(|unit| !snap.player.units.contains_key(&unit.id))
            {
                return MoveOutcome::Invalid;
            }
            for unit in &mv.units {
                if let Some(owned) = snap.player.units.get_mut(&unit.id) {
                    owned.location = mv.to_location;
                }
            }
            return MoveOutcome::Safe;
        }

        snap.opponents
            .insert(mv.player.username.clone(), mv.player.clone());

        if snap.player.occupies(mv.to_location) {
            info!(
                "{} moved into {} where we have units, declaring war",
                mv.player.username, mv.to_location
            );
            return MoveOutcome::MakeWar(RecognitionOfWar {
                attacker: mv.player.clone(),
                defender: snap.player.clone(),
                location: mv.to_location,
            });
        }

        debug!("safe from {}'s units", mv.player.username);
        MoveOutcome::Safe
    }

    /// Resolves a war this player takes part in and removes the losers' units
    /// from the contested territory.
    ///
    /// Our side fights with the units we currently hold there; the opponent
    /// fights with the army carried in the recognition.
    ///
    /// # Parameters
    /// * `rw` - The recognition, naming attacker, defender and territory
    ///
    /// # Returns
    /// A [`WarReport`] whose outcome is `NotInvolved` when we are neither side,
    /// `NoUnits` when a side has nothing in the territory, and the battle result
    /// otherwise
    pub fn handle_war(&self, rw: &RecognitionOfWar) -> WarReport {
        let attacker_is_me = rw.attacker.username == self.username;
        let defender_is_me = rw.defender.username == self.username;

        if !attacker_is_me && !defender_is_me {
            return WarReport::unresolved(WarOutcome::NotInvolved);
        }
        if attacker_is_me && defender_is_me {
            return WarReport::unresolved(WarOutcome::NoUnits);
        }

        let opponent = if attacker_is_me {
            &rw.defender
        } else {
            &rw.attacker
        };

        let mut snap = self.lock();
        let mine = snap.player.units_in(rw.location);
        let theirs = opponent.units_in(rw.location);
        if mine.is_empty() || theirs.is_empty() {
            return WarReport::unresolved(WarOutcome::NoUnits);
        }

        let victor = if attacker_is_me {
            resolve(&mine, &theirs)
        } else {
            resolve(&theirs, &mine)
        };

        let attacker = rw.attacker.username.clone();
        let defender = rw.defender.username.clone();
        let (i_lost, they_lost) = match victor {
            Victor::Draw => (true, true),
            Victor::Attacker => (!attacker_is_me, attacker_is_me),
            Victor::Defender => (attacker_is_me, !attacker_is_me),
        };

        let casualties = if i_lost {
            snap.player.remove_units_in(rw.location)
        } else {
            vec![]
        };
        let known = snap
            .opponents
            .entry(opponent.username.clone())
            .or_insert_with(|| opponent.clone());
        let opponent_casualties = if they_lost {
            known.remove_units_in(rw.location)
        } else {
            vec![]
        };

        let (outcome, winner, loser) = match victor {
            Victor::Draw => (WarOutcome::Draw, attacker, defender),
            Victor::Attacker if attacker_is_me => (WarOutcome::YouWon, attacker, defender),
            Victor::Attacker => (WarOutcome::OpponentWon, attacker, defender),
            Victor::Defender if defender_is_me => (WarOutcome::YouWon, defender, attacker),
            Victor::Defender => (WarOutcome::OpponentWon, defender, attacker),
        };

        info!(?outcome, "war in {} resolved", rw.location);
        WarReport {
            outcome,
            winner,
            loser,
            opponent: opponent.username.clone(),
            casualties,
            opponent_casualties,
        }
    }

    /// Restores the units a war removed, so the same recognition can be
    /// resolved again after a failed follow-up publish.
    ///
    /// Unit ids are never reused, so restored units cannot collide with units
    /// spawned since. Opponent units that were replaced by a newer move are
    /// left as they are.
    ///
    /// # Parameters
    /// * `report` - Report returned by [`GameState::handle_war`]
    pub fn undo_war(&self, report: &WarReport) {
        if report.casualties.is_empty() && report.opponent_casualties.is_empty() {
            return;
        }

        let mut snap = self.lock();
        for unit in &report.casualties {
            snap.player.insert(*unit);
        }
        if let Some(known) = snap.opponents.get_mut(&report.opponent) {
            for unit in &report.opponent_casualties {
                known.units.entry(unit.id).or_insert(*unit);
            }
        }

        info!(
            restored = report.casualties.len(),
            "war against {} rolled back", report.opponent
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opponent(name: &str, units: &[(u32, UnitRank, Location)]) -> Player {
        let mut player = Player::new(name);
        for (id, rank, location) in units {
            player.insert(Unit::new(*id, *rank, *location));
        }
        player
    }

    fn move_of(player: &Player, ids: &[u32], to: Location) -> ArmyMove {
        ArmyMove {
            player: player.clone(),
            units: ids.iter().map(|id| player.units[id]).collect(),
            to_location: to,
        }
    }

    #[test]
    fn test_spawn_assigns_increasing_ids() {
        let state = GameState::new("washington");
        let a = state.spawn(Location::Europe, UnitRank::Infantry);
        let b = state.spawn(Location::Asia, UnitRank::Cavalry);
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(state.player().units.len(), 2);
    }

    #[test]
    fn test_move_units_relocates() {
        let state = GameState::new("washington");
        let unit = state.spawn(Location::Europe, UnitRank::Infantry);

        let mv = state.move_units(Location::Africa, &[unit.id]).unwrap();
        assert_eq!(mv.to_location, Location::Africa);
        assert_eq!(mv.units[0].location, Location::Africa);
        assert_eq!(state.player().units[&unit.id].location, Location::Africa);
    }

    #[test]
    fn test_move_units_rejections() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);

        assert_eq!(
            state.move_units(Location::Asia, &[]),
            Err(GameError::NoUnitsSelected)
        );
        assert_eq!(
            state.move_units(Location::Asia, &[42]),
            Err(GameError::UnknownUnit(42))
        );

        state.handle_pause(PlayingState { is_paused: true });
        assert_eq!(state.move_units(Location::Asia, &[1]), Err(GameError::Paused));
        assert_eq!(state.player().units[&1].location, Location::Europe);
    }

    #[test]
    fn test_pause_and_resume() {
        let state = GameState::new("washington");
        state.handle_pause(PlayingState { is_paused: true });
        assert!(state.is_paused());
        state.handle_pause(PlayingState { is_paused: false });
        assert!(!state.is_paused());
    }

    #[test]
    fn test_move_onto_unowned_territory_is_safe() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        let napoleon = opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Asia)]);

        let outcome = state.handle_move(&move_of(&napoleon, &[1], Location::Asia));
        assert_eq!(outcome, MoveOutcome::Safe);

        let known = state.known_player("napoleon").unwrap();
        assert!(known.occupies(Location::Asia));
    }

    #[test]
    fn test_own_move_is_safe_and_applied() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        let mut me = state.player();
        me.units.get_mut(&1).unwrap().location = Location::Africa;

        let outcome = state.handle_move(&move_of(&me, &[1], Location::Africa));
        assert_eq!(outcome, MoveOutcome::Safe);
        assert_eq!(state.player().units[&1].location, Location::Africa);
    }

    #[test]
    fn test_move_onto_occupied_territory_makes_war() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        let napoleon = opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]);

        match state.handle_move(&move_of(&napoleon, &[1], Location::Europe)) {
            MoveOutcome::MakeWar(rw) => {
                assert_eq!(rw.attacker.username, "napoleon");
                assert_eq!(rw.defender.username, "washington");
                assert_eq!(rw.location, Location::Europe);
            }
            other => panic!("expected war, got {other:?}"),
        }
    }

    #[test]
    fn test_move_with_unknown_units_is_invalid() {
        let state = GameState::new("washington");
        let napoleon = opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]);

        let mut mv = move_of(&napoleon, &[1], Location::Europe);
        mv.units.push(Unit::new(9, UnitRank::Artillery, Location::Europe));
        assert_eq!(state.handle_move(&mv), MoveOutcome::Invalid);

        let empty = ArmyMove {
            player: napoleon,
            units: vec![],
            to_location: Location::Europe,
        };
        assert_eq!(state.handle_move(&empty), MoveOutcome::Invalid);
    }

    #[test]
    fn test_own_move_with_unknown_units_is_invalid() {
        let state = GameState::new("washington");
        let me = opponent("washington", &[(5, UnitRank::Cavalry, Location::Europe)]);
        assert_eq!(
            state.handle_move(&move_of(&me, &[5], Location::Europe)),
            MoveOutcome::Invalid
        );
    }

    fn war(attacker: Player, defender: Player, location: Location) -> RecognitionOfWar {
        RecognitionOfWar {
            attacker,
            defender,
            location,
        }
    }

    #[test]
    fn test_war_not_involving_us() {
        let state = GameState::new("washington");
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            opponent("caesar", &[(1, UnitRank::Infantry, Location::Europe)]),
            Location::Europe,
        );
        assert_eq!(state.handle_war(&rw).outcome, WarOutcome::NotInvolved);
        assert_eq!(state.handle_war(&rw).log_message(), None);
    }

    #[test]
    fn test_war_without_defending_units() {
        let state = GameState::new("washington");
        state.spawn(Location::Asia, UnitRank::Artillery);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            state.player(),
            Location::Europe,
        );
        assert_eq!(state.handle_war(&rw).outcome, WarOutcome::NoUnits);
        assert_eq!(state.player().units.len(), 1);
    }

    #[test]
    fn test_defender_wins() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Artillery);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::YouWon);
        assert_eq!(
            report.log_message().unwrap(),
            "washington won a war against napoleon"
        );
        assert_eq!(state.player().units.len(), 1);
        assert!(!state
            .known_player("napoleon")
            .unwrap()
            .occupies(Location::Europe));
    }

    #[test]
    fn test_defender_loses_units() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        state.spawn(Location::Asia, UnitRank::Infantry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Artillery, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::OpponentWon);
        assert_eq!(
            report.log_message().unwrap(),
            "napoleon won a war against washington"
        );
        let me = state.player();
        assert!(!me.occupies(Location::Europe));
        assert!(me.occupies(Location::Asia));
    }

    #[test]
    fn test_attacker_side_resolution() {
        let state = GameState::new("napoleon");
        state.spawn(Location::Europe, UnitRank::Artillery);
        let rw = war(
            state.player(),
            opponent("washington", &[(1, UnitRank::Infantry, Location::Europe)]),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::YouWon);
        assert_eq!(report.winner, "napoleon");
        assert_eq!(report.loser, "washington");
    }

    #[test]
    fn test_draw_removes_both_sides() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Cavalry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::Draw);
        assert_eq!(
            report.log_message().unwrap(),
            "A war between napoleon and washington resulted in a draw"
        );
        assert!(state.player().units.is_empty());
        assert!(state.known_player("napoleon").unwrap().units.is_empty());
    }

    #[test]
    fn test_recognition_of_already_resolved_war_has_no_units() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Artillery, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        assert_eq!(state.handle_war(&rw).outcome, WarOutcome::OpponentWon);
        assert_eq!(state.handle_war(&rw).outcome, WarOutcome::NoUnits);
    }

    #[test]
    fn test_undo_war_allows_resolving_again() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Infantry);
        state.spawn(Location::Asia, UnitRank::Cavalry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Artillery, Location::Europe)]),
            state.player(),
            Location::Europe,
        );
        let before = state.player();

        let first = state.handle_war(&rw);
        assert_eq!(first.outcome, WarOutcome::OpponentWon);
        assert_eq!(first.casualties().len(), 1);

        state.undo_war(&first);
        assert_eq!(state.player(), before);

        let second = state.handle_war(&rw);
        assert_eq!(second, first);
        assert!(!state.player().occupies(Location::Europe));
    }

    #[test]
    fn test_undo_draw_restores_both_sides() {
        let state = GameState::new("washington");
        state.spawn(Location::Europe, UnitRank::Cavalry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::Draw);
        state.undo_war(&report);

        assert!(state.player().occupies(Location::Europe));
        assert!(state
            .known_player("napoleon")
            .unwrap()
            .occupies(Location::Europe));
        assert_eq!(state.handle_war(&rw).outcome, WarOutcome::Draw);
    }

    #[test]
    fn test_undo_of_unresolved_war_changes_nothing() {
        let state = GameState::new("washington");
        state.spawn(Location::Asia, UnitRank::Infantry);
        let rw = war(
            opponent("napoleon", &[(1, UnitRank::Cavalry, Location::Europe)]),
            state.player(),
            Location::Europe,
        );

        let report = state.handle_war(&rw);
        assert_eq!(report.outcome, WarOutcome::NoUnits);
        state.undo_war(&report);
        assert_eq!(state.player().units.len(), 1);
        assert!(state.known_player("napoleon").is_none());
    }
}
