// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Battle resolution between two armies in one territory.

use super::types::Unit;

/// Which side of a war came out on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victor {
    Attacker,
    Defender,
    Draw,
}

/// Sum of the rank power of `units`.
pub fn power_level(units: &[Unit]) -> u32 {
    units.iter().map(|unit| unit.rank.power()).sum()
}

/// Resolves a battle between two unit compositions.
///
/// The stronger side wins; equal strength goes to the side with more units and
/// equal counts are a draw. The result only depends on the compositions.
///
/// # Parameters
/// * `attacker` - Attacking units in the contested territory
/// * `defender` - Defending units in the contested territory
pub fn resolve(attacker: &[Unit], defender: &[Unit]) -> Victor {
    let (att, def) = (power_level(attacker), power_level(defender));

    match att.cmp(&def).then(attacker.len().cmp(&defender.len())) {
        std::cmp::Ordering::Greater => Victor::Attacker,
        std::cmp::Ordering::Less => Victor::Defender,
        std::cmp::Ordering::Equal => Victor::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Location, UnitRank};

    fn army(ranks: &[UnitRank]) -> Vec<Unit> {
        ranks
            .iter()
            .enumerate()
            .map(|(i, rank)| Unit::new(i as u32 + 1, *rank, Location::Europe))
            .collect()
    }

    #[test]
    fn test_stronger_side_wins() {
        let artillery = army(&[UnitRank::Artillery]);
        let infantry = army(&[UnitRank::Infantry, UnitRank::Infantry]);

        assert_eq!(resolve(&artillery, &infantry), Victor::Attacker);
        assert_eq!(resolve(&infantry, &artillery), Victor::Defender);
    }

    #[test]
    fn test_equal_power_broken_by_count() {
        // 5 infantry and 1 cavalry are both worth 5.
        let infantry = army(&[UnitRank::Infantry; 5]);
        let cavalry = army(&[UnitRank::Cavalry]);

        assert_eq!(resolve(&infantry, &cavalry), Victor::Attacker);
        assert_eq!(resolve(&cavalry, &infantry), Victor::Defender);
    }

    #[test]
    fn test_identical_armies_draw() {
        let a = army(&[UnitRank::Cavalry, UnitRank::Infantry]);
        let b = army(&[UnitRank::Infantry, UnitRank::Cavalry]);
        assert_eq!(resolve(&a, &b), Victor::Draw);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = army(&[UnitRank::Cavalry, UnitRank::Artillery, UnitRank::Infantry]);
        let b = army(&[UnitRank::Artillery, UnitRank::Artillery]);
        let first = resolve(&a, &b);
        for _ in 0..100 {
            assert_eq!(resolve(&a, &b), first);
        }
    }
}
