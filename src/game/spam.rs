// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Junk log traffic used to load-test the game log pipeline.

use super::types::GameLog;
use rand::seq::IndexedRandom;

const MALICIOUS_LOGS: &[&str] = &[
    "Never interrupt your enemy when he is making a mistake.",
    "The hardest thing of all for a soldier is to retreat.",
    "A soldier will fight long and hard for a bit of colored ribbon.",
    "It is well that war is so terrible, otherwise we should grow too fond of it.",
    "The art of war is simple enough. Find out where your enemy is. Get at him as soon as you can.",
    "All warfare is based on deception.",
];

/// A random taunt.
pub fn malicious_log() -> &'static str {
    MALICIOUS_LOGS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(MALICIOUS_LOGS[0])
}

/// `n` game logs attributed to `username`, each with a random taunt.
pub fn malicious_logs(username: &str, n: usize) -> Vec<GameLog> {
    (0..n)
        .map(|_| GameLog::new(username, malicious_log()))
        .collect()
}
