// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod otel;

pub mod channel;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod exchange;
pub mod game;
pub mod logging;
pub mod outcome;
pub mod publisher;
pub mod queue;
pub mod routing;
pub mod topology;
