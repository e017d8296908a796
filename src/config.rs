// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Application Settings
//!
//! Settings are layered: built-in defaults, then an optional `config/default`
//! file, then `PERIL__SECTION__KEY` environment variables.

use crate::errors::AmqpError;
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::error;

/// Default number of unacknowledged deliveries a subscription may hold.
pub const DEFAULT_PREFETCH: u16 = 10;

/// Top-level configuration for a Peril process.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app: AppSettings,
    pub rabbitmq: RabbitMQSettings,
}

/// Process-level settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Name announced to the broker as the connection name.
    pub name: String,
    pub log_level: String,
    /// File the server appends aggregated game logs to.
    pub game_log_path: String,
}

/// Broker connection and flow-control settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RabbitMQSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub prefetch: u16,
}

impl RabbitMQSettings {
    /// Builds the `amqp://` URI for this broker.
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.user,
            self.password,
            self.host,
            self.port,
            self.vhost.trim_start_matches('/')
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "peril".to_owned(),
                log_level: "info".to_owned(),
                game_log_path: "game.log".to_owned(),
            },
            rabbitmq: RabbitMQSettings {
                host: "localhost".to_owned(),
                port: 5672,
                user: "guest".to_owned(),
                password: "guest".to_owned(),
                vhost: "/".to_owned(),
                prefetch: DEFAULT_PREFETCH,
            },
        }
    }
}

/// Loads the settings from `config/default` (if present) and the environment.
///
/// # Returns
/// The merged [`Settings`], or [`AmqpError::ConfigError`] when a source cannot
/// be read or a value has the wrong type
pub fn load_config() -> Result<Settings, AmqpError> {
    load_from(environment())
}

/// `PERIL__SECTION__KEY` variables, with numbers parsed from their text.
fn environment() -> Environment {
    Environment::with_prefix("PERIL")
        .separator("__")
        .try_parsing(true)
}

fn load_from(env: Environment) -> Result<Settings, AmqpError> {
    let default = Settings::default();

    let builder = Config::builder()
        .set_default("app.name", default.app.name)
        .and_then(|b| b.set_default("app.log_level", default.app.log_level))
        .and_then(|b| b.set_default("app.game_log_path", default.app.game_log_path))
        .and_then(|b| b.set_default("rabbitmq.host", default.rabbitmq.host))
        .and_then(|b| b.set_default("rabbitmq.port", default.rabbitmq.port as i64))
        .and_then(|b| b.set_default("rabbitmq.user", default.rabbitmq.user))
        .and_then(|b| b.set_default("rabbitmq.password", default.rabbitmq.password))
        .and_then(|b| b.set_default("rabbitmq.vhost", default.rabbitmq.vhost))
        .and_then(|b| b.set_default("rabbitmq.prefetch", default.rabbitmq.prefetch as i64))
        .map_err(|err| AmqpError::ConfigError(err.to_string()))?;

    builder
        .add_source(File::with_name("config/default").required(false))
        .add_source(env)
        .build()
        .and_then(|cfg| cfg.try_deserialize::<Settings>())
        .map_err(|err| {
            error!(error = err.to_string(), "failure to load settings");
            AmqpError::ConfigError(err.to_string())
        })
}
