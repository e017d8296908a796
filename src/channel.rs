// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection and Channel Management
//!
//! A process owns exactly one [`Connection`]; every publisher and subscription
//! derives its own [`Channel`] from it so flow-control settings and channel
//! failures stay isolated.

use crate::{config::Settings, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Connects to RabbitMQ using the broker settings.
///
/// The connection is named after `cfg.app.name` so it can be told apart in the
/// management UI.
///
/// # Parameters
/// * `cfg` - Settings holding the broker address and credentials
///
/// # Returns
/// A shared connection, or [`AmqpError::ConnectionError`]
pub async fn new_amqp_connection(cfg: &Settings) -> Result<Arc<Connection>, AmqpError> {
    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app.name.clone()));

    match Connection::connect(&cfg.rabbitmq.uri(), options).await {
        Ok(conn) => {
            debug!("amqp connected");
            Ok(Arc::new(conn))
        }
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError)
        }
    }
}

/// Opens a new channel on an existing connection.
pub async fn new_amqp_channel(conn: &Connection) -> Result<Arc<Channel>, AmqpError> {
    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok(Arc::new(c))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError)
        }
    }
}
