// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use peril::{
    channel::{new_amqp_channel, new_amqp_connection},
    codec::BincodeCodec,
    config::load_config,
    dispatcher::{subscribe, SubscriptionDefinition},
    errors::AmqpError,
    game::{handlers::LogHandler, logwriter::GameLogWriter, types::GameLog},
    logging,
    routing::{wildcard_key, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG},
    topology,
};
use std::{process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match load_config() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.app.log_level);

    match run(settings).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = err.to_string(), "peril server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: peril::config::Settings) -> Result<(), AmqpError> {
    let conn = new_amqp_connection(&settings).await?;
    info!("connection established");

    let channel = new_amqp_channel(&conn).await?;
    topology::install(&channel).await?;

    let writer = Arc::new(GameLogWriter::new(&settings.app.game_log_path));
    let handler = LogHandler::new(writer.clone());
    let binding_key = wildcard_key(GAME_LOG_SLUG);
    let def = SubscriptionDefinition::new(EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG, &binding_key)
        .durable()
        .prefetch(settings.rabbitmq.prefetch);

    let logs = subscribe::<GameLog, _, _>(&conn, &def, BincodeCodec, handler).await?;
    info!(
        "aggregating game logs from queue {} into {}",
        logs.queue_name(),
        writer.path().display()
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = err.to_string(), "failure to listen for shutdown signal");
    }

    info!("shutting down");
    if let Err(err) = conn.close(200, "shutdown").await {
        error!(error = err.to_string(), "failure to close connection");
        return Err(AmqpError::ConnectionError);
    }

    match tokio::time::timeout(Duration::from_secs(5), logs.join()).await {
        Ok(result) => result,
        Err(_) => {
            error!("delivery loop did not stop after the connection closed");
            Err(AmqpError::InternalError)
        }
    }
}
