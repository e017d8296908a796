// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use clap::Parser;
use peril::{
    channel::{new_amqp_channel, new_amqp_connection},
    config::{load_config, Settings},
    errors::AmqpError,
    game::{
        client::{parse_spawn, publish_move, publish_spam, subscribe_client},
        state::GameState,
        types::{Location, UnitRank},
    },
    logging,
    publisher::AmqpPublisher,
};
use std::{process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "peril-client")]
#[command(about = "Peril player client")]
struct Args {
    #[arg(short, long, help = "Name of the player to join as")]
    username: String,

    #[arg(
        long,
        value_parser = parse_spawn,
        help = "Unit to spawn on join as location:rank (e.g., europe:infantry), repeatable"
    )]
    spawn: Vec<(Location, UnitRank)>,

    #[arg(long, help = "Move every spawned unit to this location after joining")]
    move_to: Option<Location>,

    #[arg(long, default_value_t = 0, help = "Number of junk game logs to publish")]
    spam: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_config() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.app.log_level);

    match run(settings, args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = err.to_string(), "peril client stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings, args: Args) -> Result<(), AmqpError> {
    let conn = new_amqp_connection(&settings).await?;
    let publisher = AmqpPublisher::new(new_amqp_channel(&conn).await?);
    let state = Arc::new(GameState::new(&args.username));

    let subscriptions = subscribe_client(
        &conn,
        state.clone(),
        publisher.clone(),
        settings.rabbitmq.prefetch,
    )
    .await?;
    info!("{} joined the game", args.username);

    let ids: Vec<u32> = args
        .spawn
        .iter()
        .map(|(location, rank)| state.spawn(*location, *rank).id)
        .collect();

    if let Some(to) = args.move_to {
        match state.move_units(to, &ids) {
            Ok(mv) => publish_move(publisher.as_ref(), &mv).await?,
            Err(err) => error!(error = err.to_string(), "failure to move units"),
        }
    }

    if args.spam > 0 {
        publish_spam(publisher.as_ref(), &args.username, args.spam).await?;
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = err.to_string(), "failure to listen for shutdown signal");
    }

    info!("{} leaving the game", args.username);
    if let Err(err) = conn.close(200, "shutdown").await {
        error!(error = err.to_string(), "failure to close connection");
        return Err(AmqpError::ConnectionError);
    }

    match tokio::time::timeout(Duration::from_secs(5), subscriptions.join()).await {
        Ok(result) => result,
        Err(_) => {
            error!("delivery loops did not stop after the connection closed");
            Err(AmqpError::InternalError)
        }
    }
}
