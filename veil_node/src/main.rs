//! Runs one veil overlay participant: the node registry, an onion relay or
//! a user, selected by `--role`.

#[macro_use]
extern crate log;

mod client;
mod models;
mod node_config;
mod registry_api;
mod relay_api;
mod user_api;

use anyhow::Error;
use tokio::runtime;

use crate::node_config::{cli_parse, NodeConfig, Role};

async fn run(config: NodeConfig) -> Result<(), Error> {
    match config.role {
        Role::Registry => registry_api::run(config).await,
        Role::Relay => relay_api::run(config).await,
        Role::User => user_api::run(config).await,
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let config = cli_parse();
    info!("Starting {:?} node", config.role);

    let runtime = runtime::Runtime::new()?;
    runtime.block_on(run(config))
}
