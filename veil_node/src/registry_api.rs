//! The node registry process: directory writes and reads over HTTP.

use anyhow::{Context, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;

use veil_core::directory::{Registry, RelayDescriptor};
use veil_crypto::{decode_text, encode_text, PublicKey, KEY_SIZE};
use veil_packet::{NodeId, NODE_ID_MAX};

use crate::models::*;
use crate::node_config::NodeConfig;

/// Run the registry service until the process is stopped.
pub async fn run(config: NodeConfig) -> Result<(), Error> {
    let port = config.bind_port().context("registry port out of range")?;
    let addr = format!("{}:{}", config.addressing.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind registry to {}", addr))?;
    info!("Registry is listening on {}", addr);
    axum::serve(listener, router(Registry::new())).await?;
    Ok(())
}

/// Build the registry's route table.
pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/registerNode", post(register_node))
        .route("/getNodeRegistry", get(get_node_registry))
        .with_state(registry)
}

async fn status() -> &'static str {
    "live"
}

async fn register_node(
    State(registry): State<Registry>,
    Json(body): Json<RegisterNodeBody>,
) -> Result<Json<SuccessBody>, (StatusCode, Json<ErrorBody>)> {
    if body.node_id > NODE_ID_MAX {
        return Err(bad_request(format!("Node id must not exceed {}", NODE_ID_MAX)));
    }
    let key = decode_text(&body.public_key)
        .map_err(|e| bad_request(format!("Invalid public key encoding: {}", e)))?;
    let key: [u8; KEY_SIZE] = key.try_into()
        .map_err(|_| bad_request(format!("Public key must be {} bytes", KEY_SIZE)))?;

    registry.register(RelayDescriptor {
        id: NodeId(body.node_id),
        public_key: PublicKey::from(key),
    }).map_err(|e| bad_request(e.to_string()))?;

    info!("Registered node {}", body.node_id);
    Ok(Json(SuccessBody { success: true }))
}

async fn get_node_registry(State(registry): State<Registry>) -> Json<NodeRegistryBody> {
    let nodes = registry.nodes().iter()
        .map(|node| NodeEntry {
            node_id: node.id.0,
            public_key: encode_text(node.public_key.as_bytes()),
        })
        .collect();
    Json(NodeRegistryBody { nodes })
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error }))
}
