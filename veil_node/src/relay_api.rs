//! The relay process: keypair generation, startup registration and the
//! unwrap-and-forward HTTP surface.

use std::sync::Arc;

use anyhow::{bail, Context, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use rand::thread_rng;
use reqwest::Client;

use veil_core::relay::{ForwardingEngine, RelayError};
use veil_crypto::{encode_text, PublicKey, SecretKey};
use veil_packet::NodeId;

use crate::client::{HttpDirectory, HttpTransport};
use crate::models::*;
use crate::node_config::NodeConfig;

type Engine = ForwardingEngine<HttpDirectory, HttpTransport>;

/// Run one relay until the process is stopped. Generates the long-lived
/// keypair and announces it to the registry before accepting messages;
/// a rejected registration is fatal.
pub async fn run(config: NodeConfig) -> Result<(), Error> {
    let secret_key = SecretKey::generate(&mut thread_rng());
    let client = Client::new();

    register_with_registry(&client, &config.registry_url, config.id, &secret_key.public_key()).await
        .with_context(|| format!("Relay {} failed to register", config.id))?;

    let engine = Engine::new(
        config.id,
        secret_key,
        HttpDirectory::new(client.clone(), config.registry_url.clone()),
        HttpTransport::new(client, config.addressing.clone()),
    );

    let port = config.bind_port().context("relay port out of range")?;
    let addr = format!("{}:{}", config.addressing.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind relay to {}", addr))?;
    info!("Relay {} is listening on {}", config.id, addr);
    axum::serve(listener, router(Arc::new(engine))).await?;
    Ok(())
}

/// Announce this relay's identity and public key to the directory.
async fn register_with_registry(client: &Client, registry_url: &str, id: NodeId, public_key: &PublicKey) -> Result<(), Error> {
    let body = RegisterNodeBody {
        node_id: id.0,
        public_key: encode_text(public_key.as_bytes()),
    };
    let response = client
        .post(format!("{}/registerNode", registry_url))
        .json(&body)
        .send().await
        .context("Registry unreachable")?;
    if !response.status().is_success() {
        let error = response.json::<ErrorBody>().await
            .map(|body| body.error)
            .unwrap_or_else(|e| e.to_string());
        bail!("Registration rejected: {}", error);
    }
    Ok(())
}

/// Build one relay's route table.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/message", post(message))
        .route("/getLastReceivedEncryptedMessage", get(last_received_encrypted))
        .route("/getLastReceivedDecryptedMessage", get(last_received_decrypted))
        .route("/getLastMessageDestination", get(last_message_destination))
        .route("/getPrivateKey", get(private_key))
        .with_state(engine)
}

async fn status() -> &'static str {
    "live"
}

async fn message(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<MessageBody>,
) -> Result<Json<SuccessBody>, (StatusCode, Json<ErrorBody>)> {
    engine.handle_message(&body.message).await
        .map_err(|e| {
            let status = match e {
                RelayError::Malformed(_) | RelayError::Unwrap(_) => StatusCode::BAD_REQUEST,
                RelayError::Directory(_) | RelayError::ForwardingFailed(_) => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ErrorBody { error: e.to_string() }))
        })?;
    Ok(Json(SuccessBody { success: true }))
}

async fn last_received_encrypted(State(engine): State<Arc<Engine>>) -> Json<ResultBody<String>> {
    Json(ResultBody { result: engine.observation().last_received_encrypted })
}

async fn last_received_decrypted(State(engine): State<Arc<Engine>>) -> Json<ResultBody<String>> {
    Json(ResultBody { result: engine.observation().last_received_decrypted })
}

async fn last_message_destination(State(engine): State<Arc<Engine>>) -> Json<ResultBody<u64>> {
    Json(ResultBody { result: engine.observation().last_forward_target.map(|id| id.0) })
}

/// Diagnostic readback of the relay's secret key. Simulation-only.
async fn private_key(State(engine): State<Arc<Engine>>) -> Json<ResultBody<String>> {
    Json(ResultBody { result: Some(encode_text(engine.secret_key().as_bytes())) })
}
